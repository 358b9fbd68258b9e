use crate::helper::resource::{fetch_snapshot, Snapshot};
use crate::helper::sanitization_helpers::render_markdown;
use crate::models::db_operations::posts_db_operations::{self, PostFilter};
use crate::models::db_operations::{
    categories_db_operations, comments_db_operations, media_db_operations, profiles_db_operations,
    programs_db_operations, stats_db_operations, DbResult,
};
use crate::models::{Category, Comment, Media, Post, PostStatus, Profile, Program, SiteStats};
use crate::DbPool;
use chrono::NaiveDate;
use serde::Serialize;

/// A published post with its rendered body and approved comments.
#[derive(Serialize, Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub content_html: String,
    pub comments: Vec<Comment>,
}

fn with_conn<T>(pool: &DbPool, f: impl FnOnce(&rusqlite::Connection) -> DbResult<T>) -> DbResult<T> {
    let conn = pool.get()?;
    f(&conn)
}

/// Published posts, newest first, optionally searched by title and category.
pub fn load_published_posts(
    pool: &DbPool,
    query: Option<String>,
    category_id: Option<String>,
    limit: Option<u32>,
) -> Snapshot<Vec<Post>> {
    let filter = PostFilter {
        status: Some(PostStatus::Published),
        title_query: query,
        category_id,
        limit,
    };
    fetch_snapshot(filter, |filter| with_conn(pool, |conn| posts_db_operations::read_posts(conn, filter)))
}

/// `data` is `None` when no published post has this slug.
pub fn load_post_detail(pool: &DbPool, slug: &str) -> Snapshot<Option<PostDetail>> {
    fetch_snapshot(slug.to_string(), |slug| {
        with_conn(pool, |conn| {
            let Some(post) = posts_db_operations::read_published_post_by_slug(conn, slug)? else {
                return Ok(None);
            };
            let comments = comments_db_operations::read_approved_comments(conn, &post.id)?;
            Ok(Some(PostDetail {
                content_html: render_markdown(&post.content),
                post,
                comments,
            }))
        })
    })
}

/// Gallery items; a missing or blank category shows everything.
pub fn load_media(pool: &DbPool, category_id: Option<String>, limit: Option<u32>) -> Snapshot<Vec<Media>> {
    fetch_snapshot(category_id, |category_id| {
        with_conn(pool, |conn| media_db_operations::read_media_list(conn, category_id.as_deref(), limit))
    })
}

pub fn load_programs(pool: &DbPool, limit: Option<u32>) -> Snapshot<Vec<Program>> {
    fetch_snapshot(limit, |limit| with_conn(pool, |conn| programs_db_operations::read_programs(conn, *limit)))
}

pub fn load_members(pool: &DbPool, limit: Option<u32>) -> Snapshot<Vec<Profile>> {
    fetch_snapshot(limit, |limit| with_conn(pool, |conn| profiles_db_operations::read_members(conn, *limit)))
}

pub fn load_categories(pool: &DbPool) -> Snapshot<Vec<Category>> {
    fetch_snapshot((), |_| with_conn(pool, |conn| categories_db_operations::read_active_categories(conn, None)))
}

pub fn load_stats(pool: &DbPool, program_start: NaiveDate, today: NaiveDate) -> Snapshot<SiteStats> {
    fetch_snapshot(today, |today| {
        with_conn(pool, |conn| stats_db_operations::read_site_stats(conn, program_start, *today))
    })
}
