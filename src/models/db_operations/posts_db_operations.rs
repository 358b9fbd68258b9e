use crate::models::db_operations::{new_id, non_empty, DbResult};
use crate::models::{Post, PostInput, PostStatus};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const POST_SELECT: &str = "SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.featured_image, p.status,
        p.category_id, p.author_id, p.created_at, p.updated_at, c.name, pr.name
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN profiles pr ON pr.id = p.author_id";

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        excerpt: row.get(4)?,
        featured_image: row.get(5)?,
        status: row.get(6)?,
        category_id: row.get(7)?,
        author_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        category_name: row.get(11)?,
        author_name: row.get(12)?,
    })
}

/// Filter for post listings. Empty strings are treated as "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub title_query: Option<String>,
    pub category_id: Option<String>,
    pub limit: Option<u32>,
}

pub fn create_post(conn: &Connection, input: &PostInput, author_id: &str) -> DbResult<String> {
    let id = new_id();
    let now = Utc::now();
    conn.execute(
        "INSERT INTO posts (id, title, slug, content, excerpt, featured_image, status, category_id, author_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            input.title,
            input.slug,
            input.content,
            non_empty(input.excerpt.as_deref()),
            non_empty(input.featured_image.as_deref()),
            input.status,
            non_empty(input.category_id.as_deref()),
            author_id,
            now,
        ],
    )?;
    Ok(id)
}

pub fn update_post(conn: &Connection, id: &str, input: &PostInput, author_id: &str) -> DbResult<usize> {
    Ok(conn.execute(
        "UPDATE posts SET title = ?1, slug = ?2, content = ?3, excerpt = ?4, featured_image = ?5, status = ?6,
            category_id = ?7, author_id = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            input.title,
            input.slug,
            input.content,
            non_empty(input.excerpt.as_deref()),
            non_empty(input.featured_image.as_deref()),
            input.status,
            non_empty(input.category_id.as_deref()),
            author_id,
            Utc::now(),
            id,
        ],
    )?)
}

pub fn delete_post(conn: &Connection, id: &str) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM posts WHERE id = ?1", [id])?)
}

pub fn read_post(conn: &Connection, id: &str) -> DbResult<Option<Post>> {
    let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
    Ok(conn.query_row(&sql, [id], post_from_row).optional()?)
}

pub fn read_published_post_by_slug(conn: &Connection, slug: &str) -> DbResult<Option<Post>> {
    let sql = format!("{} WHERE p.slug = ?1 AND p.status = ?2", POST_SELECT);
    Ok(conn
        .query_row(&sql, params![slug, PostStatus::Published], post_from_row)
        .optional()?)
}

/// Escapes LIKE wildcards so the search term matches literally under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Newest first. Title matching is a case-insensitive substring match.
pub fn read_posts(conn: &Connection, filter: &PostFilter) -> DbResult<Vec<Post>> {
    let mut sql = format!("{} WHERE 1 = 1", POST_SELECT);
    let mut values: Vec<Value> = Vec::new();

    if let Some(status) = filter.status {
        values.push(Value::Text(status.as_str().to_string()));
        sql.push_str(&format!(" AND p.status = ?{}", values.len()));
    }
    if let Some(query) = non_empty(filter.title_query.as_deref()) {
        values.push(Value::Text(format!("%{}%", escape_like(query))));
        sql.push_str(&format!(" AND p.title LIKE ?{} ESCAPE '\\'", values.len()));
    }
    if let Some(category_id) = non_empty(filter.category_id.as_deref()) {
        values.push(Value::Text(category_id.to_string()));
        sql.push_str(&format!(" AND p.category_id = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY p.created_at DESC, p.rowid DESC");
    if let Some(limit) = filter.limit {
        values.push(Value::Integer(i64::from(limit)));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(params_from_iter(values), post_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

pub fn slug_exists(conn: &Connection, slug: &str, exclude_id: Option<&str>) -> DbResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1 AND id != COALESCE(?2, ''))",
        params![slug, exclude_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}
