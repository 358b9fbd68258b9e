use crate::models::db_operations::DbResult;
use crate::models::{DashboardCounts, PostStatus, Role, SiteStats};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

// Table names are fixed identifiers, never user input.
fn count_rows(conn: &Connection, table: &str) -> DbResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Whole days elapsed since `start`, never negative.
pub fn days_since(start: NaiveDate, today: NaiveDate) -> i64 {
    (today - start).num_days().max(0)
}

pub fn read_site_stats(conn: &Connection, program_start: NaiveDate, today: NaiveDate) -> DbResult<SiteStats> {
    let total_posts: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE status = ?1",
        params![PostStatus::Published],
        |row| row.get(0),
    )?;
    let total_members: i64 = conn.query_row(
        "SELECT COUNT(*) FROM profiles WHERE role = ?1",
        params![Role::Member],
        |row| row.get(0),
    )?;

    Ok(SiteStats {
        total_programs: count_rows(conn, "programs")?,
        total_days: days_since(program_start, today),
        total_members,
        total_posts,
        total_media: count_rows(conn, "media")?,
    })
}

pub fn read_dashboard_counts(conn: &Connection) -> DbResult<DashboardCounts> {
    Ok(DashboardCounts {
        posts: count_rows(conn, "posts")?,
        categories: count_rows(conn, "categories")?,
        comments: count_rows(conn, "comments")?,
        programs: count_rows(conn, "programs")?,
        profiles: count_rows(conn, "profiles")?,
    })
}
