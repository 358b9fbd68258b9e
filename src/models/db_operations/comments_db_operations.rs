use crate::models::db_operations::{new_id, DbResult};
use crate::models::{Comment, CommentStatus, NewComment};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, c.author_name, c.content, c.status,
        c.created_at, p.title
    FROM comments c
    LEFT JOIN posts p ON p.id = c.post_id";

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        post_title: row.get(7)?,
    })
}

/// New comments always start out pending moderation.
pub fn create_comment(conn: &Connection, comment: &NewComment) -> DbResult<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO comments (id, post_id, author_id, author_name, content, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            comment.post_id,
            comment.author_id,
            comment.author_name,
            comment.content,
            CommentStatus::Pending,
            Utc::now(),
        ],
    )?;
    Ok(id)
}

pub fn read_comment(conn: &Connection, id: &str) -> DbResult<Option<Comment>> {
    let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
    Ok(conn.query_row(&sql, [id], comment_from_row).optional()?)
}

/// Approved comments of one post, oldest first.
pub fn read_approved_comments(conn: &Connection, post_id: &str) -> DbResult<Vec<Comment>> {
    let sql = format!(
        "{} WHERE c.post_id = ?1 AND c.status = ?2 ORDER BY c.created_at ASC, c.rowid ASC",
        COMMENT_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let comments = stmt
        .query_map(params![post_id, CommentStatus::Approved], comment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

/// Every comment, newest first, for moderation.
pub fn read_all_comments(conn: &Connection) -> DbResult<Vec<Comment>> {
    let sql = format!("{} ORDER BY c.created_at DESC, c.rowid DESC", COMMENT_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let comments = stmt.query_map([], comment_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

/// Touches the status column only.
pub fn approve_comment(conn: &Connection, id: &str) -> DbResult<usize> {
    Ok(conn.execute(
        "UPDATE comments SET status = ?1 WHERE id = ?2",
        params![CommentStatus::Approved, id],
    )?)
}

pub fn delete_comment(conn: &Connection, id: &str) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [id])?)
}
