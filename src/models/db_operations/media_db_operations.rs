use crate::models::db_operations::{new_id, non_empty, DbResult};
use crate::models::{Media, NewMedia};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const MEDIA_SELECT: &str = "SELECT m.id, m.filename, m.storage_key, m.url, m.alt_text, m.category_id,
        m.uploaded_by, m.created_at, c.name
    FROM media m
    LEFT JOIN categories c ON c.id = m.category_id";

fn media_from_row(row: &Row) -> rusqlite::Result<Media> {
    Ok(Media {
        id: row.get(0)?,
        filename: row.get(1)?,
        storage_key: row.get(2)?,
        url: row.get(3)?,
        alt_text: row.get(4)?,
        category_id: row.get(5)?,
        uploaded_by: row.get(6)?,
        created_at: row.get(7)?,
        category_name: row.get(8)?,
    })
}

pub fn create_media(conn: &Connection, media: &NewMedia) -> DbResult<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO media (id, filename, storage_key, url, alt_text, category_id, uploaded_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            media.filename,
            media.storage_key,
            media.url,
            non_empty(media.alt_text.as_deref()),
            non_empty(media.category_id.as_deref()),
            media.uploaded_by,
            Utc::now(),
        ],
    )?;
    Ok(id)
}

pub fn read_media(conn: &Connection, id: &str) -> DbResult<Option<Media>> {
    let sql = format!("{} WHERE m.id = ?1", MEDIA_SELECT);
    Ok(conn.query_row(&sql, [id], media_from_row).optional()?)
}

/// Newest first. A blank or missing category returns every item.
pub fn read_media_list(conn: &Connection, category_id: Option<&str>, limit: Option<u32>) -> DbResult<Vec<Media>> {
    let sql = format!(
        "{} WHERE (?1 IS NULL OR m.category_id = ?1) ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?2",
        MEDIA_SELECT
    );
    let limit = limit.map(i64::from).unwrap_or(-1);
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params![non_empty(category_id), limit], media_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn delete_media(conn: &Connection, id: &str) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM media WHERE id = ?1", [id])?)
}
