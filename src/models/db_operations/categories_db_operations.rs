use crate::models::db_operations::{new_id, non_empty, DbResult};
use crate::models::{Category, CategoryInput};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, color, parent_id, is_active, created_at";

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        parent_id: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn create_category(conn: &Connection, input: &CategoryInput) -> DbResult<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO categories (id, name, slug, description, color, parent_id, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            input.name,
            input.slug,
            non_empty(input.description.as_deref()),
            non_empty(input.color.as_deref()),
            non_empty(input.parent_id.as_deref()),
            input.is_active,
            Utc::now(),
        ],
    )?;
    Ok(id)
}

pub fn update_category(conn: &Connection, id: &str, input: &CategoryInput) -> DbResult<usize> {
    // A category is never its own parent.
    let parent_id = non_empty(input.parent_id.as_deref()).filter(|parent| *parent != id);
    Ok(conn.execute(
        "UPDATE categories SET name = ?1, slug = ?2, description = ?3, color = ?4, parent_id = ?5, is_active = ?6
         WHERE id = ?7",
        params![
            input.name,
            input.slug,
            non_empty(input.description.as_deref()),
            non_empty(input.color.as_deref()),
            parent_id,
            input.is_active,
            id,
        ],
    )?)
}

pub fn delete_category(conn: &Connection, id: &str) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM categories WHERE id = ?1", [id])?)
}

pub fn read_category(conn: &Connection, id: &str) -> DbResult<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS);
    Ok(conn.query_row(&sql, [id], category_from_row).optional()?)
}

pub fn read_all_categories(conn: &Connection) -> DbResult<Vec<Category>> {
    let sql = format!("SELECT {} FROM categories ORDER BY name COLLATE NOCASE ASC", CATEGORY_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let categories = stmt.query_map([], category_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(categories)
}

/// Active categories by name, optionally leaving one out (the category being
/// edited, when listing parent candidates).
pub fn read_active_categories(conn: &Connection, exclude_id: Option<&str>) -> DbResult<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE is_active = 1 AND id != COALESCE(?1, '') ORDER BY name COLLATE NOCASE ASC",
        CATEGORY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let categories = stmt
        .query_map([exclude_id], category_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(categories)
}
