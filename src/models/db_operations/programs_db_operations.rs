use crate::models::db_operations::{new_id, non_empty, DbResult};
use crate::models::{Program, ProgramInput};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROGRAM_SELECT: &str = "SELECT g.id, g.title, g.description, g.start_date, g.end_date, g.status,
        g.responsible_person, g.created_at, pr.name
    FROM programs g
    LEFT JOIN profiles pr ON pr.id = g.responsible_person";

fn program_from_row(row: &Row) -> rusqlite::Result<Program> {
    Ok(Program {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        status: row.get(5)?,
        responsible_person: row.get(6)?,
        created_at: row.get(7)?,
        responsible_name: row.get(8)?,
    })
}

pub fn create_program(conn: &Connection, input: &ProgramInput, responsible_person: &str) -> DbResult<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO programs (id, title, description, start_date, end_date, status, responsible_person, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            input.title,
            non_empty(input.description.as_deref()),
            input.start_date,
            input.end_date,
            input.status,
            responsible_person,
            Utc::now(),
        ],
    )?;
    Ok(id)
}

pub fn update_program(conn: &Connection, id: &str, input: &ProgramInput) -> DbResult<usize> {
    Ok(conn.execute(
        "UPDATE programs SET title = ?1, description = ?2, start_date = ?3, end_date = ?4, status = ?5 WHERE id = ?6",
        params![
            input.title,
            non_empty(input.description.as_deref()),
            input.start_date,
            input.end_date,
            input.status,
            id,
        ],
    )?)
}

pub fn delete_program(conn: &Connection, id: &str) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM programs WHERE id = ?1", [id])?)
}

pub fn read_program(conn: &Connection, id: &str) -> DbResult<Option<Program>> {
    let sql = format!("{} WHERE g.id = ?1", PROGRAM_SELECT);
    Ok(conn.query_row(&sql, [id], program_from_row).optional()?)
}

/// Newest first; `limit` of `None` returns every program.
pub fn read_programs(conn: &Connection, limit: Option<u32>) -> DbResult<Vec<Program>> {
    let sql = format!("{} ORDER BY g.created_at DESC, g.rowid DESC LIMIT ?1", PROGRAM_SELECT);
    let limit = limit.map(i64::from).unwrap_or(-1);
    let mut stmt = conn.prepare(&sql)?;
    let programs = stmt.query_map([limit], program_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(programs)
}
