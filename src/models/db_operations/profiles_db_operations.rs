use crate::models::db_operations::{new_id, DbError, DbResult};
use crate::models::{Profile, Role};
use bcrypt::{hash, verify};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROFILE_COLUMNS: &str = "id, name, email, role, bio, avatar_url, created_at, last_sign_in_at";

fn profile_from_row(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        bio: row.get(4)?,
        avatar_url: row.get(5)?,
        created_at: row.get(6)?,
        last_sign_in_at: row.get(7)?,
    })
}

/// Credentials row of the authentication identity behind a profile.
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn email_is_registered(conn: &Connection, email: &str) -> DbResult<bool> {
    let email = normalize_email(email);
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)
            OR EXISTS(SELECT 1 FROM profiles WHERE email = ?1)",
        [&email],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Inserts the account and its member profile in one transaction and returns
/// the new profile id.
pub fn create_account_with_profile(
    conn: &mut Connection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    email_confirmed: bool,
) -> DbResult<String> {
    let id = new_id();
    let email = normalize_email(email);
    let hashed_password = hash(password, bcrypt::DEFAULT_COST)?;
    let now = Utc::now();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO accounts (id, email, password_hash, email_confirmed, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, email, hashed_password, email_confirmed, now],
    )?;
    tx.execute(
        "INSERT INTO profiles (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, name, email, role, now],
    )?;
    tx.commit()?;
    Ok(id)
}

pub fn read_account_by_email(conn: &Connection, email: &str) -> DbResult<Option<AccountRecord>> {
    let account = conn
        .query_row(
            "SELECT id, email, password_hash, email_confirmed FROM accounts WHERE email = ?1",
            [normalize_email(email)],
            |row| {
                Ok(AccountRecord {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                    email_confirmed: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(account)
}

/// Returns the account when the password matches, regardless of confirmation.
pub fn verify_password(conn: &Connection, email: &str, password: &str) -> DbResult<Option<AccountRecord>> {
    match read_account_by_email(conn, email)? {
        Some(account) if verify(password, &account.password_hash).unwrap_or(false) => Ok(Some(account)),
        _ => Ok(None),
    }
}

pub fn update_password(conn: &Connection, email: &str, new_password: &str) -> DbResult<usize> {
    let hashed_password = hash(new_password, bcrypt::DEFAULT_COST)?;
    Ok(conn.execute(
        "UPDATE accounts SET password_hash = ?1 WHERE email = ?2",
        params![hashed_password, normalize_email(email)],
    )?)
}

pub fn confirm_email(conn: &Connection, profile_id: &str) -> DbResult<usize> {
    Ok(conn.execute("UPDATE accounts SET email_confirmed = 1 WHERE id = ?1", [profile_id])?)
}

/// Ids of accounts still waiting for an admin to confirm them.
pub fn read_unconfirmed_account_ids(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM accounts WHERE email_confirmed = 0")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

pub fn read_profile(conn: &Connection, id: &str) -> DbResult<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS);
    Ok(conn.query_row(&sql, [id], profile_from_row).optional()?)
}

pub fn read_profile_by_email(conn: &Connection, email: &str) -> DbResult<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE email = ?1", PROFILE_COLUMNS);
    Ok(conn.query_row(&sql, [normalize_email(email)], profile_from_row).optional()?)
}

/// Inserts a member profile for an account that signed in without one.
pub fn insert_profile_for_account(conn: &Connection, account: &AccountRecord) -> DbResult<Profile> {
    let name = account.email.split('@').next().unwrap_or_default().to_string();
    conn.execute(
        "INSERT INTO profiles (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![account.id, name, account.email, Role::Member, Utc::now()],
    )?;
    read_profile(conn, &account.id)?.ok_or_else(|| DbError::NotFound(account.id.clone()))
}

pub fn read_all_profiles(conn: &Connection) -> DbResult<Vec<Profile>> {
    let sql = format!("SELECT {} FROM profiles ORDER BY name COLLATE NOCASE ASC", PROFILE_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let profiles = stmt.query_map([], profile_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(profiles)
}

/// Oldest members first; `limit` of `None` returns all of them.
pub fn read_members(conn: &Connection, limit: Option<u32>) -> DbResult<Vec<Profile>> {
    let sql = format!(
        "SELECT {} FROM profiles WHERE role = ?1 ORDER BY created_at ASC, rowid ASC LIMIT ?2",
        PROFILE_COLUMNS
    );
    let limit = limit.map(i64::from).unwrap_or(-1);
    let mut stmt = conn.prepare(&sql)?;
    let members = stmt
        .query_map(params![Role::Member, limit], profile_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(members)
}

pub fn update_profile(
    conn: &Connection,
    id: &str,
    name: &str,
    bio: Option<&str>,
    avatar_url: Option<&str>,
) -> DbResult<usize> {
    Ok(conn.execute(
        "UPDATE profiles SET name = ?1, bio = ?2, avatar_url = ?3 WHERE id = ?4",
        params![name, bio, avatar_url, id],
    )?)
}

pub fn update_role(conn: &Connection, id: &str, role: Role) -> DbResult<usize> {
    Ok(conn.execute("UPDATE profiles SET role = ?1 WHERE id = ?2", params![role, id])?)
}

pub fn update_role_by_email(conn: &Connection, email: &str, role: Role) -> DbResult<usize> {
    Ok(conn.execute(
        "UPDATE profiles SET role = ?1 WHERE email = ?2",
        params![role, normalize_email(email)],
    )?)
}

pub fn update_last_sign_in(conn: &Connection, id: &str) -> DbResult<()> {
    conn.execute(
        "UPDATE profiles SET last_sign_in_at = ?1 WHERE id = ?2",
        params![Utc::now(), id],
    )?;
    Ok(())
}

pub fn read_setting(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()
        .unwrap_or(None)
}

pub fn update_setting(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute("INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)", [key, value])?;
    Ok(())
}
