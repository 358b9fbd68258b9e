use crate::helper::form_helpers::FormError;
use crate::models::db_operations::{profiles_db_operations, DbResult};
use crate::models::Role;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub max_file_upload_size_mb: String,
    pub allowed_mime_types: String,
}

pub fn get_settings(conn: &Connection) -> Settings {
    let max_size = profiles_db_operations::read_setting(conn, "max_file_upload_size_mb")
        .unwrap_or_else(|| "5".to_string());

    let mime_types = profiles_db_operations::read_setting(conn, "allowed_mime_types")
        .unwrap_or_else(|| "".to_string()); // Secure default

    Settings {
        max_file_upload_size_mb: max_size,
        allowed_mime_types: mime_types,
    }
}

/// Validates and normalizes submitted settings.
pub fn validate_settings(max_size: &str, mime_types: &str) -> Result<Settings, FormError> {
    let max_size = max_size.trim();
    match max_size.parse::<u64>() {
        Ok(mb) if (1..=100).contains(&mb) => {}
        _ => {
            return Err(FormError::Invalid(
                "Ukuran maksimal harus berupa angka bulat antara 1 dan 100.".to_string(),
            ))
        }
    }

    let mime_types = mime_types
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    Ok(Settings {
        max_file_upload_size_mb: max_size.to_string(),
        allowed_mime_types: mime_types,
    })
}

pub fn save_settings(conn: &Connection, settings: &Settings) -> DbResult<()> {
    profiles_db_operations::update_setting(conn, "max_file_upload_size_mb", &settings.max_file_upload_size_mb)?;
    profiles_db_operations::update_setting(conn, "allowed_mime_types", &settings.allowed_mime_types)?;
    Ok(())
}

/// Refuses to demote the acting admin, so the site keeps at least one admin.
pub fn change_role(conn: &Connection, acting_admin_id: &str, profile_id: &str, role: &str) -> Result<(), FormError> {
    let role = role.parse::<Role>().map_err(FormError::Invalid)?;
    if acting_admin_id == profile_id && role != Role::Admin {
        return Err(FormError::Invalid("Anda tidak dapat menurunkan peran akun Anda sendiri.".to_string()));
    }
    match profiles_db_operations::update_role(conn, profile_id, role) {
        Ok(0) => Err(FormError::Invalid("Pengguna tidak ditemukan.".to_string())),
        Ok(_) => Ok(()),
        Err(e) => Err(FormError::Invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup::setup_site_db;

    #[test]
    fn settings_round_trip_through_the_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_site_db(&mut conn).unwrap();

        let settings = validate_settings(" 8 ", "image/png, image/webp,,").unwrap();
        save_settings(&conn, &settings).unwrap();

        let stored = get_settings(&conn);
        assert_eq!(stored.max_file_upload_size_mb, "8");
        assert_eq!(stored.allowed_mime_types, "image/png,image/webp");
    }

    #[test]
    fn settings_reject_non_numeric_size() {
        assert!(validate_settings("lima", "image/png").is_err());
        assert!(validate_settings("0", "image/png").is_err());
    }

    #[test]
    fn admin_cannot_demote_self() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_site_db(&mut conn).unwrap();
        assert!(change_role(&conn, "a-1", "a-1", "member").is_err());
        assert!(change_role(&conn, "a-1", "missing", "admin").is_err());
        assert!(change_role(&conn, "a-1", "x", "superuser").is_err());
    }
}
