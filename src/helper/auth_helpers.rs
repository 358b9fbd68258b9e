use crate::helper::auth_events::{AuthEvent, AuthEvents};
use crate::helper::form_helpers::{FormError, Registration};
use crate::models::db_operations::{profiles_db_operations, DbError};
use crate::models::{Profile, Role};
use rusqlite::Connection;
use thiserror::Error;

pub const MSG_DUPLICATE_EMAIL: &str =
    "Email sudah terdaftar. Silakan gunakan email lain atau masuk dengan akun yang sudah ada.";
pub const MSG_INVALID_CREDENTIALS: &str = "Email atau password salah. Silakan cek kembali kredensial Anda.";
pub const MSG_EMAIL_NOT_CONFIRMED: &str =
    "Email belum dikonfirmasi. Silakan cek email Anda dan klik link konfirmasi.";
pub const MSG_REGISTERED: &str = "Pendaftaran berhasil! Silakan masuk.";
pub const MSG_REGISTERED_CONFIRM: &str =
    "Pendaftaran berhasil! Akun Anda perlu dikonfirmasi oleh admin sebelum dapat masuk.";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{}", MSG_DUPLICATE_EMAIL)]
    DuplicateEmail,
    #[error("{}", MSG_INVALID_CREDENTIALS)]
    InvalidCredentials,
    #[error("{}", MSG_EMAIL_NOT_CONFIRMED)]
    EmailNotConfirmed,
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for AuthError {
    fn from(e: DbError) -> Self {
        if e.is_unique_violation() {
            AuthError::DuplicateEmail
        } else {
            AuthError::Database(e)
        }
    }
}

/// Creates the account and its member profile. When `require_confirmation`
/// is set the account cannot sign in until an admin confirms it.
pub fn register(
    conn: &mut Connection,
    registration: &Registration,
    require_confirmation: bool,
) -> Result<String, AuthError> {
    if profiles_db_operations::email_is_registered(conn, &registration.email)? {
        log::info!("Registration refused for existing email {}", registration.email);
        return Err(AuthError::DuplicateEmail);
    }

    let profile_id = profiles_db_operations::create_account_with_profile(
        conn,
        &registration.name,
        &registration.email,
        &registration.password,
        Role::Member,
        !require_confirmation,
    )?;
    log::info!("Registered new member profile {}", profile_id);
    Ok(profile_id)
}

/// Verifies credentials, makes sure a profile exists for the account and
/// announces the sign-in. The caller stores the profile id in the session.
pub fn sign_in(conn: &Connection, events: &AuthEvents, email: &str, password: &str) -> Result<Profile, AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::Required("Email").into());
    }
    if password.is_empty() {
        return Err(FormError::Required("Password").into());
    }

    let account = profiles_db_operations::verify_password(conn, email, password)?
        .ok_or(AuthError::InvalidCredentials)?;
    if !account.email_confirmed {
        return Err(AuthError::EmailNotConfirmed);
    }

    let profile = match profiles_db_operations::read_profile(conn, &account.id)? {
        Some(profile) => profile,
        None => {
            log::warn!("Account {} had no profile; creating one.", account.id);
            profiles_db_operations::insert_profile_for_account(conn, &account)?
        }
    };

    events.publish(&AuthEvent::SignedIn { profile_id: profile.id.clone() });
    Ok(profile)
}

pub fn sign_out(events: &AuthEvents, profile_id: Option<String>) {
    events.publish(&AuthEvent::SignedOut { profile_id });
}

/// Where a freshly signed-in user lands.
pub fn landing_path(profile: &Profile) -> &'static str {
    if profile.is_admin() {
        "/admin"
    } else {
        "/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::form_helpers::validate_registration;
    use crate::setup::db_setup::setup_site_db;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_site_db(&mut conn).unwrap();
        conn
    }

    #[test]
    fn sign_in_rejects_wrong_password_with_localized_message() {
        let mut conn = conn();
        let registration = validate_registration("Sari", "sari@example.com", "rahasia").unwrap();
        register(&mut conn, &registration, false).unwrap();

        let events = AuthEvents::new();
        let err = sign_in(&conn, &events, "sari@example.com", "salah").unwrap_err();
        assert_eq!(err.to_string(), MSG_INVALID_CREDENTIALS);
    }

    #[test]
    fn unconfirmed_account_cannot_sign_in() {
        let mut conn = conn();
        let registration = validate_registration("Budi", "budi@example.com", "rahasia").unwrap();
        register(&mut conn, &registration, true).unwrap();

        let events = AuthEvents::new();
        let err = sign_in(&conn, &events, "budi@example.com", "rahasia").unwrap_err();
        assert!(matches!(err, AuthError::EmailNotConfirmed));
    }

    #[test]
    fn sign_in_publishes_event_and_recreates_missing_profile() {
        let mut conn = conn();
        let registration = validate_registration("Rina", "Rina@Example.com", "rahasia").unwrap();
        let id = register(&mut conn, &registration, false).unwrap();
        conn.execute("DELETE FROM profiles WHERE id = ?1", [&id]).unwrap();

        let events = AuthEvents::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _sub = events.subscribe(move |event| {
            if matches!(event, AuthEvent::SignedIn { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let profile = sign_in(&conn, &events, "rina@example.com", "rahasia").unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.name, "rina");
        assert_eq!(profile.role, Role::Member);
        assert_eq!(landing_path(&profile), "/");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
