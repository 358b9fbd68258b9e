mod common;

use kkn_site::helper::auth_events::{AuthEvent, AuthEvents};
use kkn_site::helper::auth_helpers::{self, AuthError, MSG_DUPLICATE_EMAIL};
use kkn_site::helper::form_helpers::validate_registration;
use kkn_site::models::db_operations::profiles_db_operations;
use kkn_site::models::Role;
use std::sync::{Arc, Mutex};

#[test]
fn test_duplicate_registration_is_refused_without_new_profile() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let mut conn = pool.get().unwrap();

    let first = validate_registration("Budi", "budi@kkn.id", "rahasia123").unwrap();
    auth_helpers::register(&mut conn, &first, false).unwrap();

    let again = validate_registration("Budi Lagi", " BUDI@kkn.id ", "lainnya123").unwrap();
    let err = auth_helpers::register(&mut conn, &again, false).unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));
    assert_eq!(err.to_string(), MSG_DUPLICATE_EMAIL);

    assert_eq!(profiles_db_operations::read_all_profiles(&conn).unwrap().len(), 1);
}

#[test]
fn test_sign_in_publishes_event_and_lands_members_on_home() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let mut conn = pool.get().unwrap();
    let registration = validate_registration("Sari", "sari@kkn.id", "rahasia123").unwrap();
    let id = auth_helpers::register(&mut conn, &registration, false).unwrap();

    let bus = AuthEvents::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    let profile = auth_helpers::sign_in(&conn, &bus, "sari@kkn.id", "rahasia123").unwrap();
    assert_eq!(profile.id, id);
    assert_eq!(profile.role, Role::Member);
    assert_eq!(auth_helpers::landing_path(&profile), "/");
    assert_eq!(*seen.lock().unwrap(), vec![AuthEvent::SignedIn { profile_id: id }]);
}

#[test]
fn test_wrong_password_does_not_publish() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let conn = pool.get().unwrap();

    let bus = AuthEvents::new();
    let seen = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&seen);
    let _subscription = bus.subscribe(move |_| *sink.lock().unwrap() += 1);

    let err = auth_helpers::sign_in(&conn, &bus, "admin@kkn.id", "salah").unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(*seen.lock().unwrap(), 0);
}

#[test]
fn test_unconfirmed_account_cannot_sign_in_until_confirmed() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let mut conn = pool.get().unwrap();
    let registration = validate_registration("Dewi", "dewi@kkn.id", "rahasia123").unwrap();
    let id = auth_helpers::register(&mut conn, &registration, true).unwrap();
    let bus = AuthEvents::new();

    let err = auth_helpers::sign_in(&conn, &bus, "dewi@kkn.id", "rahasia123").unwrap_err();
    assert!(matches!(err, AuthError::EmailNotConfirmed));
    assert_eq!(profiles_db_operations::read_unconfirmed_account_ids(&conn).unwrap(), vec![id.clone()]);

    profiles_db_operations::confirm_email(&conn, &id).unwrap();
    let profile = auth_helpers::sign_in(&conn, &bus, "dewi@kkn.id", "rahasia123").unwrap();
    assert_eq!(profile.id, id);
}

#[test]
fn test_sign_in_recorder_stamps_last_sign_in() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let id = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let bus = AuthEvents::new();
    let _recorder = kkn_site::helper::auth_events::subscribe_sign_in_recorder(&bus, pool.clone());

    let conn = pool.get().unwrap();
    let profile = auth_helpers::sign_in(&conn, &bus, "admin@kkn.id", "rahasia123").unwrap();
    assert_eq!(auth_helpers::landing_path(&profile), "/admin");

    let stored = profiles_db_operations::read_profile(&conn, &id).unwrap().unwrap();
    assert!(stored.last_sign_in_at.is_some());
}
