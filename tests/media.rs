mod common;

use kkn_site::helper::media_helpers::{self, HelperError, MediaDetails};
use kkn_site::helper::storage_helpers::{
    LocalObjectStore, ObjectStore, SharedObjectStore, StorageError, UploadedFile,
};
use kkn_site::models::db_operations::{media_db_operations, profiles_db_operations};
use kkn_site::models::Role;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Accepts writes but refuses every delete.
struct UndeletableStore {
    inner: LocalObjectStore,
    delete_attempts: AtomicUsize,
}

impl ObjectStore for UndeletableStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.inner.put(key, bytes)
    }

    fn delete(&self, _key: &str) -> Result<(), StorageError> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Rejected("bucket is read-only".to_string()))
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}

fn png(name: &str) -> UploadedFile {
    UploadedFile {
        original_filename: name.to_string(),
        content_type: "image/png".to_string(),
        extension: "png",
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

fn stored_files(dir: &std::path::Path) -> usize {
    fn walk(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|entry| {
                        let path = entry.path();
                        if path.is_dir() {
                            walk(&path)
                        } else {
                            1
                        }
                    })
                    .sum()
            })
            .unwrap_or(0)
    }
    walk(dir)
}

#[actix_web::test]
async fn test_upload_then_delete_removes_object_and_record() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let admin = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let store: SharedObjectStore = Arc::new(LocalObjectStore::new(test_db.media_dir(), "/media"));
    let conn = pool.get().unwrap();

    let details = MediaDetails { alt_text: Some("Kerja bakti".to_string()), category_id: None };
    let media = media_helpers::upload_media(&conn, store.clone(), Some(png("bakti.png")), details, &admin)
        .await
        .unwrap();
    assert!(media.url.starts_with("/media/media/"));
    assert_eq!(media.alt_text.as_deref(), Some("Kerja bakti"));
    assert!(test_db.media_dir().join(&media.storage_key).exists());

    media_helpers::delete_media_item(&conn, store, &media.id).await.unwrap();
    assert!(media_db_operations::read_media(&conn, &media.id).unwrap().is_none());
    assert_eq!(stored_files(test_db.media_dir()), 0);
}

#[actix_web::test]
async fn test_failed_storage_delete_keeps_record() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let admin = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let store = Arc::new(UndeletableStore {
        inner: LocalObjectStore::new(test_db.media_dir(), "/media"),
        delete_attempts: AtomicUsize::new(0),
    });
    let conn = pool.get().unwrap();

    let media = media_helpers::upload_media(&conn, store.clone(), Some(png("a.png")), MediaDetails::default(), &admin)
        .await
        .unwrap();

    let err = media_helpers::delete_media_item(&conn, store.clone(), &media.id).await.unwrap_err();
    assert!(matches!(err, HelperError::Storage(_)));
    assert_eq!(store.delete_attempts.load(Ordering::SeqCst), 1);
    assert!(media_db_operations::read_media(&conn, &media.id).unwrap().is_some());
}

#[actix_web::test]
async fn test_failed_insert_removes_stored_object() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let store: SharedObjectStore = Arc::new(LocalObjectStore::new(test_db.media_dir(), "/media"));
    let conn = pool.get().unwrap();

    // No such profile, so the uploaded_by foreign key rejects the record.
    let err = media_helpers::upload_media(&conn, store, Some(png("a.png")), MediaDetails::default(), "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, HelperError::Database(_)));
    assert!(media_db_operations::read_media_list(&conn, None, None).unwrap().is_empty());
    assert_eq!(stored_files(test_db.media_dir()), 0);
}

#[actix_web::test]
async fn test_upload_without_file_is_refused() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let admin = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let store: SharedObjectStore = Arc::new(LocalObjectStore::new(test_db.media_dir(), "/media"));
    let conn = pool.get().unwrap();

    let err = media_helpers::upload_media(&conn, store, None, MediaDetails::default(), &admin)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Pilih file terlebih dahulu.");
}

#[actix_web::test]
async fn test_profile_update_stores_avatar() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let id = common::create_profile(&pool, "Sari", "sari@kkn.id", Role::Member);
    let store: SharedObjectStore = Arc::new(LocalObjectStore::new(test_db.media_dir(), "/media"));
    let conn = pool.get().unwrap();

    media_helpers::update_profile_with_avatar(&conn, store, &id, "Sari Dewi", Some("Divisi humas"), Some(png("me.png")))
        .await
        .unwrap();

    let profile = profiles_db_operations::read_profile(&conn, &id).unwrap().unwrap();
    assert_eq!(profile.name, "Sari Dewi");
    assert_eq!(profile.bio.as_deref(), Some("Divisi humas"));
    let avatar = profile.avatar_url.unwrap();
    assert!(avatar.starts_with("/media/avatars/"));
    assert_eq!(stored_files(test_db.media_dir()), 1);
}
