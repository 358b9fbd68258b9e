use crate::helper::form_helpers::FormError;
use crate::helper::sanitization_helpers::strip_all_html;
use crate::helper::storage_helpers::{delete_object, new_storage_key, put_object, SharedObjectStore, StorageError, UploadedFile};
use crate::models::db_operations::{media_db_operations, profiles_db_operations, DbError};
use crate::models::{Media, NewMedia};
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelperError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("Data tidak ditemukan.")]
    NotFound,
}

/// Metadata submitted next to a gallery upload.
#[derive(Debug, Clone, Default)]
pub struct MediaDetails {
    pub alt_text: Option<String>,
    pub category_id: Option<String>,
}

/// Stores the file, then records it. If the record cannot be written the
/// stored object is removed again so no orphan is left behind.
pub async fn upload_media(
    conn: &Connection,
    store: SharedObjectStore,
    file: Option<UploadedFile>,
    details: MediaDetails,
    uploaded_by: &str,
) -> Result<Media, HelperError> {
    let file = file.ok_or_else(|| FormError::Invalid("Pilih file terlebih dahulu.".to_string()))?;
    let storage_key = new_storage_key("media", file.extension);
    let url = store.public_url(&storage_key);

    put_object(store.clone(), storage_key.clone(), file.bytes).await?;

    let record = NewMedia {
        filename: strip_all_html(&file.original_filename),
        storage_key: storage_key.clone(),
        url,
        alt_text: details.alt_text.map(|a| strip_all_html(&a)),
        category_id: details.category_id,
        uploaded_by: uploaded_by.to_string(),
    };

    let inserted = media_db_operations::create_media(conn, &record)
        .and_then(|id| media_db_operations::read_media(conn, &id)?.ok_or(DbError::NotFound(id)));

    match inserted {
        Ok(media) => {
            log::info!("Stored media {} as {}", media.id, storage_key);
            Ok(media)
        }
        Err(e) => {
            log::error!("Recording media '{}' failed, removing stored object: {}", storage_key, e);
            if let Err(cleanup) = delete_object(store, storage_key.clone()).await {
                log::error!("Could not remove orphaned object '{}': {}", storage_key, cleanup);
            }
            Err(e.into())
        }
    }
}

/// Deletes the stored object first. The record is only removed once the
/// object is gone, so a storage failure leaves the gallery entry in place.
pub async fn delete_media_item(conn: &Connection, store: SharedObjectStore, media_id: &str) -> Result<(), HelperError> {
    let media = media_db_operations::read_media(conn, media_id)?.ok_or(HelperError::NotFound)?;

    delete_object(store, media.storage_key.clone()).await?;
    media_db_operations::delete_media(conn, &media.id)?;
    log::info!("Deleted media {} ({})", media.id, media.storage_key);
    Ok(())
}

/// Saves profile changes. A new avatar is stored before the update and
/// removed again if the update fails.
pub async fn update_profile_with_avatar(
    conn: &Connection,
    store: SharedObjectStore,
    profile_id: &str,
    name: &str,
    bio: Option<&str>,
    avatar: Option<UploadedFile>,
) -> Result<(), HelperError> {
    let current = profiles_db_operations::read_profile(conn, profile_id)?.ok_or(HelperError::NotFound)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(FormError::Required("Nama").into());
    }
    let name = strip_all_html(name);
    let bio = bio.map(str::trim).filter(|b| !b.is_empty()).map(strip_all_html);

    let Some(file) = avatar else {
        profiles_db_operations::update_profile(conn, profile_id, &name, bio.as_deref(), current.avatar_url.as_deref())?;
        return Ok(());
    };

    let storage_key = new_storage_key("avatars", file.extension);
    let avatar_url = store.public_url(&storage_key);
    put_object(store.clone(), storage_key.clone(), file.bytes).await?;

    if let Err(e) = profiles_db_operations::update_profile(conn, profile_id, &name, bio.as_deref(), Some(&avatar_url)) {
        log::error!("Profile update failed, removing new avatar '{}': {}", storage_key, e);
        if let Err(cleanup) = delete_object(store, storage_key.clone()).await {
            log::error!("Could not remove orphaned avatar '{}': {}", storage_key, cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}
