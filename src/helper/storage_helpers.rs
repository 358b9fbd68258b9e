use crate::models::db_operations::profiles_db_operations;
use actix_multipart::Multipart;
use actix_web::web::{self, BytesMut};
use futures_util::StreamExt;
use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Gagal mengakses penyimpanan: {0}")]
    Io(#[from] std::io::Error),
    #[error("Kunci penyimpanan tidak valid: {0}")]
    InvalidKey(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Gagal membaca unggahan: {0}")]
    Multipart(String),
    #[error("Operasi penyimpanan terputus: {0}")]
    Blocking(String),
}

/// Where uploaded objects live. Keys are relative, slash-separated paths.
pub trait ObjectStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    /// Deleting a key that does not exist succeeds.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
    fn public_url(&self, key: &str) -> String;
}

pub type SharedObjectStore = Arc<dyn ObjectStore>;

/// Stores objects as files below `root`, served under `url_prefix`.
pub struct LocalObjectStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        LocalObjectStore {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("Object '{}' was already missing during deletion.", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }
}

/// Maps a validated MIME type to a fixed file extension. Not configurable.
pub fn mime_to_safe_extension(mime_type: &str) -> Option<&'static str> {
    let map: BTreeMap<&str, &str> = [
        ("image/gif", "gif"),
        ("image/jpeg", "jpg"),
        ("image/png", "png"),
        ("image/webp", "webp"),
    ]
    .into_iter()
    .collect();

    map.get(mime_type).copied()
}

/// Builds a sharded key such as `media/ab/cd/abcd....png`.
pub fn new_storage_key(bucket: &str, extension: &str) -> String {
    let id = Uuid::new_v4().to_string();
    format!("{}/{}/{}/{}.{}", bucket, &id[0..2], &id[2..4], id, extension)
}

/// Upload limits read from the settings table.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size_mb: u64,
    pub allowed_mime_types: HashSet<String>,
}

impl UploadPolicy {
    pub fn from_settings(conn: &Connection) -> Self {
        let max_file_size_mb = profiles_db_operations::read_setting(conn, "max_file_upload_size_mb")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(5);
        let allowed_mime_types = profiles_db_operations::read_setting(conn, "allowed_mime_types")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        UploadPolicy { max_file_size_mb, allowed_mime_types }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Returns the file extension for an accepted content type.
    pub fn accept(&self, content_type: &str) -> Result<&'static str, StorageError> {
        if self.allowed_mime_types.is_empty() {
            return Err(StorageError::Rejected(
                "Unggahan file sedang dinonaktifkan. Tidak ada tipe file yang diizinkan.".to_string(),
            ));
        }
        if !self.allowed_mime_types.contains(content_type) {
            return Err(StorageError::Rejected(format!(
                "Tipe file '{}' tidak didukung.",
                content_type
            )));
        }
        match mime_to_safe_extension(content_type) {
            Some(ext) => Ok(ext),
            None => {
                log::error!("Allowed MIME type '{}' has no safe extension mapping.", content_type);
                Err(StorageError::Rejected(format!("Tipe file '{}' tidak didukung.", content_type)))
            }
        }
    }
}

/// A file read from a multipart request, already checked against the policy.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_filename: String,
    pub content_type: String,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Text fields plus the optional file of a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Reads a multipart form. The part named `file_field` is validated against
/// `policy`; an empty file part counts as no file.
pub async fn read_upload_form(
    mut payload: Multipart,
    file_field: &str,
    policy: &UploadPolicy,
) -> Result<UploadForm, StorageError> {
    let mut form = UploadForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| StorageError::Multipart(e.to_string()))?;
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();

        if field_name == file_field {
            let original_filename = field
                .content_disposition()
                .get_filename()
                .unwrap_or_default()
                .to_string();
            let content_type = field.content_type().map(|m| m.essence_str().to_string());

            let mut data = BytesMut::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(|e| StorageError::Multipart(e.to_string()))?;
                data.extend_from_slice(&chunk);
                if data.len() as u64 > policy.max_bytes() {
                    return Err(StorageError::Rejected(format!(
                        "Ukuran file terlalu besar. Maksimal {} MB.",
                        policy.max_file_size_mb
                    )));
                }
            }

            if original_filename.is_empty() && data.is_empty() {
                continue;
            }
            let content_type = content_type.unwrap_or_default();
            let extension = policy.accept(&content_type)?;
            form.file = Some(UploadedFile {
                original_filename,
                content_type,
                extension,
                bytes: data.to_vec(),
            });
        } else {
            let mut data = BytesMut::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(|e| StorageError::Multipart(e.to_string()))?;
                data.extend_from_slice(&chunk);
                if data.len() > MAX_TEXT_FIELD_BYTES {
                    return Err(StorageError::Rejected(format!("Isian '{}' terlalu panjang.", field_name)));
                }
            }
            let value = String::from_utf8(data.to_vec())
                .map_err(|_| StorageError::Multipart("Invalid UTF-8 in form field.".to_string()))?;
            form.fields.insert(field_name, value);
        }
    }

    Ok(form)
}

/// Writes `bytes` under `key` on the blocking thread pool.
pub async fn put_object(store: SharedObjectStore, key: String, bytes: Vec<u8>) -> Result<(), StorageError> {
    web::block(move || store.put(&key, &bytes))
        .await
        .map_err(|e| StorageError::Blocking(e.to_string()))?
}

pub async fn delete_object(store: SharedObjectStore, key: String) -> Result<(), StorageError> {
    web::block(move || store.delete(&key))
        .await
        .map_err(|e| StorageError::Blocking(e.to_string()))?
}
