//! Helpers for integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use kkn_site::config::{Config, SiteConfig, WebConfig};
use kkn_site::models::db_operations::{categories_db_operations, posts_db_operations, profiles_db_operations};
use kkn_site::models::{CategoryInput, PostInput, PostStatus, Role};
use kkn_site::setup::db_setup::setup_site_db;
use kkn_site::{build_pool, DbPool};
use r2d2_sqlite::SqliteConnectionManager;
use tempfile::{NamedTempFile, TempDir};

/// Temporary site database plus a scratch directory for stored objects.
pub struct TestDb {
    _tempfile: NamedTempFile,
    media_dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let tempfile = NamedTempFile::new().expect("Failed to create temp file");
        let media_dir = TempDir::new().expect("Failed to create media dir");
        let pool = build_pool(SqliteConnectionManager::file(tempfile.path()))
            .expect("Failed to establish SQLite connection.");
        let mut conn = pool.get().expect("Failed to get SQLite connection from pool.");
        setup_site_db(&mut conn).expect("Schema setup failed");
        TestDb {
            _tempfile: tempfile,
            media_dir,
            pool,
        }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn media_dir(&self) -> &std::path::Path {
        self.media_dir.path()
    }
}

pub fn create_profile(pool: &DbPool, name: &str, email: &str, role: Role) -> String {
    let mut conn = pool.get().unwrap();
    profiles_db_operations::create_account_with_profile(&mut conn, name, email, "rahasia123", role, true).unwrap()
}

pub fn create_category(pool: &DbPool, name: &str) -> String {
    let conn = pool.get().unwrap();
    let input = CategoryInput {
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        description: None,
        color: None,
        parent_id: None,
        is_active: true,
    };
    categories_db_operations::create_category(&conn, &input).unwrap()
}

pub fn create_post(pool: &DbPool, author_id: &str, title: &str, status: PostStatus, category_id: Option<&str>) -> String {
    let conn = pool.get().unwrap();
    let input = PostInput {
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        content: format!("Isi dari **{}**.", title),
        excerpt: None,
        featured_image: None,
        status,
        category_id: category_id.map(str::to_string),
    };
    posts_db_operations::create_post(&conn, &input, author_id).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn test_config() -> Config {
    Config {
        web: WebConfig { host: "127.0.0.1".to_string(), port: 0 },
        site: SiteConfig { name: "KKN".to_string(), tagline: "Uji".to_string() },
        database_path: "/tmp".to_string(),
        media_path: "/tmp".to_string(),
        allowed_origins: String::new(),
        log_level: "info".to_string(),
        session_secret_key: String::new(),
        use_secure_cookies: false,
        require_email_confirmation: false,
        program_start_date: date(2025, 7, 21),
    }
}
