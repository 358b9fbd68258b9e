use rusqlite::{Connection, Result as RusqliteResult, Transaction};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

const TABLES: &[(&str, &str)] = &[
    (
        "accounts",
        "CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            email_confirmed INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
    ),
    (
        "profiles",
        "CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'member' CHECK(role IN ('member', 'admin')),
            bio TEXT,
            avatar_url TEXT,
            created_at TEXT NOT NULL,
            last_sign_in_at TEXT
        )",
    ),
    (
        "categories",
        "CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT,
            color TEXT,
            parent_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
    ),
    (
        "posts",
        "CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            excerpt TEXT,
            featured_image TEXT,
            status TEXT NOT NULL DEFAULT 'draft' CHECK(status IN ('draft', 'published')),
            category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
            author_id TEXT NOT NULL REFERENCES profiles(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
    (
        "programs",
        "CREATE TABLE IF NOT EXISTS programs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            start_date TEXT NOT NULL,
            end_date TEXT,
            status TEXT NOT NULL DEFAULT 'planned' CHECK(status IN ('planned', 'ongoing', 'completed')),
            responsible_person TEXT NOT NULL REFERENCES profiles(id),
            created_at TEXT NOT NULL
        )",
    ),
    (
        "media",
        "CREATE TABLE IF NOT EXISTS media (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            storage_key TEXT NOT NULL UNIQUE,
            url TEXT NOT NULL,
            alt_text TEXT,
            category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
            uploaded_by TEXT NOT NULL REFERENCES profiles(id),
            created_at TEXT NOT NULL
        )",
    ),
    (
        "comments",
        "CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
            author_name TEXT NOT NULL,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'approved')),
            created_at TEXT NOT NULL
        )",
    ),
    (
        "settings",
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    ),
];

pub fn setup_site_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    for (name, ddl) in TABLES {
        log::info!("Creating '{}' table...", name);
        tx.execute(ddl, [])?;
    }
    tx.execute("CREATE INDEX IF NOT EXISTS idx_posts_status_created ON posts (status, created_at)", [])?;
    tx.execute("CREATE INDEX IF NOT EXISTS idx_media_category ON media (category_id)", [])?;
    tx.execute("CREATE INDEX IF NOT EXISTS idx_comments_post ON comments (post_id, status)", [])?;

    seed_initial_settings(&tx)?;

    tx.commit()?;
    Ok(())
}

fn seed_initial_settings(tx: &Transaction) -> RusqliteResult<()> {
    let default_max_size = "5";
    tx.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('max_file_upload_size_mb', ?1)",
        [&default_max_size],
    )?;
    log::info!("Default max file upload size set to: {} MB", default_max_size);

    let default_mime_types = "image/jpeg,image/png,image/gif,image/webp";
    tx.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('allowed_mime_types', ?1)",
        [&default_mime_types],
    )?;
    log::info!("Default allowed MIME types set to: {}", default_mime_types);

    Ok(())
}
