use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub tagline: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub site: SiteConfig,
    // Populated from the .env file
    pub database_path: String,
    pub media_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub require_email_confirmation: bool,
    pub program_start_date: NaiveDate,
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!(
            "FATAL: Environment variable '{}' is not set in your .env file.",
            name
        ))
    })
}

fn flag_var(name: &str) -> bool {
    env::var(name)
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false)
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = required_var("DATABASE_PATH")?;
        let media_path = required_var("MEDIA_PATH")?;
        let session_secret_key = required_var("SESSION_SECRET_KEY")?;

        // 128 hex characters decode to the 64 bytes the cookie key needs.
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string(),
            ));
        }

        for (name, value) in [("DATABASE_PATH", &database_path), ("MEDIA_PATH", &media_path)] {
            if Path::new(value).is_relative() {
                return Err(config::ConfigError::Message(format!(
                    "FATAL: The '{}' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                    name, value
                )));
            }
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let use_secure_cookies = flag_var("USE_SECURE_COOKIES");
        let require_email_confirmation = flag_var("REQUIRE_EMAIL_CONFIRMATION");

        let program_start_date = env::var("PROGRAM_START_DATE").unwrap_or_else(|_| "2025-07-21".to_string());
        if NaiveDate::parse_from_str(&program_start_date, "%Y-%m-%d").is_err() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'PROGRAM_START_DATE' must be a YYYY-MM-DD date, got '{}'.",
                program_start_date
            )));
        }

        let builder = config::Config::builder()
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("media_path", media_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("require_email_confirmation", require_email_confirmation)?
            .set_override("program_start_date", program_start_date)?
            .build()?;

        builder.try_deserialize()
    }

    /// Full path to the site database file inside its own folder.
    pub fn site_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path).join("site").join("site.db")
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}
