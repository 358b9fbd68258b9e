use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a text-backed enum stored in SQLite as its lowercase name.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Invalid {} value '{}'", stringify!($name), other)),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse().map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

text_enum!(Role { Member => "member", Admin => "admin" });
text_enum!(PostStatus { Draft => "draft", Published => "published" });
text_enum!(ProgramStatus { Planned => "planned", Ongoing => "ongoing", Completed => "completed" });
text_enum!(CommentStatus { Pending => "pending", Approved => "approved" });

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub category_id: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_name: Option<String>,
    pub author_name: Option<String>,
}

/// Field set written by the post form, for both insert and update.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProgramStatus,
    pub responsible_person: String,
    pub created_at: DateTime<Utc>,
    pub responsible_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgramInput {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProgramStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Media {
    pub id: String,
    pub filename: String,
    pub storage_key: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub category_id: Option<String>,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub storage_key: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub category_id: Option<String>,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: Option<String>,
    pub author_name: String,
    pub content: String,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub post_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
}

/// Public counters shown on the home page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteStats {
    pub total_programs: i64,
    pub total_days: i64,
    pub total_members: i64,
    pub total_posts: i64,
    pub total_media: i64,
}

/// Row counts per table for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardCounts {
    pub posts: i64,
    pub categories: i64,
    pub comments: i64,
    pub programs: i64,
    pub profiles: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification { message: message.into(), r#type: "success".to_string() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification { message: message.into(), r#type: "error".to_string() }
    }
}

pub mod db_operations;
