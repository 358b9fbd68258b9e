use crate::helper::sanitization_helpers::strip_all_html;
use crate::models::{CategoryInput, NewComment, PostInput, PostStatus, Profile, ProgramInput, ProgramStatus};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} wajib diisi.")]
    Required(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("Anda harus login untuk dapat berkomentar.")]
    SignInRequired,
    #[error("Permintaan sebelumnya masih diproses. Silakan tunggu.")]
    AlreadySubmitting,
}

struct SlugPatterns {
    whitespace: Regex,
    disallowed: Regex,
    dashes: Regex,
    edges: Regex,
}

fn slug_patterns() -> &'static SlugPatterns {
    static PATTERNS: OnceLock<SlugPatterns> = OnceLock::new();
    // The patterns are literals; failing to compile them is a programming error.
    PATTERNS.get_or_init(|| SlugPatterns {
        whitespace: Regex::new(r"\s+").expect("valid whitespace pattern"),
        disallowed: Regex::new(r"[^a-z0-9-]").expect("valid character pattern"),
        dashes: Regex::new(r"-+").expect("valid dash pattern"),
        edges: Regex::new(r"^-+|-+$").expect("valid edge pattern"),
    })
}

/// Derives a URL-safe slug from a title.
pub fn slugify(title: &str) -> String {
    let patterns = slug_patterns();
    let lowered = title.to_lowercase();
    let dashed = patterns.whitespace.replace_all(&lowered, "-");
    let cleaned = patterns.disallowed.replace_all(&dashed, "");
    let collapsed = patterns.dashes.replace_all(&cleaned, "-");
    patterns.edges.replace_all(&collapsed, "").into_owned()
}

/// Keys of form submissions that are currently being processed.
#[derive(Default)]
pub struct InFlightSubmissions {
    keys: Mutex<HashSet<String>>,
}

impl InFlightSubmissions {
    /// Marks `form` as in flight for `owner`. Returns `None` while an earlier
    /// submission with the same key has not finished.
    pub fn try_begin(&self, owner: &str, form: &str) -> Option<SubmissionGuard<'_>> {
        let key = format!("{}:{}", owner, form);
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.insert(key.clone()) {
            log::warn!("Rejected duplicate submission of '{}' by {}", form, owner);
            return None;
        }
        Some(SubmissionGuard { owner: self, key })
    }

    /// Like [`try_begin`](Self::try_begin) but reports the rejection as a form error.
    pub fn begin(&self, owner: &str, form: &str) -> Result<SubmissionGuard<'_>, FormError> {
        self.try_begin(owner, form).ok_or(FormError::AlreadySubmitting)
    }

    pub fn is_in_flight(&self, owner: &str, form: &str) -> bool {
        let key = format!("{}:{}", owner, form);
        self.keys.lock().map(|keys| keys.contains(&key)).unwrap_or(false)
    }
}

/// Releases its submission key when dropped.
pub struct SubmissionGuard<'a> {
    owner: &'a InFlightSubmissions,
    key: String,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.owner.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.remove(&self.key);
    }
}

fn required(value: &str, label: &'static str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FormError::Required(label))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn checkbox(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("on") | Some("true") | Some("1"))
}

fn parse_date(value: &str, label: &'static str) -> Result<NaiveDate, FormError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| FormError::Invalid(format!("{} tidak valid (format YYYY-MM-DD).", label)))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub category_id: Option<String>,
    pub status: Option<String>,
}

/// Validates the post form. `stored_slug` is the slug of the post being
/// edited; new posts derive theirs from the title.
pub fn validate_post(fields: &PostFields, stored_slug: Option<&str>) -> Result<PostInput, FormError> {
    let title = strip_all_html(&required(&fields.title, "Judul")?);
    let content = required(&fields.content, "Konten")?;
    let category_id = optional(fields.category_id.as_deref())
        .ok_or_else(|| FormError::Invalid("Pilih kategori terlebih dahulu.".to_string()))?;
    let status = match optional(fields.status.as_deref()) {
        Some(status) => status.parse::<PostStatus>().map_err(FormError::Invalid)?,
        None => PostStatus::Published,
    };

    let slug = match stored_slug {
        Some(slug) => slug.to_string(),
        None => slugify(&title),
    };
    if slug.is_empty() {
        return Err(FormError::Invalid("Judul harus mengandung huruf atau angka.".to_string()));
    }

    Ok(PostInput {
        title,
        slug,
        content,
        excerpt: optional(fields.excerpt.as_deref()).map(|e| strip_all_html(&e)),
        featured_image: optional(fields.featured_image.as_deref()),
        status,
        category_id: Some(category_id),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFields {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
    pub is_active: Option<String>,
}

/// `editing_id` is set when updating; a category cannot become its own parent.
pub fn validate_category(fields: &CategoryFields, editing_id: Option<&str>) -> Result<CategoryInput, FormError> {
    let name = strip_all_html(&required(&fields.name, "Nama kategori")?);
    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(FormError::Invalid("Nama kategori harus mengandung huruf atau angka.".to_string()));
    }

    let parent_id = optional(fields.parent_id.as_deref());
    if parent_id.is_some() && parent_id.as_deref() == editing_id {
        return Err(FormError::Invalid("Kategori tidak dapat menjadi induk dirinya sendiri.".to_string()));
    }

    Ok(CategoryInput {
        name,
        slug,
        description: optional(fields.description.as_deref()),
        color: optional(fields.color.as_deref()),
        parent_id,
        is_active: checkbox(fields.is_active.as_deref()),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgramFields {
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub status: Option<String>,
}

pub fn validate_program(fields: &ProgramFields) -> Result<ProgramInput, FormError> {
    let title = strip_all_html(&required(&fields.title, "Judul program")?);
    let start_date = parse_date(&required(&fields.start_date, "Tanggal mulai")?, "Tanggal mulai")?;
    let end_date = match optional(fields.end_date.as_deref()) {
        Some(raw) => Some(parse_date(&raw, "Tanggal selesai")?),
        None => None,
    };
    if let Some(end) = end_date {
        if end < start_date {
            return Err(FormError::Invalid("Tanggal selesai tidak boleh sebelum tanggal mulai.".to_string()));
        }
    }
    let status = match optional(fields.status.as_deref()) {
        Some(status) => status.parse::<ProgramStatus>().map_err(FormError::Invalid)?,
        None => ProgramStatus::Planned,
    };

    Ok(ProgramInput {
        title,
        description: optional(fields.description.as_deref()),
        start_date,
        end_date,
        status,
    })
}

/// Checks the sign-in requirement before anything else, so an anonymous
/// visitor never reaches the database.
pub fn validate_comment(author: Option<&Profile>, post_id: &str, content: &str) -> Result<NewComment, FormError> {
    let author = author.ok_or(FormError::SignInRequired)?;
    let content = strip_all_html(&required(content, "Komentar")?);
    let author_name = match author.name.trim() {
        "" => "Anonim".to_string(),
        name => name.to_string(),
    };

    Ok(NewComment {
        post_id: post_id.to_string(),
        author_id: author.id.clone(),
        author_name,
        content,
    })
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<Registration, FormError> {
    let name = strip_all_html(&required(name, "Nama")?);
    let email = required(email, "Email")?;
    if !email.contains('@') {
        return Err(FormError::Invalid("Format email tidak valid.".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(FormError::Invalid(format!(
            "Password minimal {} karakter.",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(Registration { name, email, password: password.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn member(name: &str) -> Profile {
        Profile {
            id: "p-1".to_string(),
            name: name.to_string(),
            email: "warga@example.com".to_string(),
            role: Role::Member,
            bio: None,
            avatar_url: None,
            created_at: Utc::now(),
            last_sign_in_at: None,
        }
    }

    #[test]
    fn slugify_strips_punctuation_and_edges() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Kerja  Bakti -- Dusun 3 "), "kerja-bakti-dusun-3");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_never_starts_or_ends_with_hyphen() {
        for title in ["-Posyandu-", "  ¿Qué?  ", "Rust & Actix", "a -- b"] {
            let slug = slugify(title);
            assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{}", slug);
            assert!(!slug.contains("--"), "{}", slug);
        }
    }

    #[test]
    fn in_flight_submission_is_rejected_until_guard_drops() {
        let submissions = InFlightSubmissions::default();
        let guard = submissions.try_begin("p-1", "post");
        assert!(guard.is_some());
        assert!(submissions.try_begin("p-1", "post").is_none());
        assert!(submissions.try_begin("p-2", "post").is_some());

        drop(guard);
        assert!(!submissions.is_in_flight("p-1", "post"));
        assert!(submissions.try_begin("p-1", "post").is_some());
    }

    #[test]
    fn post_requires_category_and_defaults_to_published() {
        let mut fields = PostFields {
            title: "Hello, World!".to_string(),
            content: "Isi".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_post(&fields, None).unwrap_err().to_string(),
            "Pilih kategori terlebih dahulu."
        );

        fields.category_id = Some("cat-1".to_string());
        let input = validate_post(&fields, None).unwrap();
        assert_eq!(input.slug, "hello-world");
        assert_eq!(input.status, PostStatus::Published);
    }

    #[test]
    fn ampersand_title_keeps_plain_text_and_clean_slug() {
        let fields = PostFields {
            title: "Rust & Actix".to_string(),
            content: "Isi".to_string(),
            excerpt: Some("<p>Tips & trik</p>".to_string()),
            category_id: Some("cat-1".to_string()),
            ..Default::default()
        };
        let input = validate_post(&fields, None).unwrap();
        assert_eq!(input.title, "Rust & Actix");
        assert_eq!(input.slug, "rust-actix");
        assert_eq!(input.excerpt.as_deref(), Some("Tips & trik"));

        let category = CategoryFields {
            name: "Air & Sanitasi".to_string(),
            ..Default::default()
        };
        let input = validate_category(&category, None).unwrap();
        assert_eq!(input.name, "Air & Sanitasi");
        assert_eq!(input.slug, "air-sanitasi");
    }

    #[test]
    fn editing_keeps_stored_slug() {
        let fields = PostFields {
            title: "Judul Baru".to_string(),
            content: "Isi".to_string(),
            category_id: Some("cat-1".to_string()),
            status: Some("draft".to_string()),
            ..Default::default()
        };
        let input = validate_post(&fields, Some("judul-lama")).unwrap();
        assert_eq!(input.slug, "judul-lama");
        assert_eq!(input.status, PostStatus::Draft);
    }

    #[test]
    fn category_cannot_parent_itself() {
        let fields = CategoryFields {
            name: "Kesehatan".to_string(),
            parent_id: Some("c-1".to_string()),
            is_active: Some("on".to_string()),
            ..Default::default()
        };
        assert!(validate_category(&fields, Some("c-1")).is_err());
        let input = validate_category(&fields, Some("c-2")).unwrap();
        assert_eq!(input.slug, "kesehatan");
        assert!(input.is_active);
    }

    #[test]
    fn program_end_date_must_follow_start() {
        let fields = ProgramFields {
            title: "Posyandu".to_string(),
            start_date: "2025-08-10".to_string(),
            end_date: Some("2025-08-01".to_string()),
            ..Default::default()
        };
        assert!(validate_program(&fields).is_err());
    }

    #[test]
    fn anonymous_comment_is_rejected() {
        assert_eq!(validate_comment(None, "post-1", "Mantap"), Err(FormError::SignInRequired));
        assert_eq!(
            FormError::SignInRequired.to_string(),
            "Anda harus login untuk dapat berkomentar."
        );
    }

    #[test]
    fn comment_without_author_name_falls_back_to_anonymous() {
        let comment = validate_comment(Some(&member("  ")), "post-1", "<b>Mantap</b>").unwrap();
        assert_eq!(comment.author_name, "Anonim");
        assert_eq!(comment.content, "Mantap");
    }

    #[test]
    fn comment_text_is_stored_unescaped() {
        let comment = validate_comment(Some(&member("Sari")), "post-1", "2 < 3 & 5 > 4").unwrap();
        assert_eq!(comment.content, "2 < 3 & 5 > 4");
    }

    #[test]
    fn registration_checks_password_length() {
        assert!(validate_registration("Sari", "sari@example.com", "123").is_err());
        assert!(validate_registration("Sari", "sari@example.com", "rahasia").is_ok());
        assert_eq!(
            validate_registration("", "sari@example.com", "rahasia"),
            Err(FormError::Required("Nama"))
        );
    }
}
