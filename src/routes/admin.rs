use crate::config::Config;
use crate::helper::admin_helpers;
use crate::helper::form_helpers::{
    validate_category, validate_post, validate_program, CategoryFields, PostFields, ProgramFields,
};
use crate::helper::media_helpers::{self, MediaDetails};
use crate::helper::storage_helpers::{read_upload_form, SharedObjectStore, UploadPolicy};
use crate::middleware::{AdminUser, CurrentUser};
use crate::models::db_operations::posts_db_operations::{self, PostFilter};
use crate::models::db_operations::{
    categories_db_operations, comments_db_operations, media_db_operations, profiles_db_operations,
    programs_db_operations, stats_db_operations,
};
use crate::models::DashboardCounts;
use crate::routes::{
    base_context, conn_or_redirect, notify_error, notify_success, redirect, render, render_not_found, ActionForm,
    CsrfForm,
};
use crate::{AppState, DbPool};
use actix_csrf::extractor::{Csrf, CsrfToken};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use tera::{Context, Tera};

#[derive(Deserialize)]
pub struct RoleFields {
    role: String,
}

#[derive(Deserialize)]
pub struct SettingsFields {
    max_file_upload_size_mb: String,
    allowed_mime_types: String,
}

#[derive(Deserialize)]
pub struct AdminPostsQuery {
    q: Option<String>,
}

/// Form pages below `/admin` whose GET must hand out a CSRF token.
pub const ADMIN_FORM_PAGES: &[&str] = &[
    "/admin/posts",
    "/admin/posts/new",
    "/admin/posts/{id}/edit",
    "/admin/categories",
    "/admin/categories/new",
    "/admin/categories/{id}/edit",
    "/admin/programs",
    "/admin/programs/new",
    "/admin/programs/{id}/edit",
    "/admin/media",
    "/admin/users",
    "/admin/comments",
    "/admin/settings",
];

pub fn config_admin(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(show_dashboard))
        .route("/posts", web::get().to(list_posts))
        .route("/posts/new", web::get().to(new_post_form))
        .route("/posts/new", web::post().to(create_post_action))
        .route("/posts/{id}/edit", web::get().to(edit_post_form))
        .route("/posts/{id}/edit", web::post().to(update_post_action))
        .route("/posts/{id}/delete", web::post().to(delete_post_action))
        .route("/categories", web::get().to(list_categories))
        .route("/categories/new", web::get().to(new_category_form))
        .route("/categories/new", web::post().to(create_category_action))
        .route("/categories/{id}/edit", web::get().to(edit_category_form))
        .route("/categories/{id}/edit", web::post().to(update_category_action))
        .route("/categories/{id}/delete", web::post().to(delete_category_action))
        .route("/programs", web::get().to(list_programs))
        .route("/programs/new", web::get().to(new_program_form))
        .route("/programs/new", web::post().to(create_program_action))
        .route("/programs/{id}/edit", web::get().to(edit_program_form))
        .route("/programs/{id}/edit", web::post().to(update_program_action))
        .route("/programs/{id}/delete", web::post().to(delete_program_action))
        .route("/media", web::get().to(list_media))
        .route("/media/new", web::get().to(new_media_form))
        .route("/media/new", web::post().to(upload_media_action))
        .route("/media/{id}/delete", web::post().to(delete_media_action))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}/role", web::post().to(change_role_action))
        .route("/users/{id}/confirm", web::post().to(confirm_user_action))
        .route("/comments", web::get().to(list_comments))
        .route("/comments/{id}/approve", web::post().to(approve_comment_action))
        .route("/comments/{id}/delete", web::post().to(delete_comment_action))
        .route("/settings", web::get().to(show_settings))
        .route("/settings", web::post().to(update_settings_action));
}

fn admin_context(config: &Config, admin: &AdminUser, session: &Session, token: Option<&CsrfToken>) -> Context {
    let user = CurrentUser(Some(admin.0.clone()));
    let mut ctx = base_context(config, &user, session);
    if let Some(token) = token {
        ctx.insert("csrf_token", token.get());
    }
    ctx
}

/// Inserts the result of a read into the context, or an empty list plus the
/// error message when the read failed.
fn insert_list<T: serde::Serialize, E: std::fmt::Display>(ctx: &mut Context, key: &str, result: Result<Vec<T>, E>) {
    match result {
        Ok(items) => ctx.insert(key, &items),
        Err(e) => {
            log::error!("Failed to load '{}' for admin page: {}", key, e);
            ctx.insert(key, &Vec::<T>::new());
            ctx.insert("load_error", &e.to_string());
        }
    }
}

// --- Dashboard ---

async fn show_dashboard(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = admin_context(&config, &admin, &session, None);

    let counts = pool
        .get()
        .map_err(|e| e.to_string())
        .and_then(|conn| stats_db_operations::read_dashboard_counts(&conn).map_err(|e| e.to_string()));
    match counts {
        Ok(counts) => ctx.insert("counts", &counts),
        Err(e) => {
            log::error!("Failed to load dashboard counts: {}", e);
            ctx.insert("counts", &DashboardCounts::default());
            ctx.insert("load_error", &e);
        }
    }
    render(&tera, "admin/dashboard.html", &ctx)
}

// --- Posts ---

async fn list_posts(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
    query: web::Query<AdminPostsQuery>,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    let filter = PostFilter {
        title_query: query.into_inner().q,
        ..PostFilter::default()
    };
    ctx.insert("q", &filter.title_query.clone().unwrap_or_default());
    insert_list(&mut ctx, "posts", posts_db_operations::read_posts(&conn, &filter));
    render(&tera, "admin/posts.html", &ctx)
}

fn render_post_form(tera: &Tera, conn: &rusqlite::Connection, ctx: &mut Context) -> HttpResponse {
    insert_list(ctx, "categories", categories_db_operations::read_active_categories(conn, None));
    insert_list(ctx, "media", media_db_operations::read_media_list(conn, None, Some(50)));
    render(tera, "admin/post_form.html", ctx)
}

async fn new_post_form(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin/posts") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    render_post_form(&tera, &conn, &mut ctx)
}

async fn create_post_action(
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<CsrfForm<PostFields>>>,
) -> HttpResponse {
    let fields = form.into_inner().into_inner().fields;
    let _guard = match app_state.submissions.begin(&admin.0.id, "post") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/posts/new");
        }
    };

    let input = match validate_post(&fields, None) {
        Ok(input) => input,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/posts/new");
        }
    };

    let conn = match conn_or_redirect(&pool, &session, "/admin/posts/new") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match posts_db_operations::slug_exists(&conn, &input.slug, None) {
        Ok(false) => {}
        Ok(true) => {
            notify_error(
                &session,
                format!("Slug '{}' sudah digunakan artikel lain. Gunakan judul yang berbeda.", input.slug),
            );
            return redirect("/admin/posts/new");
        }
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/posts/new");
        }
    }

    match posts_db_operations::create_post(&conn, &input, &admin.0.id) {
        Ok(id) => {
            log::info!("Admin {} created post {}", admin.0.id, id);
            notify_success(&session, "Artikel berhasil disimpan.");
            redirect("/admin/posts")
        }
        Err(e) => {
            log::error!("Failed to create post: {}", e);
            notify_error(&session, e.to_string());
            redirect("/admin/posts/new")
        }
    }
}

async fn edit_post_form(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin/posts") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match posts_db_operations::read_post(&conn, &id) {
        Ok(Some(post)) => {
            ctx.insert("post", &post);
            render_post_form(&tera, &conn, &mut ctx)
        }
        Ok(None) => render_not_found(&tera, &mut ctx, "Artikel tidak ditemukan."),
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect("/admin/posts")
        }
    }
}

async fn update_post_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<CsrfForm<PostFields>>>,
) -> HttpResponse {
    let id = id.into_inner();
    let edit_url = format!("/admin/posts/{}/edit", id);
    let fields = form.into_inner().into_inner().fields;
    let _guard = match app_state.submissions.begin(&admin.0.id, "post") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&edit_url);
        }
    };

    let conn = match conn_or_redirect(&pool, &session, &edit_url) {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    let existing = match posts_db_operations::read_post(&conn, &id) {
        Ok(Some(post)) => post,
        Ok(None) => return HttpResponse::NotFound().body("Artikel tidak ditemukan."),
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&edit_url);
        }
    };

    let input = match validate_post(&fields, Some(existing.slug.as_str())) {
        Ok(input) => input,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&edit_url);
        }
    };

    match posts_db_operations::update_post(&conn, &id, &input, &admin.0.id) {
        Ok(_) => {
            notify_success(&session, "Artikel berhasil diperbarui.");
            redirect("/admin/posts")
        }
        Err(e) => {
            log::error!("Failed to update post {}: {}", id, e);
            notify_error(&session, e.to_string());
            redirect(&edit_url)
        }
    }
}

async fn delete_post_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    _form: Csrf<web::Form<ActionForm>>,
) -> HttpResponse {
    let conn = match conn_or_redirect(&pool, &session, "/admin/posts") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match posts_db_operations::delete_post(&conn, &id) {
        Ok(0) => notify_error(&session, "Artikel tidak ditemukan."),
        Ok(_) => {
            log::info!("Admin {} deleted post {}", admin.0.id, id);
            notify_success(&session, "Artikel berhasil dihapus.");
        }
        Err(e) => notify_error(&session, e.to_string()),
    }
    redirect("/admin/posts")
}

// --- Categories ---

async fn list_categories(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    insert_list(&mut ctx, "categories", categories_db_operations::read_all_categories(&conn));
    render(&tera, "admin/categories.html", &ctx)
}

async fn new_category_form(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin/categories") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    insert_list(&mut ctx, "parents", categories_db_operations::read_active_categories(&conn, None));
    render(&tera, "admin/category_form.html", &ctx)
}

async fn create_category_action(
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<CsrfForm<CategoryFields>>>,
) -> HttpResponse {
    let fields = form.into_inner().into_inner().fields;
    let _guard = match app_state.submissions.begin(&admin.0.id, "category") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/categories/new");
        }
    };
    let input = match validate_category(&fields, None) {
        Ok(input) => input,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/categories/new");
        }
    };
    let conn = match conn_or_redirect(&pool, &session, "/admin/categories/new") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match categories_db_operations::create_category(&conn, &input) {
        Ok(_) => {
            notify_success(&session, "Kategori berhasil dibuat.");
            redirect("/admin/categories")
        }
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect("/admin/categories/new")
        }
    }
}

async fn edit_category_form(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin/categories") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match categories_db_operations::read_category(&conn, &id) {
        Ok(Some(category)) => {
            ctx.insert("category", &category);
            insert_list(
                &mut ctx,
                "parents",
                categories_db_operations::read_active_categories(&conn, Some(category.id.as_str())),
            );
            render(&tera, "admin/category_form.html", &ctx)
        }
        Ok(None) => render_not_found(&tera, &mut ctx, "Kategori tidak ditemukan."),
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect("/admin/categories")
        }
    }
}

async fn update_category_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<CsrfForm<CategoryFields>>>,
) -> HttpResponse {
    let id = id.into_inner();
    let edit_url = format!("/admin/categories/{}/edit", id);
    let fields = form.into_inner().into_inner().fields;
    let _guard = match app_state.submissions.begin(&admin.0.id, "category") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&edit_url);
        }
    };
    let input = match validate_category(&fields, Some(id.as_str())) {
        Ok(input) => input,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&edit_url);
        }
    };
    let conn = match conn_or_redirect(&pool, &session, &edit_url) {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match categories_db_operations::update_category(&conn, &id, &input) {
        Ok(0) => HttpResponse::NotFound().body("Kategori tidak ditemukan."),
        Ok(_) => {
            notify_success(&session, "Kategori berhasil diperbarui.");
            redirect("/admin/categories")
        }
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect(&edit_url)
        }
    }
}

async fn delete_category_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    _form: Csrf<web::Form<ActionForm>>,
) -> HttpResponse {
    let conn = match conn_or_redirect(&pool, &session, "/admin/categories") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match categories_db_operations::delete_category(&conn, &id) {
        Ok(0) => notify_error(&session, "Kategori tidak ditemukan."),
        Ok(_) => {
            log::info!("Admin {} deleted category {}", admin.0.id, id);
            notify_success(&session, "Kategori berhasil dihapus.");
        }
        Err(e) => notify_error(&session, e.to_string()),
    }
    redirect("/admin/categories")
}

// --- Programs ---

async fn list_programs(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    insert_list(&mut ctx, "programs", programs_db_operations::read_programs(&conn, None));
    render(&tera, "admin/programs.html", &ctx)
}

async fn new_program_form(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> impl Responder {
    let ctx = admin_context(&config, &admin, &session, Some(&token));
    render(&tera, "admin/program_form.html", &ctx)
}

async fn create_program_action(
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<CsrfForm<ProgramFields>>>,
) -> HttpResponse {
    let fields = form.into_inner().into_inner().fields;
    let _guard = match app_state.submissions.begin(&admin.0.id, "program") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/programs/new");
        }
    };
    let input = match validate_program(&fields) {
        Ok(input) => input,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/programs/new");
        }
    };
    let conn = match conn_or_redirect(&pool, &session, "/admin/programs/new") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match programs_db_operations::create_program(&conn, &input, &admin.0.id) {
        Ok(_) => {
            notify_success(&session, "Program kerja berhasil dibuat.");
            redirect("/admin/programs")
        }
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect("/admin/programs/new")
        }
    }
}

async fn edit_program_form(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin/programs") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match programs_db_operations::read_program(&conn, &id) {
        Ok(Some(program)) => {
            ctx.insert("program", &program);
            render(&tera, "admin/program_form.html", &ctx)
        }
        Ok(None) => render_not_found(&tera, &mut ctx, "Program tidak ditemukan."),
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect("/admin/programs")
        }
    }
}

async fn update_program_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<CsrfForm<ProgramFields>>>,
) -> HttpResponse {
    let id = id.into_inner();
    let edit_url = format!("/admin/programs/{}/edit", id);
    let fields = form.into_inner().into_inner().fields;
    let _guard = match app_state.submissions.begin(&admin.0.id, "program") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&edit_url);
        }
    };
    let input = match validate_program(&fields) {
        Ok(input) => input,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&edit_url);
        }
    };
    let conn = match conn_or_redirect(&pool, &session, &edit_url) {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match programs_db_operations::update_program(&conn, &id, &input) {
        Ok(0) => HttpResponse::NotFound().body("Program tidak ditemukan."),
        Ok(_) => {
            notify_success(&session, "Program kerja berhasil diperbarui.");
            redirect("/admin/programs")
        }
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect(&edit_url)
        }
    }
}

async fn delete_program_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    _form: Csrf<web::Form<ActionForm>>,
) -> HttpResponse {
    let conn = match conn_or_redirect(&pool, &session, "/admin/programs") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match programs_db_operations::delete_program(&conn, &id) {
        Ok(0) => notify_error(&session, "Program tidak ditemukan."),
        Ok(_) => {
            log::info!("Admin {} deleted program {}", admin.0.id, id);
            notify_success(&session, "Program kerja berhasil dihapus.");
        }
        Err(e) => notify_error(&session, e.to_string()),
    }
    redirect("/admin/programs")
}

// --- Media ---

async fn list_media(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    insert_list(&mut ctx, "media", media_db_operations::read_media_list(&conn, None, None));
    render(&tera, "admin/media.html", &ctx)
}

async fn new_media_form(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, None);
    let conn = match conn_or_redirect(&pool, &session, "/admin/media") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    ctx.insert("settings", &admin_helpers::get_settings(&conn));
    insert_list(&mut ctx, "categories", categories_db_operations::read_active_categories(&conn, None));
    render(&tera, "admin/media_form.html", &ctx)
}

async fn upload_media_action(
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    store: web::Data<SharedObjectStore>,
    app_state: web::Data<AppState>,
    payload: Multipart,
) -> HttpResponse {
    let _guard = match app_state.submissions.begin(&admin.0.id, "media") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/media/new");
        }
    };
    let conn = match conn_or_redirect(&pool, &session, "/admin/media/new") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    let policy = UploadPolicy::from_settings(&conn);
    let upload = match read_upload_form(payload, "file", &policy).await {
        Ok(upload) => upload,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/media/new");
        }
    };

    let details = MediaDetails {
        alt_text: upload.field("alt_text").map(str::to_string),
        category_id: upload.field("category_id").map(str::to_string),
    };
    match media_helpers::upload_media(&conn, store.get_ref().clone(), upload.file, details, &admin.0.id).await {
        Ok(media) => {
            log::info!("Admin {} uploaded media {}", admin.0.id, media.id);
            notify_success(&session, "Media berhasil diunggah.");
            redirect("/admin/media")
        }
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect("/admin/media/new")
        }
    }
}

async fn delete_media_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    store: web::Data<SharedObjectStore>,
    _form: Csrf<web::Form<ActionForm>>,
) -> HttpResponse {
    let conn = match conn_or_redirect(&pool, &session, "/admin/media") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match media_helpers::delete_media_item(&conn, store.get_ref().clone(), &id).await {
        Ok(()) => {
            log::info!("Admin {} deleted media {}", admin.0.id, id);
            notify_success(&session, "Media berhasil dihapus.");
        }
        Err(e) => {
            log::error!("Failed to delete media {}: {}", id, e);
            notify_error(&session, e.to_string());
        }
    }
    redirect("/admin/media")
}

// --- Users ---

async fn list_users(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    insert_list(&mut ctx, "users", profiles_db_operations::read_all_profiles(&conn));
    insert_list(&mut ctx, "unconfirmed", profiles_db_operations::read_unconfirmed_account_ids(&conn));
    render(&tera, "admin/users.html", &ctx)
}

async fn change_role_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<CsrfForm<RoleFields>>>,
) -> HttpResponse {
    let fields = form.into_inner().into_inner().fields;
    let conn = match conn_or_redirect(&pool, &session, "/admin/users") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match admin_helpers::change_role(&conn, &admin.0.id, &id, &fields.role) {
        Ok(()) => {
            log::info!("Admin {} set role of {} to {}", admin.0.id, id, fields.role);
            notify_success(&session, "Peran pengguna berhasil diperbarui.");
        }
        Err(e) => notify_error(&session, e.to_string()),
    }
    redirect("/admin/users")
}

async fn confirm_user_action(
    id: web::Path<String>,
    admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    _form: Csrf<web::Form<ActionForm>>,
) -> HttpResponse {
    let conn = match conn_or_redirect(&pool, &session, "/admin/users") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match profiles_db_operations::confirm_email(&conn, &id) {
        Ok(0) => notify_error(&session, "Pengguna tidak ditemukan."),
        Ok(_) => {
            log::info!("Admin {} confirmed account {}", admin.0.id, id);
            notify_success(&session, "Akun berhasil dikonfirmasi.");
        }
        Err(e) => notify_error(&session, e.to_string()),
    }
    redirect("/admin/users")
}

// --- Comments ---

async fn list_comments(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    insert_list(&mut ctx, "comments", comments_db_operations::read_all_comments(&conn));
    render(&tera, "admin/comments.html", &ctx)
}

async fn approve_comment_action(
    id: web::Path<String>,
    session: Session,
    pool: web::Data<DbPool>,
    _admin: AdminUser,
    _form: Csrf<web::Form<ActionForm>>,
) -> HttpResponse {
    let conn = match conn_or_redirect(&pool, &session, "/admin/comments") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match comments_db_operations::approve_comment(&conn, &id) {
        Ok(0) => notify_error(&session, "Komentar tidak ditemukan."),
        Ok(_) => notify_success(&session, "Komentar disetujui."),
        Err(e) => notify_error(&session, e.to_string()),
    }
    redirect("/admin/comments")
}

async fn delete_comment_action(
    id: web::Path<String>,
    session: Session,
    pool: web::Data<DbPool>,
    _admin: AdminUser,
    _form: Csrf<web::Form<ActionForm>>,
) -> HttpResponse {
    let conn = match conn_or_redirect(&pool, &session, "/admin/comments") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    match comments_db_operations::delete_comment(&conn, &id) {
        Ok(0) => notify_error(&session, "Komentar tidak ditemukan."),
        Ok(_) => notify_success(&session, "Komentar dihapus."),
        Err(e) => notify_error(&session, e.to_string()),
    }
    redirect("/admin/comments")
}

// --- Settings ---

async fn show_settings(
    admin: AdminUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> HttpResponse {
    let mut ctx = admin_context(&config, &admin, &session, Some(&token));
    let conn = match conn_or_redirect(&pool, &session, "/admin") {
        Ok(conn) => conn,
        Err(response) => return response,
    };
    ctx.insert("settings", &admin_helpers::get_settings(&conn));
    render(&tera, "admin/settings.html", &ctx)
}

async fn update_settings_action(
    _admin: AdminUser,
    session: Session,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<CsrfForm<SettingsFields>>>,
) -> HttpResponse {
    let fields = form.into_inner().into_inner().fields;
    let settings = match admin_helpers::validate_settings(&fields.max_file_upload_size_mb, &fields.allowed_mime_types) {
        Ok(settings) => settings,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/admin/settings");
        }
    };
    let conn = match conn_or_redirect(&pool, &session, "/admin/settings") {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match admin_helpers::save_settings(&conn, &settings) {
        Ok(()) => notify_success(&session, "Pengaturan berhasil disimpan."),
        Err(e) => {
            log::error!("Failed to update settings: {}", e);
            notify_error(&session, e.to_string());
        }
    }
    redirect("/admin/settings")
}
