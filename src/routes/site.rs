use crate::config::Config;
use crate::helper::form_helpers::{validate_comment, FormError};
use crate::helper::public_helpers;
use crate::middleware::CurrentUser;
use crate::models::db_operations::{comments_db_operations, posts_db_operations};
use crate::routes::{base_context, notify_error, notify_success, redirect, render, render_not_found};
use crate::{AppState, DbPool};
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use chrono::Local;
use serde::Deserialize;
use tera::Tera;

#[derive(Deserialize)]
pub struct BlogQuery {
    q: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
pub struct GalleryQuery {
    category: Option<String>,
}

#[derive(Deserialize)]
struct CommentForm {
    csrf_token: CsrfToken,
    content: String,
}

impl CsrfGuarded for CommentForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

pub fn config_site(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(show_home))
        .route("/blog", web::get().to(show_blog))
        .route("/blog/{slug}", web::get().to(show_post))
        .route("/blog/{slug}/comments", web::post().to(submit_comment))
        .route("/galeri", web::get().to(show_gallery))
        .route("/program", web::get().to(show_programs))
        .route("/anggota", web::get().to(show_members));
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn show_home(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = base_context(&config, &user, &session);
    let today = Local::now().date_naive();

    ctx.insert("posts", &public_helpers::load_published_posts(&pool, None, None, Some(3)));
    ctx.insert("media", &public_helpers::load_media(&pool, None, Some(6)));
    ctx.insert("programs", &public_helpers::load_programs(&pool, Some(3)));
    ctx.insert("members", &public_helpers::load_members(&pool, Some(8)));
    ctx.insert("stats", &public_helpers::load_stats(&pool, config.program_start_date, today));

    render(&tera, "home.html", &ctx)
}

async fn show_blog(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    query: web::Query<BlogQuery>,
) -> impl Responder {
    let query = query.into_inner();
    let q = blank_to_none(query.q);
    let category = blank_to_none(query.category);

    let mut ctx = base_context(&config, &user, &session);
    ctx.insert("q", &q.clone().unwrap_or_default());
    ctx.insert("selected_category", &category.clone().unwrap_or_default());
    ctx.insert("categories", &public_helpers::load_categories(&pool));
    ctx.insert("posts", &public_helpers::load_published_posts(&pool, q, category, None));

    render(&tera, "blog.html", &ctx)
}

async fn show_post(
    slug: web::Path<String>,
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> impl Responder {
    let mut ctx = base_context(&config, &user, &session);
    ctx.insert("csrf_token", token.get());

    let detail = public_helpers::load_post_detail(&pool, &slug);
    if detail.is_ok() && detail.data.is_none() {
        return render_not_found(&tera, &mut ctx, "Artikel tidak ditemukan.");
    }
    ctx.insert("detail", &detail);
    render(&tera, "post.html", &ctx)
}

async fn submit_comment(
    slug: web::Path<String>,
    user: CurrentUser,
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<CommentForm>>,
) -> HttpResponse {
    let slug = slug.into_inner();
    let post_url = format!("/blog/{}", slug);
    let form = form.into_inner().into_inner();

    // Sign-in is checked before the post is looked up.
    let profile = match user.profile() {
        Some(profile) => profile,
        None => {
            notify_error(&session, FormError::SignInRequired.to_string());
            return redirect("/login");
        }
    };

    let _guard = match app_state.submissions.begin(&profile.id, "comment") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&post_url);
        }
    };

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection for comment: {}", e);
            notify_error(&session, e.to_string());
            return redirect(&post_url);
        }
    };

    let post = match posts_db_operations::read_published_post_by_slug(&conn, &slug) {
        Ok(Some(post)) => post,
        Ok(None) => return HttpResponse::NotFound().body("Artikel tidak ditemukan."),
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&post_url);
        }
    };

    let comment = match validate_comment(Some(profile), &post.id, &form.content) {
        Ok(comment) => comment,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect(&post_url);
        }
    };

    match comments_db_operations::create_comment(&conn, &comment) {
        Ok(id) => {
            log::info!("Comment {} on post {} awaits moderation", id, post.id);
            notify_success(
                &session,
                "Komentar Anda telah dikirim dan sedang menunggu persetujuan admin.",
            );
        }
        Err(e) => {
            log::error!("Failed to save comment on post {}: {}", post.id, e);
            notify_error(&session, e.to_string());
        }
    }
    redirect(&post_url)
}

async fn show_gallery(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    query: web::Query<GalleryQuery>,
) -> impl Responder {
    let category = blank_to_none(query.into_inner().category);

    let mut ctx = base_context(&config, &user, &session);
    ctx.insert("selected_category", &category.clone().unwrap_or_default());
    ctx.insert("categories", &public_helpers::load_categories(&pool));
    ctx.insert("media", &public_helpers::load_media(&pool, category, None));

    render(&tera, "gallery.html", &ctx)
}

async fn show_programs(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = base_context(&config, &user, &session);
    ctx.insert("programs", &public_helpers::load_programs(&pool, None));
    render(&tera, "programs.html", &ctx)
}

async fn show_members(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = base_context(&config, &user, &session);
    ctx.insert("members", &public_helpers::load_members(&pool, None));
    render(&tera, "members.html", &ctx)
}
