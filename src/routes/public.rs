use crate::config::Config;
use crate::helper::public_helpers;
use crate::helper::resource::Snapshot;
use crate::DbPool;
use actix_web::{web, HttpResponse, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct PostsQuery {
    q: Option<String>,
    category: Option<String>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct CategoryQuery {
    category: Option<String>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<u32>,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/is_server_active", web::get().to(is_server_active))
            .route("/posts", web::get().to(get_posts))
            .route("/posts/{slug}", web::get().to(get_post_by_slug))
            .route("/media", web::get().to(get_media))
            .route("/programs", web::get().to(get_programs))
            .route("/categories", web::get().to(get_categories))
            .route("/stats", web::get().to(get_stats)),
    );
}

/// Failed loads still answer with the snapshot, under a 500 status.
fn snapshot_response<T: Serialize>(snapshot: Snapshot<T>) -> HttpResponse {
    if snapshot.is_ok() {
        HttpResponse::Ok().json(snapshot)
    } else {
        HttpResponse::InternalServerError().json(snapshot)
    }
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

async fn get_posts(pool: web::Data<DbPool>, query: web::Query<PostsQuery>) -> impl Responder {
    let query = query.into_inner();
    snapshot_response(public_helpers::load_published_posts(
        &pool,
        query.q,
        query.category,
        query.limit,
    ))
}

async fn get_post_by_slug(slug: web::Path<String>, pool: web::Data<DbPool>) -> impl Responder {
    let snapshot = public_helpers::load_post_detail(&pool, &slug);
    if snapshot.is_ok() && snapshot.data.is_none() {
        return HttpResponse::NotFound().json(snapshot);
    }
    snapshot_response(snapshot)
}

async fn get_media(pool: web::Data<DbPool>, query: web::Query<CategoryQuery>) -> impl Responder {
    let query = query.into_inner();
    snapshot_response(public_helpers::load_media(&pool, query.category, query.limit))
}

async fn get_programs(pool: web::Data<DbPool>, query: web::Query<LimitQuery>) -> impl Responder {
    snapshot_response(public_helpers::load_programs(&pool, query.limit))
}

async fn get_categories(pool: web::Data<DbPool>) -> impl Responder {
    snapshot_response(public_helpers::load_categories(&pool))
}

async fn get_stats(pool: web::Data<DbPool>, config: web::Data<Config>) -> impl Responder {
    let today = Local::now().date_naive();
    snapshot_response(public_helpers::load_stats(&pool, config.program_start_date, today))
}
