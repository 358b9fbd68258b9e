use crate::config::Config;
use crate::middleware::CurrentUser;
use crate::models::Notification;
use crate::DbPool;
use actix_csrf::extractor::{CsrfGuarded, CsrfToken};
use actix_csrf::CsrfMiddleware;
use actix_session::Session;
use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use rand::prelude::StdRng;
use serde::Deserialize;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use tera::{Context, Tera};

pub type DbConn = PooledConnection<SqliteConnectionManager>;

pub mod account;
pub mod admin;
pub mod public;
pub mod site;

/// Public pages that render a form and therefore hand out a CSRF token.
pub const SITE_FORM_PAGES: &[&str] = &["/login", "/register", "/blog/{slug}"];

/// Issues a CSRF cookie on every page that renders a form.
pub fn csrf_middleware() -> CsrfMiddleware<StdRng> {
    SITE_FORM_PAGES
        .iter()
        .chain(admin::ADMIN_FORM_PAGES.iter())
        .fold(CsrfMiddleware::<StdRng>::new(), |csrf, page| csrf.set_cookie(Method::GET, *page))
}

/// Registers the HTML pages: admin panel, account pages and the public site.
/// The caller wraps them in the session and CSRF middleware.
pub fn config_pages(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/admin").configure(admin::config_admin))
        .configure(account::config_account)
        .configure(site::config_site);
}

/// Body of forms that carry nothing but the CSRF token (delete, approve...).
#[derive(Deserialize)]
pub struct ActionForm {
    pub csrf_token: CsrfToken,
}

impl CsrfGuarded for ActionForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

/// A typed form body guarded by the CSRF token submitted next to it.
#[derive(Deserialize)]
pub struct CsrfForm<T> {
    pub csrf_token: CsrfToken,
    #[serde(flatten)]
    pub fields: T,
}

impl<T> CsrfGuarded for CsrfForm<T> {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

/// Checks out a pooled connection, or flashes the failure and redirects.
pub fn conn_or_redirect(pool: &DbPool, session: &Session, location: &str) -> Result<DbConn, HttpResponse> {
    pool.get().map_err(|e| {
        log::error!("Could not get DB connection from pool: {}", e);
        notify_error(session, e.to_string());
        redirect(location)
    })
}

pub fn set_notification(session: &Session, notification: Notification) {
    if let Err(e) = session.insert("notification", &notification) {
        log::error!("Failed to store notification in session: {}", e);
    }
}

pub fn notify_success(session: &Session, message: impl Into<String>) {
    set_notification(session, Notification::success(message));
}

pub fn notify_error(session: &Session, message: impl Into<String>) {
    set_notification(session, Notification::error(message));
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("location", location.as_ref()))
        .finish()
}

/// Context shared by every page: site identity, current user and any
/// pending flash notification (consumed here).
pub fn base_context(config: &Config, user: &CurrentUser, session: &Session) -> Context {
    let mut ctx = Context::new();
    ctx.insert("site", &config.site);
    ctx.insert("current_user", &user.0);
    ctx.insert("is_admin", &user.is_admin());

    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }
    ctx
}

pub fn render(tera: &Tera, template: &str, ctx: &Context) -> HttpResponse {
    match tera.render(template, ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error in {}: {:?}", template, err);
            HttpResponse::InternalServerError().body("Error rendering page.")
        }
    }
}

pub fn render_not_found(tera: &Tera, ctx: &mut Context, message: &str) -> HttpResponse {
    ctx.insert("message", message);
    match tera.render("not_found.html", ctx) {
        Ok(rendered) => HttpResponse::NotFound().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error in not_found.html: {:?}", err);
            HttpResponse::NotFound().body(message.to_string())
        }
    }
}
