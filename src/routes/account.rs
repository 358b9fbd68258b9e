use crate::config::Config;
use crate::helper::auth_helpers::{self, MSG_REGISTERED, MSG_REGISTERED_CONFIRM};
use crate::helper::form_helpers::validate_registration;
use crate::helper::media_helpers;
use crate::helper::storage_helpers::{read_upload_form, SharedObjectStore, UploadPolicy};
use crate::middleware::{CurrentUser, SESSION_PROFILE_KEY};
use crate::routes::{base_context, notify_error, notify_success, redirect, render};
use crate::{AppState, DbPool};
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use tera::Tera;
use url::form_urlencoded;

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    email: String,
    password: String,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Deserialize)]
struct RegisterForm {
    csrf_token: CsrfToken,
    name: String,
    email: String,
    password: String,
}

impl CsrfGuarded for RegisterForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Deserialize)]
pub struct LoginQuery {
    message: Option<String>,
}

pub fn config_account(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_login_form))
        .route("/login", web::post().to(handle_login))
        .route("/register", web::get().to(show_register_form))
        .route("/register", web::post().to(handle_register))
        .route("/logout", web::get().to(handle_logout))
        .route("/profile", web::get().to(show_profile))
        .route("/profile", web::post().to(update_profile));
}

async fn show_login_form(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    config: web::Data<Config>,
    token: CsrfToken,
    query: web::Query<LoginQuery>,
) -> impl Responder {
    if let Some(profile) = user.profile() {
        return redirect(auth_helpers::landing_path(profile));
    }

    let mut ctx = base_context(&config, &user, &session);
    ctx.insert("csrf_token", token.get());
    if let Some(message) = query.into_inner().message.filter(|m| !m.trim().is_empty()) {
        ctx.insert("message", &message);
    }
    render(&tera, "account/login.html", &ctx)
}

async fn handle_login(
    session: Session,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<LoginForm>>,
) -> HttpResponse {
    let login = form.into_inner().into_inner();

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection for login: {}", e);
            notify_error(&session, e.to_string());
            return redirect("/login");
        }
    };

    match auth_helpers::sign_in(&conn, &app_state.auth_events, &login.email, &login.password) {
        Ok(profile) => {
            session.renew();
            if let Err(e) = session.insert(SESSION_PROFILE_KEY, &profile.id) {
                log::error!("Failed to store profile id in session: {}", e);
                notify_error(&session, "Sesi tidak dapat dibuat. Silakan coba lagi.");
                return redirect("/login");
            }
            redirect(auth_helpers::landing_path(&profile))
        }
        Err(e) => {
            log::info!("Failed sign-in for {}: {}", login.email.trim(), e);
            notify_error(&session, e.to_string());
            redirect("/login")
        }
    }
}

async fn show_register_form(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    config: web::Data<Config>,
    token: CsrfToken,
) -> impl Responder {
    if user.profile().is_some() {
        return redirect("/");
    }
    let mut ctx = base_context(&config, &user, &session);
    ctx.insert("csrf_token", token.get());
    render(&tera, "account/register.html", &ctx)
}

async fn handle_register(
    session: Session,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<RegisterForm>>,
) -> HttpResponse {
    let form = form.into_inner().into_inner();

    let registration = match validate_registration(&form.name, &form.email, &form.password) {
        Ok(registration) => registration,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/register");
        }
    };

    let _guard = match app_state.submissions.begin(&registration.email.to_lowercase(), "register") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/register");
        }
    };

    let mut conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection for registration: {}", e);
            notify_error(&session, e.to_string());
            return redirect("/register");
        }
    };

    match auth_helpers::register(&mut conn, &registration, config.require_email_confirmation) {
        Ok(_) => {
            let message = if config.require_email_confirmation {
                MSG_REGISTERED_CONFIRM
            } else {
                MSG_REGISTERED
            };
            let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
            redirect(format!("/login?message={}", encoded))
        }
        Err(e) => {
            notify_error(&session, e.to_string());
            redirect("/register")
        }
    }
}

async fn handle_logout(user: CurrentUser, session: Session, app_state: web::Data<AppState>) -> impl Responder {
    auth_helpers::sign_out(&app_state.auth_events, user.0.map(|p| p.id));
    session.purge();
    redirect("/")
}

async fn show_profile(
    user: CurrentUser,
    session: Session,
    tera: web::Data<Tera>,
    config: web::Data<Config>,
) -> impl Responder {
    if user.profile().is_none() {
        return redirect("/login");
    }
    let ctx = base_context(&config, &user, &session);
    render(&tera, "account/profile.html", &ctx)
}

async fn update_profile(
    user: CurrentUser,
    session: Session,
    pool: web::Data<DbPool>,
    store: web::Data<SharedObjectStore>,
    app_state: web::Data<AppState>,
    payload: Multipart,
) -> HttpResponse {
    let Some(profile) = user.profile() else {
        return redirect("/login");
    };

    let _guard = match app_state.submissions.begin(&profile.id, "profile") {
        Ok(guard) => guard,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/profile");
        }
    };

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection for profile update: {}", e);
            notify_error(&session, e.to_string());
            return redirect("/profile");
        }
    };

    let policy = UploadPolicy::from_settings(&conn);
    let upload = match read_upload_form(payload, "avatar", &policy).await {
        Ok(upload) => upload,
        Err(e) => {
            notify_error(&session, e.to_string());
            return redirect("/profile");
        }
    };

    let name = upload.field("name").unwrap_or_default().to_string();
    let bio = upload.field("bio").map(str::to_string);
    let result = media_helpers::update_profile_with_avatar(
        &conn,
        store.get_ref().clone(),
        &profile.id,
        &name,
        bio.as_deref(),
        upload.file,
    )
    .await;

    match result {
        Ok(()) => notify_success(&session, "Profil berhasil diperbarui."),
        Err(e) => {
            log::error!("Profile update for {} failed: {}", profile.id, e);
            notify_error(&session, e.to_string());
        }
    }
    redirect("/profile")
}
