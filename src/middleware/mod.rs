use actix_session::{Session, SessionExt};
use actix_web::error::InternalError;
use actix_web::{dev, web, FromRequest, HttpRequest, HttpResponse};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::models::db_operations::profiles_db_operations;
use crate::models::Profile;
use crate::DbPool;

pub const SESSION_PROFILE_KEY: &str = "profile_id";

/// The signed-in visitor, if any. A session naming a profile that no longer
/// exists is purged and treated as anonymous.
#[derive(Serialize, Clone, Debug)]
pub struct CurrentUser(pub Option<Profile>);

impl CurrentUser {
    pub fn profile(&self) -> Option<&Profile> {
        self.0.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().map(Profile::is_admin).unwrap_or(false)
    }
}

fn resolve_profile(req: &HttpRequest, session: &Session) -> Option<Profile> {
    let profile_id = session.get::<String>(SESSION_PROFILE_KEY).unwrap_or(None)?;

    let pool = match req.app_data::<web::Data<DbPool>>() {
        Some(pool) => pool,
        None => {
            log::error!("Database pool missing from app data; treating request as anonymous.");
            return None;
        }
    };
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection to resolve session: {}", e);
            return None;
        }
    };

    match profiles_db_operations::read_profile(&conn, &profile_id) {
        Ok(Some(profile)) => Some(profile),
        Ok(None) => {
            log::warn!("Session referenced missing profile {}; purging session.", profile_id);
            session.purge();
            None
        }
        Err(e) => {
            log::error!("Failed to load profile {} for session: {}", profile_id, e);
            None
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        ready(Ok(CurrentUser(resolve_profile(req, &session))))
    }
}

/// A signed-in profile with the admin role. Anonymous visitors are sent to
/// the login page; signed-in non-admins get 403.
#[derive(Serialize, Clone, Debug)]
pub struct AdminUser(pub Profile);

impl FromRequest for AdminUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        let result = match resolve_profile(req, &session) {
            Some(profile) if profile.is_admin() => Ok(AdminUser(profile)),
            Some(profile) => {
                log::warn!("Profile {} was denied access to {}", profile.id, req.path());
                let response = HttpResponse::Forbidden()
                    .content_type("text/html; charset=utf-8")
                    .body("<h1>Akses ditolak</h1><p>Halaman ini hanya untuk admin.</p><a href=\"/\">Kembali</a>");
                Err(InternalError::from_response("Akses ditolak", response).into())
            }
            None => {
                let response = HttpResponse::Found().append_header(("location", "/login")).finish();
                Err(InternalError::from_response("Login required", response).into())
            }
        };
        ready(result)
    }
}
