use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::helper::auth_events::AuthEvents;
use crate::helper::form_helpers::InFlightSubmissions;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Process-wide state shared by every worker.
pub struct AppState {
    pub auth_events: Arc<AuthEvents>,
    pub submissions: InFlightSubmissions,
}

impl AppState {
    pub fn new(auth_events: Arc<AuthEvents>) -> Self {
        AppState {
            auth_events,
            submissions: InFlightSubmissions::default(),
        }
    }
}

/// Builds a connection pool for the site database with foreign keys enforced
/// on every pooled connection.
pub fn build_pool(manager: SqliteConnectionManager) -> Result<DbPool, r2d2::Error> {
    let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().build(manager)
}

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
