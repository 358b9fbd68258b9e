use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{cookie::Key, web, App, HttpServer};
use clap::Parser;
use kkn_site::{
    build_pool,
    config::Config,
    helper::auth_events::{self, AuthEvents},
    helper::storage_helpers::{LocalObjectStore, SharedObjectStore},
    routes, AppState,
};
use r2d2_sqlite::SqliteConnectionManager;
use std::convert::TryFrom;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tera::Tera;

#[derive(Parser, Debug)]
#[command(name = "kkn_server", author, version, about = "Starts the KKN site web server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    // The JSON API is read-only.
    cors.allowed_methods(vec!["GET"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let tera = Tera::new("templates/**/*.html").expect("FATAL: Tera initialization failed");

    fs::create_dir_all(&config.media_path)?;
    let db_path = config.site_db_path();
    if !db_path.exists() {
        panic!(
            "FATAL: site.db not found at '{}'. Run 'cargo run --bin setup_cli -- --env-file <path> db setup'",
            db_path.display()
        );
    }

    let pool = build_pool(SqliteConnectionManager::file(&db_path))
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    let store: SharedObjectStore = Arc::new(LocalObjectStore::new(&config.media_path, "/media"));
    let store_data = web::Data::new(store);

    // Subscriptions live until the server stops.
    let auth_bus = AuthEvents::new();
    let _sign_in_recorder = auth_events::subscribe_sign_in_recorder(&auth_bus, pool.clone());
    let _audit_log = auth_events::subscribe_audit_log(&auth_bus);
    let app_state = web::Data::new(AppState::new(Arc::clone(&auth_bus)));

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .expect("FATAL: SESSION_SECRET_KEY in .env is not a valid hex string.");
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .expect("FATAL: The decoded SESSION_SECRET_KEY is not long enough (minimum 64 bytes required).");

    let server_address = config.server_address();
    log::info!("Server starting at http://{}", server_address);

    let config_data = web::Data::new(config.clone());
    let tera_data = web::Data::new(tera);
    let pool_data = web::Data::new(pool);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
            .cookie_secure(config.use_secure_cookies)
            .cookie_http_only(true)
            .cookie_same_site(actix_web::cookie::SameSite::Lax)
            .build();

        App::new()
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .app_data(config_data.clone())
            .app_data(tera_data.clone())
            .app_data(pool_data.clone())
            .app_data(store_data.clone())
            .app_data(app_state.clone())
            .configure(routes::public::config_api)
            .service(actix_files::Files::new("/media", &config.media_path))
            .service(actix_files::Files::new("/static", "./static"))
            .service(
                web::scope("")
                    .wrap(routes::csrf_middleware())
                    .wrap(session_mw)
                    .configure(routes::config_pages),
            )
    })
    .bind(server_address)?
    .run()
    .await
}
