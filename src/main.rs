use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpResponse, HttpServer, cookie::Key, middleware, web};

use caseflow::auth::{password, rate_limit::RateLimiter};
use caseflow::config::AppConfig;
use caseflow::errors::AppError;
use caseflow::state::AppState;
use caseflow::{db, handlers};

fn startup_error(context: &str, err: AppError) -> std::io::Error {
    log::error!("{context}: {err}");
    std::io::Error::other(format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    // Initialize database
    let pool = db::init_pool(&config)
        .await
        .map_err(|e| startup_error("Database connection failed", e))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| startup_error("Migrations failed", e))?;
    db::seed_catalog(&pool)
        .await
        .map_err(|e| startup_error("Seeding step catalog failed", e))?;
    let admin_hash = password::hash_password(&config.admin_password)
        .map_err(|e| startup_error("Failed to hash admin password", e))?;
    db::seed_admin(&pool, &admin_hash)
        .await
        .map_err(|e| startup_error("Seeding admin user failed", e))?;

    // Session encryption key; config has already warned when it is missing
    let secret_key = match &config.session_key {
        Some(key) => Key::from(key.as_bytes()),
        None => Key::generate(),
    };

    let state = AppState::postgres(pool, config.bulk.clone());
    let shutdown = state.shutdown.clone();
    let limiter = RateLimiter::default();

    log::info!("Starting server at http://{}", config.bind_addr);

    let server = HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(limiter.clone()))
            .service(web::scope("/api/v1").configure(handlers::api_v1::configure))
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found" }))
            }))
    })
    .disable_signals()
    .bind(&config.bind_addr)?
    .run();

    // On Ctrl-C, stop bulk changes from starting new items, then drain
    let handle = server.handle();
    actix_web::rt::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested");
            shutdown.cancel();
            handle.stop(true).await;
        }
    });

    server.await
}
