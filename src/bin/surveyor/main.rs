use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use rand::{distributions::Alphanumeric, Rng};
use surveyor::app_config;
use surveyor::middleware::ClientCtx;
use surveyor::token::AccountTokens;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    app_config::init();

    let config = app_config::get_config();
    let database_url = std::env::var("DATABASE_URL").unwrap_or(config.database.url.clone());
    let db = surveyor::db::connect(&database_url, config.database.max_connections)
        .await
        .map_err(to_io_error)?;

    if config.database.create_schema {
        surveyor::db::create_schema(&db).await.map_err(to_io_error)?;
    }

    let secret = match std::env::var("SECRET_KEY") {
        Ok(key) if key.len() >= 64 => key,
        other => {
            let random_string: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(128)
                .map(char::from)
                .collect();
            log::warn!("SECRET_KEY was invalid. Reason: {:?}\r\nThis means session cookies and emailed links will stop working every time the application is restarted. A secret key must be at least 64 bytes to be accepted.\r\n\r\nNeed a key? How about:\r\n{}", other.map(|k| format!("only {} bytes", k.len())), random_string);
            random_string
        }
    };
    let secret_key = Key::from(secret.as_bytes());
    let tokens = AccountTokens::new(
        secret.as_bytes(),
        chrono::Duration::hours(config.security.token_expiry_hours as i64),
    );

    // Spawn expired session cleanup task
    let cleanup_db = db.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match surveyor::session::expire_sessions(&cleanup_db).await {
                Ok(count) => log::debug!("Expired {} sessions", count),
                Err(e) => log::error!("Session cleanup failed: {}", e),
            }
        }
    });

    let secure_cookies = config.server.secure_cookies;
    let bind = config.server.bind.clone();
    log::info!("Listening on {}", bind);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(tokens.clone()))
            // Security headers - applied to all responses
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("X-XSS-Protection", "0")) // Disable legacy XSS filter
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
                    .add((
                        "Permissions-Policy",
                        "geolocation=(), microphone=(), camera=()",
                    )),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(secure_cookies)
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(surveyor::web::configure)
    })
    .bind(bind)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // A missing .env is fine; configuration may come from the environment.
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

fn to_io_error(e: sea_orm::DbErr) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}
