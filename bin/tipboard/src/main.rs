//! # Tipboard Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod settings;

use std::sync::Arc;

use actix_files::Files;
use actix_web::cookie::Key;
use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tb_api::middleware::{guest_name, session_middleware, standard_middleware};
use tb_api::{configure_routes, AppState};
use tb_core::TipService;

use settings::Settings;

// Feature-gated imports: This is the "Compiled-to-Order" magic
#[cfg(feature = "db-sqlite")]
use tb_db_sqlite::SqliteTipRepo;

#[cfg(feature = "auth-simple")]
use tb_auth_simple::SimpleAuthProvider;

/// Minimum secret length accepted by `Key::derive_from`.
const MIN_SECRET_LEN: usize = 32;

fn session_key(session: &settings::Session) -> anyhow::Result<Key> {
    match &session.secret {
        Some(secret) if secret.len() >= MIN_SECRET_LEN => Ok(Key::derive_from(secret.as_bytes())),
        Some(_) => anyhow::bail!("session.secret must be at least {MIN_SECRET_LEN} bytes"),
        None => {
            log::warn!("no session.secret configured; sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::new().context("invalid configuration")?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteTipRepo::new(&settings.database.url)
        .await
        .with_context(|| format!("failed to open {}", settings.database.url))?;

    // 2. Initialize Auth Implementation
    #[cfg(feature = "auth-simple")]
    let auth = SimpleAuthProvider::new();

    // 3. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let state = web::Data::new(AppState {
        service: TipService::new(Arc::new(repo), Arc::new(auth)),
        guest_names: settings.guest_names.clone(),
    });

    let key = session_key(&settings.session)?;
    let secure = settings.session.secure_cookie;
    let static_dir = settings.static_dir.clone();

    log::info!(
        "Tipboard starting on http://{}:{}",
        settings.server.host, settings.server.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(from_fn(guest_name))
            .wrap(session_middleware(key.clone(), secure))
            .wrap(standard_middleware())
            // Registered before the routes, whose scope redirects unknown paths.
            .service(Files::new("/static", static_dir.clone()))
            .configure(configure_routes)
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await?;

    Ok(())
}
