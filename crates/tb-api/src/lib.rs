//! # tb-api
//!
//! The web routing and orchestration layer for Tipboard.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;

use actix_web::web;

pub use error::{ApiError, ApiResult};
pub use handlers::AppState;

/// Configures the routes for the tip board.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the site under a different prefix if needed.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // The tip list and the posting form
            .route("/", web::get().to(handlers::home))
            .route("/", web::post().to(handlers::create_tip))
            // Accounts
            .route("/login", web::get().to(handlers::login_page))
            .route("/login", web::post().to(handlers::login))
            .route("/logout", web::get().to(handlers::logout))
            .route("/registration", web::get().to(handlers::registration_page))
            .route("/registration", web::post().to(handlers::register))
            // Votes and moderation
            .route("/upvote/{tip_id}/", web::post().to(handlers::upvote))
            .route("/downvote/{tip_id}/", web::post().to(handlers::downvote))
            .route("/delete/{tip_id}/", web::post().to(handlers::delete_tip))
            .default_service(web::to(handlers::redirect_home)),
    );
}
