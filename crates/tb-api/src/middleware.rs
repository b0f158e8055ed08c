//! tipboard/crates/tb-api/src/middleware.rs Middleware
//!
//! Custom middleware for sessions, guest identity and logging.

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::body::MessageBody;
use actix_web::cookie::{time::Duration, Cookie, Key, SameSite};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::{Logger, Next};
use actix_web::{web, HttpMessage};

use crate::handlers::AppState;

/// Cookie remembering an anonymous visitor's display name.
pub const GUEST_COOKIE: &str = "default_name";
/// Guests are re-named shortly after they stop browsing.
pub const GUEST_COOKIE_MAX_AGE_SECS: i64 = 42;
pub const SESSION_COOKIE: &str = "session";

/// Display name assigned to the current anonymous visitor.
#[derive(Debug, Clone)]
pub struct GuestName(pub String);

// Returns a standard set of middleware for the Tipboard site.
pub fn standard_middleware() -> Logger {
    // We use the 'default' logger which outputs:
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

/// Signed + encrypted cookie sessions; no server-side store.
pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_path("/".to_string())
        .cookie_secure(secure)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .build()
}

/// Attaches a `GuestName` to every request.
///
/// The name comes from the `default_name` cookie when present; otherwise one
/// is picked by the `AuthProvider` and the cookie is set on the response.
pub async fn guest_name(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if let Some(cookie) = req.cookie(GUEST_COOKIE) {
        req.extensions_mut().insert(GuestName(cookie.value().to_string()));
        return next.call(req).await;
    }

    let name = match req.app_data::<web::Data<AppState>>() {
        Some(state) => state.service.auth().guest_name(&state.guest_names),
        None => "Guest".to_string(),
    };
    req.extensions_mut().insert(GuestName(name.clone()));

    let mut res = next.call(req).await?;
    let cookie = Cookie::build(GUEST_COOKIE, name)
        .path("/")
        .max_age(Duration::seconds(GUEST_COOKIE_MAX_AGE_SECS))
        .finish();
    res.response_mut().add_cookie(&cookie)?;
    Ok(res)
}
