//! Session helpers to keep handlers free of framework-specific logic.
//!
//! The cookie only carries the user id; the user record (and with it the
//! reputation) is reloaded on every request.

use actix_session::Session;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use log::warn;
use tb_core::AppError;
use uuid::Uuid;

use crate::error::ApiError;

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Starts a fresh session for `user_id`, discarding any previous key.
    pub fn log_in(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, user_id.to_string())
            .map_err(|e| AppError::Internal(format!("failed to persist session: {e}")).into())
    }

    pub fn log_out(&self) {
        self.0.purge();
    }

    /// The logged-in user's id, if the cookie carries a valid one.
    pub fn user_id(&self) -> Option<Uuid> {
        let raw = match self.0.get::<String>(USER_ID_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("unreadable session: {e}");
                return None;
            }
        };
        match Uuid::parse_str(&raw) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("invalid user id in session cookie: {e}");
                None
            }
        }
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
