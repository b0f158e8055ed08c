//! HTTP mapping for `AppError`.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use log::error;
use tb_core::AppError;
use thiserror::Error;

/// Wraps `AppError` so it can be returned from actix handlers.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub AppError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            // Login-required pages send guests to the login form.
            AppError::Unauthorized(_) => StatusCode::SEE_OTHER,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match &self.0 {
            AppError::Unauthorized(_) => builder.insert_header((header::LOCATION, "/login")).finish(),
            AppError::Forbidden(msg) | AppError::ValidationError(msg) | AppError::Conflict(msg) => {
                builder.body(msg.clone())
            }
            AppError::NotFound(..) => builder.body(self.0.to_string()),
            AppError::Internal(detail) => {
                // Do not leak implementation details to clients.
                error!("request failed: {detail}");
                builder.body("Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_redirects_to_login() {
        let resp = ApiError(AppError::Unauthorized("login required".into())).error_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[test]
    fn forbidden_and_not_found_stay_distinct() {
        let forbidden = ApiError(AppError::Forbidden("nope".into()));
        let missing = ApiError(AppError::NotFound("Tip".into(), "1".into()));
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_are_redacted() {
        let resp = ApiError(AppError::Internal("db password wrong".into())).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
