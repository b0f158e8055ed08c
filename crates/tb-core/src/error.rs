//! # AppError
//!
//! Centralized error handling for the Tipboard ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all tb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Tip, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty tip, passwords do not match)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Authentication failure (no session, invalid credentials)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the reputation gate or ownership check refused
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Infrastructure failure (e.g., DB down, hashing failure)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Returned by `TipRepo::create_user` when the username is already stored.
///
/// Repositories wrap it in `anyhow::Error`; the service downcasts it into
/// `AppError::Conflict`.
#[derive(Error, Debug)]
#[error("username {0} already exists")]
pub struct DuplicateUsername(pub String);

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

/// A specialized Result type for Tipboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
