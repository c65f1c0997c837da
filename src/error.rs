//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! It centralizes error management, providing a consistent way to handle and represent
//! the error conditions that can occur, from database issues to rejected credentials.
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can return it
//! directly; every error response uses the shared [`ApiResponse`] envelope with only
//! the `error` field populated. Server-side failures never expose their detail to the
//! client: the detail is logged and the body carries a generic message.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use validator::ValidationErrors;

use crate::auth::token::TokenError;
use crate::response::ApiResponse;

/// Message returned to clients for any 500-class failure.
pub const GENERIC_SERVER_ERROR: &str = "An unexpected error occurred";

/// Represents all possible errors that can occur within the application.
///
/// Each variant corresponds to a specific type of error, carrying a message
/// detailing the issue. These errors are then converted into HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing input (HTTP 400).
    Validation(String),
    /// Missing, invalid or expired credentials (HTTP 401).
    Unauthenticated(String),
    /// The resource does not exist or is not owned by the caller (HTTP 404).
    NotFound(String),
    /// A unique key is already taken (HTTP 409).
    Conflict(String),
    /// The client exceeded the request budget for the current window (HTTP 429).
    RateLimited(String),
    /// The store was unavailable or a write failed (HTTP 500).
    Persistence(String),
    /// Anything unexpected (HTTP 500).
    Internal(String),
}

/// Convenience alias used by handlers and services.
pub type AppResult<T> = Result<T, AppError>;

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::RateLimited(msg) => write!(f, "Rate Limited: {}", msg),
            AppError::Persistence(msg) => write!(f, "Persistence Error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Validation(msg)
            | AppError::Unauthenticated(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::RateLimited(msg) => msg.clone(),
            AppError::Persistence(detail) | AppError::Internal(detail) => {
                log::error!("{}: {}", self.status_code(), detail);
                GENERIC_SERVER_ERROR.to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(message))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound`, unique-key violations become `Conflict`,
/// and everything else is a `Persistence` failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Resource already exists".into())
            }
            _ => AppError::Persistence(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(format!("Invalid input: {}", error))
    }
}

/// Token failures collapse to a single unauthenticated response at the HTTP
/// boundary; only store failures surface as server errors.
impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        match error {
            TokenError::Invalid => AppError::Unauthenticated("Invalid refresh token".into()),
            TokenError::Expired => AppError::Unauthenticated("Refresh token expired".into()),
            TokenError::Signing(detail) => AppError::Internal(detail),
            TokenError::Persistence(err) => AppError::Persistence(err.to_string()),
        }
    }
}
