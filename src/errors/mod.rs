// Error types for the front end: AppError for request handling, ApiError for upstream calls.
use thiserror::Error;

pub mod api;
pub mod response;

pub use api::{ApiError, ApiResult};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // tower-sessions store failures
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Render(#[from] askama::Error),

    #[error("Upstream error: {0}")]
    Api(#[from] ApiError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
