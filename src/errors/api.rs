use thiserror::Error;

/// Failure taxonomy of a call to the OnRamp API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 401 from any endpoint.
    #[error("Incorrect login")]
    Auth,

    /// Any other non-200 status.
    #[error("Something went wrong when connecting to the server. Status code: {0}")]
    Server(u16),

    /// A 200 response whose body carries `status: -1`, `status: false` or `success: false`.
    #[error("{0}")]
    Validation(String),

    /// The request never completed (connection refused, timeout, ...).
    #[error("Could not reach the server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// JSON was valid but not in a shape we understand.
    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
