use axum::{
    response::{IntoResponse, Response, Redirect},
    http::StatusCode,
    Json,
};
use serde_json::json;
use urlencoding;
use crate::errors::{AppError, ApiError};

// The IntoResponse trait implementation converts AppError into a well-formed HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Authentication errors redirect to login
            AppError::Auth(msg) => login_redirect(&msg),

            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                format!("Forbidden: {}", msg)
            ).into_response(),

            AppError::Session(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Session error: {}", e)
            ).into_response(),

            AppError::Render(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Template error: {}", e)
            ).into_response(),

            // The browser script shows `message` inline
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"message": msg}))
            ).into_response(),

            AppError::Api(err) => convert_api_error(err),
        }
    }
}

fn login_redirect(msg: &str) -> Response {
    Redirect::to(&format!("/?error={}", urlencoding::encode(msg))).into_response()
}

// Helper function to convert upstream errors to responses
fn convert_api_error(err: ApiError) -> Response {
    match err {
        ApiError::Auth => login_redirect("Incorrect login"),

        ApiError::Validation(msg) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            msg
        ).into_response(),

        ApiError::Network(e) => (
            StatusCode::GATEWAY_TIMEOUT,
            format!("Could not reach the OnRamp server: {}", e)
        ).into_response(),

        // Everything else is the upstream misbehaving
        _ => (
            StatusCode::BAD_GATEWAY,
            format!("Upstream error: {}", err)
        ).into_response(),
    }
}
