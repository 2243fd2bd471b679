use axum::{
    middleware::Next,
    response::{IntoResponse, Response},
    extract::{Request, State},
    body::Body,
    http::Method,
};
use tower_sessions::Session;
use crate::errors::AppError;
use crate::session::existing_csrf_token;
use crate::AppState;

/// Unsafe methods must echo the session's CSRF token in the configured header.
pub async fn require_csrf(
    State(state): State<AppState>,
    session: Session,
    req: Request<Body>,
    next: Next,
) -> Response {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(req).await;
    }

    let expected = match existing_csrf_token(&session).await {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };
    let supplied = req
        .headers()
        .get(state.config.session.csrf_header.as_str())
        .and_then(|value| value.to_str().ok());

    match (expected.as_deref(), supplied) {
        (Some(expected), Some(supplied)) if expected == supplied => next.run(req).await,
        _ => {
            tracing::warn!("Rejected {} {} without a valid CSRF token", req.method(), req.uri().path());
            AppError::Forbidden("missing or invalid CSRF token".into()).into_response()
        }
    }
}
