use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use crate::errors::{ApiError, AppError, AppResult};
use crate::models::LoginForm;
use crate::session::{csrf_token, AuthSession};
use crate::AppState;
use super::pages::LoginTemplate;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    error: String,
}

pub async fn serve_login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> AppResult<Response> {
    if let Some(auth) = AuthSession::load(&session).await? {
        return Ok(Redirect::to(auth.landing_page()).into_response());
    }

    let token = csrf_token(&session).await?;
    let html = LoginTemplate {
        csrf_token: &token,
        csrf_header: &state.config.session.csrf_header,
        error: &query.error,
    }
    .render()?;
    Ok(Html(html).into_response())
}

#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Json(login_form): Json<LoginForm>,
) -> AppResult<Response> {
    if login_form.username.trim().is_empty() || login_form.password.is_empty() {
        return Err(AppError::BadRequest("Enter a username and password".into()));
    }

    match state.client.login(&login_form).await {
        Ok(auth) => {
            // A fresh login replaces whatever the browser was signed in as
            if let Some(previous) = AuthSession::load(&session).await? {
                state.pages.evict(previous.view_key).await;
            }
            session.cycle_id().await?;
            auth.store(&session).await?;
            Ok(Json(json!({"url": auth.landing_page()})).into_response())
        }
        Err(err @ (ApiError::Auth | ApiError::Validation(_))) => {
            tracing::info!("Login rejected for user {}: {}", login_form.username, err);
            Ok((StatusCode::UNAUTHORIZED, Json(json!({"message": err.to_string()}))).into_response())
        }
        Err(err) => {
            tracing::error!("Login for {} failed: {}", login_form.username, err);
            Err(err.into())
        }
    }
}

#[axum::debug_handler]
pub async fn handle_logout(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    if let Some(auth) = AuthSession::clear(&session).await? {
        if let Err(e) = state.client.logout(&auth).await {
            tracing::warn!("Upstream logout for {} failed: {}", auth.username, e);
        }
        state.pages.evict(auth.view_key).await;
        tracing::info!("User {} logged out", auth.username);
    }
    Ok(Redirect::to("/").into_response())
}
