//! Per-browser session state: who is logged in and how to talk to the
//! OnRamp API on their behalf.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;
use crate::errors::{AppError, AppResult};

const AUTH_KEY: &str = "onramp_auth";
const CSRF_KEY: &str = "csrf_token";

/// Identity and upstream credentials of a logged-in user.
///
/// Passed explicitly into every upstream call; handlers get it through the
/// extractor below rather than reading the session themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub username: String,
    pub user_id: Option<i64>,
    pub is_admin: bool,
    /// Generation-1 API key, sent as `?apikey=`.
    pub api_key: Option<String>,
    /// Upstream session cookie value.
    pub upstream_session: Option<String>,
    /// Upstream CSRF cookie value, echoed in the CSRF header on unsafe requests.
    pub upstream_csrf: Option<String>,
    /// Keys this session's page state in the page store.
    pub view_key: Uuid,
}

impl AuthSession {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id: None,
            is_admin: false,
            api_key: None,
            upstream_session: None,
            upstream_csrf: None,
            view_key: Uuid::new_v4(),
        }
    }

    pub fn landing_page(&self) -> &'static str {
        if self.is_admin {
            "/admin/Dashboard/"
        } else {
            "/public/Dashboard/"
        }
    }

    pub async fn load(session: &Session) -> AppResult<Option<Self>> {
        Ok(session.get::<Self>(AUTH_KEY).await?)
    }

    pub async fn store(&self, session: &Session) -> AppResult<()> {
        session.insert(AUTH_KEY, self).await?;
        Ok(())
    }

    pub async fn clear(session: &Session) -> AppResult<Option<Self>> {
        Ok(session.remove::<Self>(AUTH_KEY).await?)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Auth(msg.to_string()))?;

        Self::load(&session)
            .await?
            .ok_or_else(|| AppError::Auth("Not authenticated".into()))
    }
}

/// Returns the session's CSRF token, minting one on first use.
pub async fn csrf_token(session: &Session) -> AppResult<String> {
    if let Some(token) = session.get::<String>(CSRF_KEY).await? {
        return Ok(token);
    }
    let token = Uuid::new_v4().simple().to_string();
    session.insert(CSRF_KEY, &token).await?;
    tracing::debug!("Minted CSRF token for session");
    Ok(token)
}

/// The stored token, if the session has one. Never mints.
pub async fn existing_csrf_token(session: &Session) -> AppResult<Option<String>> {
    Ok(session.get::<String>(CSRF_KEY).await?)
}
