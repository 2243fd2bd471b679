use axum::{
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    extract::Request,
    body::Body,
    http::StatusCode,
};
use tower_sessions::Session;
use crate::errors::AppError;
use crate::session::AuthSession;

fn is_public(path: &str) -> bool {
    path == "/" || path == "/login" || path.starts_with("/static/")
}

fn is_admin_only(path: &str) -> bool {
    path.starts_with("/admin/") || path.starts_with("/view/admin/")
}

pub async fn require_auth(
    session: Session,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if is_public(&path) {
        return next.run(req).await;
    }

    let auth = match AuthSession::load(&session).await {
        Ok(Some(auth)) => auth,
        Ok(None) if path.starts_with("/view/") => {
            return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
        }
        Ok(None) => return Redirect::to("/").into_response(),
        Err(e) => return e.into_response(),
    };

    if is_admin_only(&path) && !auth.is_admin {
        tracing::warn!("User {} denied access to {}", auth.username, path);
        return AppError::Forbidden("administrators only".into()).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_classes() {
        assert!(is_public("/"));
        assert!(is_public("/static/onramp.js"));
        assert!(!is_public("/public/Dashboard/"));
        assert!(is_admin_only("/admin/Users/"));
        assert!(is_admin_only("/view/admin/users"));
        assert!(!is_admin_only("/view/workspace"));
    }
}
