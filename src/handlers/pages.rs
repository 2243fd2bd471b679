use askama::Template;
use axum::{
    extract::State,
    http::Uri,
    response::Html,
};
use tower_sessions::Session;
use crate::errors::AppResult;
use crate::session::{csrf_token, AuthSession};
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub(super) struct LoginTemplate<'a> {
    pub csrf_token: &'a str,
    pub csrf_header: &'a str,
    pub error: &'a str,
}

/// Page shell shared by every signed-in page.
#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    page: &'a str,
    username: &'a str,
    is_admin: bool,
    csrf_token: &'a str,
    csrf_header: &'a str,
}

/// `/admin/Users/` -> `admin-users`
fn page_name(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Serves the shell; the script fills it from `/view/...`.
pub async fn serve_page(
    State(state): State<AppState>,
    auth: AuthSession,
    session: Session,
    uri: Uri,
) -> AppResult<Html<String>> {
    let page = page_name(uri.path());
    tracing::info!("Serving page {} to {}", page, auth.username);

    let token = csrf_token(&session).await?;
    let html = PageTemplate {
        page: &page,
        username: &auth.username,
        is_admin: auth.is_admin,
        csrf_token: &token,
        csrf_header: &state.config.session.csrf_header,
    }
    .render()?;
    Ok(Html(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_follow_the_path() {
        assert_eq!(page_name("/admin/Users/"), "admin-users");
        assert_eq!(page_name("/public/Workspace/"), "public-workspace");
    }

    #[test]
    fn usernames_are_escaped_in_the_shell() {
        let html = PageTemplate {
            page: "public-dashboard",
            username: "<script>alert(1)</script>",
            is_admin: false,
            csrf_token: "t",
            csrf_header: "X-CSRFToken",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"data-admin="false""#));
    }

    #[test]
    fn login_error_is_escaped() {
        let html = LoginTemplate {
            csrf_token: "t",
            csrf_header: "X-CSRFToken",
            error: "\"><img src=x>",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<img src=x>"));
    }
}
