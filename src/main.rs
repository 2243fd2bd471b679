mod models;
mod handlers;
mod services;
mod middleware;
mod views;
mod session;
mod config;
mod errors;

use axum::{
    routing::{get, post},
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::{
    services::ServeDir,
    limit::RequestBodyLimitLayer,
};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tower_sessions::cookie::{time, SameSite};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use crate::{
    config::Config,
    errors::ApiResult,
    services::{OnRampClient, PageStore},
    views::FamilyTable,
};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub client: OnRampClient,
    pub pages: PageStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> ApiResult<Self> {
        let client = OnRampClient::new(&config.upstream)?;
        let pages = PageStore::new(FamilyTable::new(config.families.clone()));
        Ok(Self {
            client,
            pages,
            config: Arc::new(config),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.session.secure)
        .with_same_site(SameSite::Lax)
        .with_name(config.session.cookie_name.clone())
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            config.session.idle_timeout_secs as i64,
        )));

    let pages = [
        "/public/Dashboard/",
        "/public/Workspace/",
        "/public/Jobs/",
        "/admin/Dashboard/",
        "/admin/Users/",
        "/admin/Jobs/",
        "/admin/Workspaces/",
        "/admin/PCEs/",
        "/admin/Modules/",
    ];
    let router = pages
        .iter()
        .fold(Router::new(), |router, path| router.route(path, get(handlers::serve_page)));

    router
        // Auth routes
        .route("/", get(handlers::serve_login_page))
        .route("/login", post(handlers::handle_login))
        .route("/logout/", get(handlers::handle_logout))

        // Signed-in user views
        .route("/view/dashboard", get(handlers::user_dashboard))
        .route("/view/jobs", get(handlers::my_jobs))
        .route("/view/jobs/:job_id", get(handlers::job_detail))
        .route("/view/workspace", get(handlers::workspace::view))
        .route("/view/workspace/open", post(handlers::workspace::open))
        .route("/view/workspace/pce", post(handlers::workspace::select_pce))
        .route("/view/workspace/module", post(handlers::workspace::select_module))
        .route("/view/workspace/clear_pce", post(handlers::workspace::clear_pce))
        .route("/view/workspace/clear_module", post(handlers::workspace::clear_module))
        .route("/view/workspace/field", post(handlers::workspace::edit_field))
        .route("/view/workspace/launch", post(handlers::workspace::launch))
        .route("/view/workspace/dismiss", post(handlers::workspace::dismiss_notice))
        .route("/view/workspace/dismiss_confirmation", post(handlers::workspace::dismiss_confirmation))

        // Admin views
        .route("/view/admin/dashboard", get(handlers::admin_dashboard))
        .route("/view/admin/users", get(handlers::users::view))
        .route("/view/admin/users/open", post(handlers::users::open))
        .route("/view/admin/users/select", post(handlers::users::select))
        .route("/view/admin/users/add", post(handlers::users::add))
        .route("/view/admin/users/edit", post(handlers::users::edit))
        .route("/view/admin/users/cancel", post(handlers::users::cancel))
        .route("/view/admin/users/save", post(handlers::users::save))
        .route("/view/admin/users/delete", post(handlers::users::delete))
        .route("/view/admin/users/disable", post(handlers::users::disable))
        .route("/view/admin/users/enable", post(handlers::users::enable))
        .route("/view/admin/users/add_workspace", post(handlers::users::add_to_workspace))
        .route("/view/admin/users/remove_workspace", post(handlers::users::remove_from_workspace))
        .route("/view/admin/users/dismiss", post(handlers::users::dismiss_notice))
        .route("/view/admin/jobs", get(handlers::list_jobs))
        .route("/view/admin/jobs/delete", post(handlers::delete_job))
        .route("/view/admin/workspaces", get(handlers::admin_workspaces::view))
        .route("/view/admin/workspaces/open", post(handlers::admin_workspaces::open))
        .route("/view/admin/workspaces/select", post(handlers::admin_workspaces::select))
        .route("/view/admin/workspaces/create", post(handlers::admin_workspaces::create))
        .route("/view/admin/workspaces/add_user", post(handlers::admin_workspaces::add_user))
        .route("/view/admin/workspaces/remove_user", post(handlers::admin_workspaces::remove_user))
        .route("/view/admin/workspaces/add_pair", post(handlers::admin_workspaces::add_pair))
        .route("/view/admin/workspaces/delete", post(handlers::admin_workspaces::delete))
        .route("/view/admin/workspaces/dismiss", post(handlers::admin_workspaces::dismiss_notice))
        .route("/view/admin/pces", get(handlers::admin_pces::view))
        .route("/view/admin/pces/open", post(handlers::admin_pces::open))
        .route("/view/admin/pces/select", post(handlers::admin_pces::select))
        .route("/view/admin/pces/add", post(handlers::admin_pces::add))
        .route("/view/admin/pces/add_module", post(handlers::admin_pces::add_module))
        .route("/view/admin/pces/deploy", post(handlers::admin_pces::deploy))
        .route("/view/admin/pces/module_state", post(handlers::admin_pces::check_state))
        .route("/view/admin/pces/delete", post(handlers::admin_pces::delete))
        .route("/view/admin/pces/dismiss", post(handlers::admin_pces::dismiss_notice))
        .route("/view/admin/modules", get(handlers::list_modules))
        .route("/view/admin/modules/delete", post(handlers::delete_module))

        // Static files
        .nest_service("/static", ServeDir::new(&config.server.static_dir))

        // Add middleware
        .layer(from_fn_with_state(state.clone(), middleware::require_csrf))
        .layer(from_fn(middleware::require_auth))
        .layer(session_layer)

        // Request size limit from config
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.upload.max_body_size))

        // Add state
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    let config = Config::load().context("Failed to load configuration")?;
    let address = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Using OnRamp server at {}", config.upstream.base_url);

    let idle_timeout = Duration::from_secs(config.session.idle_timeout_secs);
    let state = AppState::new(config).context("Failed to build the OnRamp client")?;
    state.pages.spawn_sweeper(idle_timeout);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server running on {}", address);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn router(base_url: &str) -> Router {
        build_router(AppState::new(Config::for_upstream(base_url)).unwrap())
    }

    fn session_cookie(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string()
    }

    fn meta_token(html: &str) -> String {
        let start = html.find("name=\"csrf-token\" content=\"").unwrap() + "name=\"csrf-token\" content=\"".len();
        let end = html[start..].find('"').unwrap();
        html[start..start + end].to_string()
    }

    #[tokio::test]
    async fn unauthenticated_page_redirects_to_login() {
        let response = router("http://127.0.0.1:9")
            .oneshot(Request::get("/public/Dashboard/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn unauthenticated_view_is_401() {
        let response = router("http://127.0.0.1:9")
            .oneshot(Request::get("/view/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn post_without_csrf_header_is_forbidden() {
        let response = router("http://127.0.0.1:9")
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":"alice","password":"pw"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    async fn upstream() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "csrftoken=up-1; Path=/"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "sessionid=s-1; Path=/")
                    .set_body_json(json!({"status": 0, "url": "/public/Dashboard/", "message": "Success"})),
            )
            .mount(&server)
            .await;
        server
    }

    /// Fetches the login page and returns the session cookie and CSRF token it hands out.
    async fn start_session(app: &Router) -> (String, String) {
        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (cookie, meta_token(&String::from_utf8_lossy(&body)))
    }

    /// Signs in and returns the session cookie to use from then on.
    async fn login(app: &Router, cookie: &str, token: &str) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::COOKIE, cookie)
                    .header("X-CSRFToken", token)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":"alice","password":"pw"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cycled = session_cookie(&response);
        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["url"], "/public/Dashboard/");
        cycled
    }

    async fn get(app: &Router, uri: &str, cookie: &str) -> StatusCode {
        app.clone()
            .oneshot(Request::get(uri).header(header::COOKIE, cookie).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn login_then_admin_pages_are_gated() {
        let server = upstream().await;
        let app = router(&server.uri());

        let (cookie, token) = start_session(&app).await;
        let cookie = login(&app, &cookie, &token).await;

        assert_eq!(get(&app, "/admin/Users/", &cookie).await, StatusCode::FORBIDDEN);
        assert_eq!(get(&app, "/public/Dashboard/", &cookie).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn login_issues_a_new_session_id() {
        let server = upstream().await;
        let app = router(&server.uri());

        let (before, token) = start_session(&app).await;
        let after = login(&app, &before, &token).await;

        assert_ne!(before, after);
        assert_eq!(get(&app, "/public/Dashboard/", &before).await, StatusCode::SEE_OTHER);
        assert_eq!(get(&app, "/public/Dashboard/", &after).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn logging_in_again_replaces_the_old_page_state() {
        let server = upstream().await;
        let state = AppState::new(Config::for_upstream(&server.uri())).unwrap();
        let pages = state.pages.clone();
        let app = build_router(state);

        let (cookie, token) = start_session(&app).await;
        let cookie = login(&app, &cookie, &token).await;
        assert_eq!(get(&app, "/view/workspace", &cookie).await, StatusCode::OK);
        assert_eq!(pages.len().await, 1);

        let cookie = login(&app, &cookie, &token).await;
        assert_eq!(get(&app, "/view/workspace", &cookie).await, StatusCode::OK);
        assert_eq!(pages.len().await, 1);
    }

    #[tokio::test]
    async fn blank_credentials_are_a_bad_request() {
        let app = router("http://127.0.0.1:9");
        let (cookie, token) = start_session(&app).await;

        let response = app
            .oneshot(
                Request::post("/login")
                    .header(header::COOKIE, &cookie)
                    .header("X-CSRFToken", &token)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":" ","password":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["message"], "Enter a username and password");
    }
}
