use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use crate::models::{NoticeIdForm, PairIdsForm, UserIdForm, WorkspaceForm, WorkspaceIdForm};
use crate::services::OnRampClient;
use crate::session::AuthSession;
use crate::views::admin_workspaces::{Effect, WorkspaceDetail, WorkspacesAction, WorkspacesPage};
use crate::AppState;
use super::settle;

async fn perform(client: &OnRampClient, auth: &AuthSession, effect: Effect) -> WorkspacesAction {
    match effect {
        Effect::LoadWorkspaces => WorkspacesAction::Loaded(client.all_workspaces(auth).await),
        Effect::LoadDetail { epoch, workspace_id } => {
            let (jobs, pairs, members, candidates) = futures::join!(
                client.workspace_jobs(auth, workspace_id),
                client.workspace_pairs(auth, workspace_id),
                client.workspace_users(auth, workspace_id),
                client.potential_users(auth, workspace_id),
            );
            WorkspacesAction::DetailLoaded {
                epoch,
                detail: WorkspaceDetail { jobs, pairs, members, candidates },
            }
        }
        Effect::Create(form) => {
            tracing::info!("{} creating workspace {}", auth.username, form.name);
            WorkspacesAction::Created(client.create_workspace(auth, &form).await)
        }
        Effect::AddUser(form) => WorkspacesAction::MembershipChanged {
            form,
            added: true,
            result: client.add_user_to_workspace(auth, &form).await,
        },
        Effect::RemoveUser(form) => WorkspacesAction::MembershipChanged {
            form,
            added: false,
            result: client.remove_user_from_workspace(auth, &form).await,
        },
        Effect::AddPair(form) => WorkspacesAction::PairAdded {
            form,
            result: client.add_pce_module_pair(auth, &form).await,
        },
    }
}

pub(crate) async fn drive(
    client: &OnRampClient,
    auth: &AuthSession,
    page: &Mutex<WorkspacesPage>,
    action: WorkspacesAction,
) {
    settle(page, action, |effect| perform(client, auth, effect)).await
}

async fn act(state: &AppState, auth: &AuthSession, action: WorkspacesAction) -> Response {
    let page = state.pages.admin_workspaces(auth.view_key).await;
    drive(&state.client, auth, &page, action).await;
    let page = page.lock().await;
    Json(&*page).into_response()
}

pub async fn view(State(state): State<AppState>, auth: AuthSession) -> Response {
    let page = state.pages.admin_workspaces(auth.view_key).await;
    let page = page.lock().await;
    Json(&*page).into_response()
}

pub async fn open(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, WorkspacesAction::Open).await
}

pub async fn select(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(WorkspaceIdForm { workspace_id }): Json<WorkspaceIdForm>,
) -> Response {
    act(&state, &auth, WorkspacesAction::Select(workspace_id)).await
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(form): Json<WorkspaceForm>,
) -> Response {
    act(&state, &auth, WorkspacesAction::Create(form)).await
}

pub async fn add_user(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(UserIdForm { user_id }): Json<UserIdForm>,
) -> Response {
    act(&state, &auth, WorkspacesAction::AddUser(user_id)).await
}

pub async fn remove_user(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(UserIdForm { user_id }): Json<UserIdForm>,
) -> Response {
    act(&state, &auth, WorkspacesAction::RemoveUser(user_id)).await
}

pub async fn add_pair(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(PairIdsForm { pce_id, module_id }): Json<PairIdsForm>,
) -> Response {
    act(&state, &auth, WorkspacesAction::AddPair { pce_id, module_id }).await
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(WorkspaceIdForm { workspace_id }): Json<WorkspaceIdForm>,
) -> Response {
    act(&state, &auth, WorkspacesAction::Delete(workspace_id)).await
}

pub async fn dismiss_notice(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(NoticeIdForm { id }): Json<NoticeIdForm>,
) -> Response {
    act(&state, &auth, WorkspacesAction::DismissNotice(id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::views::NoticeKind;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn upstream() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/Workspaces/All"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1,
                "workspaces": [
                    {"workspace_id": 1, "workspace_name": "Intro"},
                    {"workspace_id": 2, "workspace_name": "Advanced"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/Workspaces/Jobs"))
            .and(body_string_contains("workspace_id=2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1, "jobs": [{"job_id": 8, "job_name": "ring"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/Workspaces/PCEs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "pces": [{"module_id": 3, "module_name": "Ring", "pce_id": 1, "pce_name": "flux"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/Workspaces/WorkspaceUsers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1, "users": [{"user_id": 4, "username": "alice"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/Workspaces/PotentialUsers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1, "users": [{"user_id": 6, "username": "bob"}]
            })))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> OnRampClient {
        OnRampClient::new(&Config::for_upstream(&server.uri()).upstream).unwrap()
    }

    #[tokio::test]
    async fn select_fetches_every_sub_collection() {
        let server = upstream().await;
        let client = client(&server);
        let auth = AuthSession::new("admin");
        let page = Mutex::new(WorkspacesPage::default());

        drive(&client, &auth, &page, WorkspacesAction::Open).await;
        drive(&client, &auth, &page, WorkspacesAction::Select(2)).await;

        let page = page.lock().await;
        assert_eq!(page.jobs().rows()[0].job_id, 8);
        assert_eq!(page.pairs()[0].pce_name, "flux");
        assert!(page.members().contains(4));
        assert!(page.candidates().contains(6));
        assert!(page.notices().is_empty());
    }

    #[tokio::test]
    async fn adding_a_candidate_posts_once_and_moves_them() {
        let server = upstream().await;
        Mock::given(method("POST"))
            .and(path("/admin/Workspaces/AddUser"))
            .and(body_string_contains("workspace_id=2"))
            .and(body_string_contains("user_id=6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 1, "status_message": "Success"})))
            .expect(1)
            .mount(&server)
            .await;
        let client = client(&server);
        let auth = AuthSession::new("admin");
        let page = Mutex::new(WorkspacesPage::default());

        drive(&client, &auth, &page, WorkspacesAction::Open).await;
        drive(&client, &auth, &page, WorkspacesAction::Select(2)).await;
        drive(&client, &auth, &page, WorkspacesAction::AddUser(6)).await;

        let page = page.lock().await;
        assert!(page.members().contains(6));
        assert!(!page.candidates().contains(6));
        assert_eq!(page.notices().count(NoticeKind::Info), 1);
    }

    #[tokio::test]
    async fn duplicate_membership_reported_by_the_server_is_a_notice() {
        let server = upstream().await;
        Mock::given(method("POST"))
            .and(path("/admin/Workspaces/AddUser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": -1, "status_message": "User already has permissions for this workspace."
            })))
            .mount(&server)
            .await;
        let client = client(&server);
        let auth = AuthSession::new("admin");
        let page = Mutex::new(WorkspacesPage::default());

        drive(&client, &auth, &page, WorkspacesAction::Open).await;
        drive(&client, &auth, &page, WorkspacesAction::Select(2)).await;
        drive(&client, &auth, &page, WorkspacesAction::AddUser(6)).await;

        let page = page.lock().await;
        assert_eq!(page.notices().count(NoticeKind::ValidationFailure), 1);
        assert!(page.candidates().contains(6));
    }
}
