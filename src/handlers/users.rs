use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use crate::models::{NoticeIdForm, UserIdForm, WorkspaceIdForm};
use crate::services::OnRampClient;
use crate::session::AuthSession;
use crate::views::users::{Effect, UserDraft, UsersAction, UsersPage};
use crate::AppState;
use super::settle;

async fn perform(client: &OnRampClient, auth: &AuthSession, effect: Effect) -> UsersAction {
    match effect {
        Effect::LoadUsers => UsersAction::UsersLoaded(client.all_users(auth).await),
        Effect::LoadDetail { epoch, user_id } => {
            let (jobs, workspaces) = futures::join!(
                client.user_jobs(auth, user_id),
                client.user_workspaces(auth, user_id),
            );
            UsersAction::DetailLoaded { epoch, jobs, workspaces }
        }
        Effect::Create(form) => {
            tracing::info!("{} creating user {}", auth.username, form.username);
            UsersAction::Saved(client.create_user(auth, &form).await)
        }
        Effect::Update(form) => {
            tracing::info!("{} updating user {}", auth.username, form.username);
            UsersAction::Saved(client.update_user(auth, &form).await)
        }
        Effect::Disable(user_id) => UsersAction::Toggled {
            user_id,
            enabled: false,
            result: client.disable_user(auth, user_id).await,
        },
        Effect::Enable(user_id) => UsersAction::Toggled {
            user_id,
            enabled: true,
            result: client.enable_user(auth, user_id).await,
        },
        Effect::AddToWorkspace(form) => {
            UsersAction::MembershipChanged(client.add_user_to_workspace(auth, &form).await)
        }
        Effect::RemoveFromWorkspace(form) => {
            UsersAction::MembershipChanged(client.remove_user_from_workspace(auth, &form).await)
        }
    }
}

pub(crate) async fn drive(
    client: &OnRampClient,
    auth: &AuthSession,
    page: &Mutex<UsersPage>,
    action: UsersAction,
) {
    settle(page, action, |effect| perform(client, auth, effect)).await
}

async fn act(state: &AppState, auth: &AuthSession, action: UsersAction) -> Response {
    let page = state.pages.users(auth.view_key).await;
    drive(&state.client, auth, &page, action).await;
    let page = page.lock().await;
    Json(&*page).into_response()
}

pub async fn view(State(state): State<AppState>, auth: AuthSession) -> Response {
    let page = state.pages.users(auth.view_key).await;
    let page = page.lock().await;
    Json(&*page).into_response()
}

pub async fn open(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, UsersAction::Open).await
}

pub async fn select(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(UserIdForm { user_id }): Json<UserIdForm>,
) -> Response {
    act(&state, &auth, UsersAction::Select(user_id)).await
}

pub async fn add(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, UsersAction::Add).await
}

pub async fn edit(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, UsersAction::Edit).await
}

pub async fn cancel(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, UsersAction::Cancel).await
}

pub async fn save(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(draft): Json<UserDraft>,
) -> Response {
    act(&state, &auth, UsersAction::Save(draft)).await
}

pub async fn delete(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, UsersAction::Delete).await
}

pub async fn disable(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, UsersAction::Disable).await
}

pub async fn enable(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, UsersAction::Enable).await
}

pub async fn add_to_workspace(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(WorkspaceIdForm { workspace_id }): Json<WorkspaceIdForm>,
) -> Response {
    act(&state, &auth, UsersAction::AddToWorkspace(workspace_id)).await
}

pub async fn remove_from_workspace(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(WorkspaceIdForm { workspace_id }): Json<WorkspaceIdForm>,
) -> Response {
    act(&state, &auth, UsersAction::RemoveFromWorkspace(workspace_id)).await
}

pub async fn dismiss_notice(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(NoticeIdForm { id }): Json<NoticeIdForm>,
) -> Response {
    act(&state, &auth, UsersAction::DismissNotice(id)).await
}
