use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use futures::future::join_all;
use tokio::sync::Mutex;
use crate::models::{FieldEdit, ModuleIdForm, NoticeIdForm, PceIdForm, WorkspaceIdForm};
use crate::services::OnRampClient;
use crate::session::AuthSession;
use crate::views::workspace::{Effect, WorkspaceAction, WorkspaceData, WorkspacePage};
use crate::AppState;
use super::settle;

/// Runs one upstream call for the page and returns its outcome as the next action.
async fn perform(client: &OnRampClient, auth: &AuthSession, effect: Effect) -> WorkspaceAction {
    match effect {
        Effect::Load { epoch, workspace_id } => {
            let (info, pces) = futures::join!(
                client.workspace(auth, workspace_id),
                client.workspace_pces(auth, workspace_id),
            );
            let modules = match &pces {
                Ok(pces) => {
                    join_all(pces.iter().map(|pce| async move {
                        (pce.pce_id, client.workspace_modules(auth, workspace_id, pce.pce_id).await)
                    }))
                    .await
                }
                Err(_) => Vec::new(),
            };
            WorkspaceAction::Loaded {
                epoch,
                data: WorkspaceData { info, pces, modules },
            }
        }
        Effect::FetchSchema(request) => WorkspaceAction::SchemaLoaded {
            epoch: request.epoch,
            result: client.module_options(auth, request.pce_id, request.module_id).await,
        },
        Effect::Launch(request) => WorkspaceAction::Launched(client.launch_job(auth, &request).await),
    }
}

pub(crate) async fn drive(
    client: &OnRampClient,
    auth: &AuthSession,
    page: &Mutex<WorkspacePage>,
    action: WorkspaceAction,
) {
    settle(page, action, |effect| perform(client, auth, effect)).await
}

async fn act(state: &AppState, auth: &AuthSession, action: WorkspaceAction) -> Response {
    let page = state.pages.workspace(auth.view_key).await;
    drive(&state.client, auth, &page, action).await;
    let page = page.lock().await;
    Json(page.view()).into_response()
}

pub async fn view(State(state): State<AppState>, auth: AuthSession) -> Response {
    let page = state.pages.workspace(auth.view_key).await;
    let page = page.lock().await;
    Json(page.view()).into_response()
}

pub async fn open(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(WorkspaceIdForm { workspace_id }): Json<WorkspaceIdForm>,
) -> Response {
    tracing::info!("{} opening workspace {}", auth.username, workspace_id);
    act(&state, &auth, WorkspaceAction::Open { workspace_id }).await
}

pub async fn select_pce(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(PceIdForm { pce_id }): Json<PceIdForm>,
) -> Response {
    act(&state, &auth, WorkspaceAction::SelectPce(pce_id)).await
}

pub async fn select_module(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(ModuleIdForm { module_id }): Json<ModuleIdForm>,
) -> Response {
    act(&state, &auth, WorkspaceAction::SelectModule(module_id)).await
}

pub async fn clear_pce(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, WorkspaceAction::ClearPce).await
}

pub async fn clear_module(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, WorkspaceAction::ClearModule).await
}

pub async fn edit_field(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(FieldEdit { index, data }): Json<FieldEdit>,
) -> Response {
    act(&state, &auth, WorkspaceAction::EditField { index, data }).await
}

pub async fn launch(State(state): State<AppState>, auth: AuthSession) -> Response {
    let user_id = auth.user_id;
    act(&state, &auth, WorkspaceAction::Launch { user_id }).await
}

pub async fn dismiss_notice(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(NoticeIdForm { id }): Json<NoticeIdForm>,
) -> Response {
    act(&state, &auth, WorkspaceAction::DismissNotice(id)).await
}

pub async fn dismiss_confirmation(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, WorkspaceAction::DismissConfirmation).await
}
