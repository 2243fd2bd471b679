use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use crate::models::{ModuleForm, ModuleIdForm, NoticeIdForm, PceForm, PceIdForm};
use crate::services::OnRampClient;
use crate::session::AuthSession;
use crate::views::admin_pces::{Effect, PceDetail, PcesAction, PcesPage};
use crate::AppState;
use super::settle;

async fn perform(client: &OnRampClient, auth: &AuthSession, effect: Effect) -> PcesAction {
    match effect {
        Effect::LoadPces => PcesAction::Loaded(client.all_pces(auth).await),
        Effect::LoadDetail { epoch, pce_id } => {
            let (modules, workspaces, jobs) = futures::join!(
                client.pce_modules(auth, pce_id),
                client.pce_workspaces(auth, pce_id),
                client.pce_jobs(auth, pce_id),
            );
            PcesAction::DetailLoaded {
                epoch,
                detail: PceDetail { modules, workspaces, jobs },
            }
        }
        Effect::Add(form) => {
            tracing::info!("{} adding PCE {}", auth.username, form.name);
            PcesAction::Added {
                result: client.add_pce(auth, &form).await,
                name: form.name,
            }
        }
        Effect::AddModule(form) => PcesAction::ModuleAdded {
            result: client.add_module_to_pce(auth, &form).await,
            form,
        },
        Effect::Deploy { pce_id, module_id } => PcesAction::Deployed {
            pce_id,
            module_id,
            result: client.deploy_module(auth, pce_id, module_id).await,
        },
        Effect::CheckState { pce_id, module_id } => PcesAction::StateChecked {
            pce_id,
            module_id,
            result: client.module_state(auth, pce_id, module_id).await,
        },
    }
}

pub(crate) async fn drive(
    client: &OnRampClient,
    auth: &AuthSession,
    page: &Mutex<PcesPage>,
    action: PcesAction,
) {
    settle(page, action, |effect| perform(client, auth, effect)).await
}

async fn act(state: &AppState, auth: &AuthSession, action: PcesAction) -> Response {
    let page = state.pages.admin_pces(auth.view_key).await;
    drive(&state.client, auth, &page, action).await;
    let page = page.lock().await;
    Json(&*page).into_response()
}

pub async fn view(State(state): State<AppState>, auth: AuthSession) -> Response {
    let page = state.pages.admin_pces(auth.view_key).await;
    let page = page.lock().await;
    Json(&*page).into_response()
}

pub async fn open(State(state): State<AppState>, auth: AuthSession) -> Response {
    act(&state, &auth, PcesAction::Open).await
}

pub async fn select(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(PceIdForm { pce_id }): Json<PceIdForm>,
) -> Response {
    act(&state, &auth, PcesAction::Select(pce_id)).await
}

pub async fn add(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(form): Json<PceForm>,
) -> Response {
    act(&state, &auth, PcesAction::Add(form)).await
}

pub async fn add_module(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(form): Json<ModuleForm>,
) -> Response {
    act(&state, &auth, PcesAction::AddModule(form)).await
}

pub async fn deploy(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(ModuleIdForm { module_id }): Json<ModuleIdForm>,
) -> Response {
    act(&state, &auth, PcesAction::Deploy(module_id)).await
}

pub async fn check_state(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(ModuleIdForm { module_id }): Json<ModuleIdForm>,
) -> Response {
    act(&state, &auth, PcesAction::CheckState(module_id)).await
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(PceIdForm { pce_id }): Json<PceIdForm>,
) -> Response {
    act(&state, &auth, PcesAction::Delete(pce_id)).await
}

pub async fn dismiss_notice(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(NoticeIdForm { id }): Json<NoticeIdForm>,
) -> Response {
    act(&state, &auth, PcesAction::DismissNotice(id)).await
}
