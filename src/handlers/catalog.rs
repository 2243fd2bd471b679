//! Admin catalog pages without a selection: jobs and modules.
//!
//! Every mutation answers with the freshly reloaded list plus a notice
//! describing what happened.

use axum::{extract::State, Json};
use crate::errors::ApiResult;
use crate::models::{Job, JobIdForm, Keyed, Module, ModuleIdForm};
use crate::session::AuthSession;
use crate::views::ListPage;
use crate::AppState;

/// Adds the outcome of a mutation to a reloaded page.
fn with_outcome<T: Keyed>(mut page: ListPage<T>, outcome: ApiResult<String>) -> ListPage<T> {
    match outcome {
        Ok(message) => page.info(message),
        Err(err) => {
            page.notices.report(&err);
            page
        }
    }
}

// Jobs

pub async fn list_jobs(State(state): State<AppState>, auth: AuthSession) -> Json<ListPage<Job>> {
    Json(ListPage::loaded(state.client.all_jobs(&auth).await))
}

pub async fn delete_job(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(JobIdForm { job_id }): Json<JobIdForm>,
) -> Json<ListPage<Job>> {
    tracing::info!("{} deleting job {}", auth.username, job_id);
    let outcome = state
        .client
        .delete_job(&auth, job_id)
        .await
        .map(|()| format!("Job {} deleted", job_id));
    let page = ListPage::loaded(state.client.all_jobs(&auth).await);
    Json(with_outcome(page, outcome))
}

// Modules

pub async fn list_modules(State(state): State<AppState>, auth: AuthSession) -> Json<ListPage<Module>> {
    Json(ListPage::loaded(state.client.dashboard_modules(&auth).await))
}

pub async fn delete_module(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(ModuleIdForm { module_id }): Json<ModuleIdForm>,
) -> Json<ListPage<Module>> {
    tracing::warn!("Module {} delete requested; the server has no such operation", module_id);
    Json(ListPage::loaded(state.client.dashboard_modules(&auth).await).unsupported("Deleting a module"))
}
