use axum::{
    extract::{Path, State},
    Json,
};
use crate::models::Job;
use crate::session::AuthSession;
use crate::views::{
    dashboard::{AdminDashboard, UserDashboard},
    jobs::JobDetail,
    ListPage,
};
use crate::AppState;

pub async fn user_dashboard(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Json<UserDashboard> {
    tracing::info!("Loading dashboard for {}", auth.username);
    let client = &state.client;
    let (jobs, workspaces) = futures::join!(client.my_jobs(&auth), client.my_workspaces(&auth));
    Json(UserDashboard::loaded(auth.username.clone(), jobs, workspaces))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Json<AdminDashboard> {
    tracing::info!("Loading admin dashboard for {}", auth.username);
    let client = &state.client;
    let (users, jobs, workspaces, pces, modules) = futures::join!(
        client.dashboard_users(&auth),
        client.dashboard_jobs(&auth),
        client.dashboard_workspaces(&auth),
        client.dashboard_pces(&auth),
        client.dashboard_modules(&auth),
    );
    Json(AdminDashboard::loaded(users, jobs, workspaces, pces, modules))
}

pub async fn my_jobs(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Json<ListPage<Job>> {
    Json(ListPage::loaded(state.client.user_jobs_self(&auth).await))
}

pub async fn job_detail(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(job_id): Path<i64>,
) -> Json<JobDetail> {
    tracing::debug!("Loading job {} for {}", job_id, auth.username);
    Json(JobDetail::loaded(job_id, state.client.job_info(&auth, job_id).await))
}
