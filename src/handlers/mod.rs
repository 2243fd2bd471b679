use std::future::Future;
use tokio::sync::Mutex;
use crate::views::Reducer;

mod auth;
mod pages;
mod dashboard;
pub mod workspace;
pub mod users;
pub mod admin_workspaces;
pub mod admin_pces;
mod catalog;

pub use auth::{serve_login_page, handle_login, handle_logout};
pub use pages::serve_page;
pub use dashboard::{user_dashboard, admin_dashboard, my_jobs, job_detail};
pub use catalog::{list_jobs, delete_job, list_modules, delete_module};

/// Applies an action and follows the effects it produces until the page settles.
///
/// The page lock is released while each upstream call runs.
pub(crate) async fn settle<P, F, Fut>(page: &Mutex<P>, action: P::Action, mut perform: F)
where
    P: Reducer,
    F: FnMut(P::Effect) -> Fut,
    Fut: Future<Output = P::Action>,
{
    let mut next = Some(action);
    while let Some(action) = next.take() {
        let effect = page.lock().await.apply(action);
        if let Some(effect) = effect {
            next = Some(perform(effect).await);
        }
    }
}
