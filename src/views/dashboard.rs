//! Landing pages. Every list loads on its own and fails on its own.

use serde::Serialize;
use crate::errors::ApiResult;
use crate::models::{Job, Module, Pce, User, Workspace};
use super::{ListView, Notices};

fn list<T: crate::models::Keyed>(result: ApiResult<Vec<T>>, notices: &mut Notices) -> ListView<T> {
    let mut list = ListView::default();
    list.begin_load();
    list.finish_load(result, notices);
    list
}

#[derive(Debug, Serialize)]
pub struct UserDashboard {
    pub username: String,
    pub jobs: ListView<Job>,
    pub workspaces: ListView<Workspace>,
    pub notices: Notices,
}

impl UserDashboard {
    pub fn loaded(
        username: impl Into<String>,
        jobs: ApiResult<Vec<Job>>,
        workspaces: ApiResult<Vec<Workspace>>,
    ) -> Self {
        let mut notices = Notices::default();
        Self {
            username: username.into(),
            jobs: list(jobs, &mut notices),
            workspaces: list(workspaces, &mut notices),
            notices,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub users: ListView<User>,
    pub jobs: ListView<Job>,
    pub workspaces: ListView<Workspace>,
    pub pces: ListView<Pce>,
    pub modules: ListView<Module>,
    pub notices: Notices,
}

impl AdminDashboard {
    pub fn loaded(
        users: ApiResult<Vec<User>>,
        jobs: ApiResult<Vec<Job>>,
        workspaces: ApiResult<Vec<Workspace>>,
        pces: ApiResult<Vec<Pce>>,
        modules: ApiResult<Vec<Module>>,
    ) -> Self {
        let mut notices = Notices::default();
        Self {
            users: list(users, &mut notices),
            jobs: list(jobs, &mut notices),
            workspaces: list(workspaces, &mut notices),
            pces: list(pces, &mut notices),
            modules: list(modules, &mut notices),
            notices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::views::{NoticeKind, ViewStatus};

    #[test]
    fn one_failing_list_leaves_the_others() {
        let dashboard = AdminDashboard::loaded(
            Ok(Vec::new()),
            Err(ApiError::Server(500)),
            Ok(Vec::new()),
            Err(ApiError::Auth),
            Ok(Vec::new()),
        );
        assert_eq!(dashboard.users.status(), ViewStatus::Empty);
        assert_eq!(dashboard.jobs.status(), ViewStatus::Failed);
        assert_eq!(dashboard.pces.status(), ViewStatus::Failed);
        assert_eq!(dashboard.notices.items().len(), 2);
        assert_eq!(dashboard.notices.count(NoticeKind::AuthFailure), 1);
    }
}
