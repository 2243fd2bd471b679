//! Admin user management page.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::errors::ApiResult;
use crate::models::{Job, MembershipForm, User, UserForm, Workspace, PASSWORD_PLACEHOLDER};
use super::{ListView, NoticeKind, Notices, Reducer};

#[derive(Error, Debug, PartialEq)]
pub enum DraftError {
    #[error("A username is required")]
    MissingUsername,

    #[error("A password is required for new users")]
    MissingPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// The user being added or edited, as typed into the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserDraft {
    pub user_id: Option<i64>,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
    pub is_enabled: bool,
}

impl UserDraft {
    pub fn blank() -> Self {
        Self {
            is_enabled: true,
            ..Self::default()
        }
    }

    /// Draft of an existing user. The stored password is never shown.
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: Some(user.user_id),
            username: user.username.clone(),
            password: PASSWORD_PLACEHOLDER.to_string(),
            confirm_password: PASSWORD_PLACEHOLDER.to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_enabled: user.is_enabled,
        }
    }

    pub fn is_new(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn validate(&self) -> Result<UserForm, DraftError> {
        if self.username.trim().is_empty() {
            return Err(DraftError::MissingUsername);
        }
        if self.is_new() && (self.password.is_empty() || self.password == PASSWORD_PLACEHOLDER) {
            return Err(DraftError::MissingPassword);
        }
        if self.password != self.confirm_password {
            return Err(DraftError::PasswordMismatch);
        }

        Ok(UserForm {
            user_id: self.user_id,
            username: self.username.trim().to_string(),
            // The placeholder goes back as-is; the server reads it as "unchanged"
            password: self.password.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            is_enabled: self.is_enabled,
        })
    }
}

#[derive(Debug)]
pub enum UsersAction {
    Open,
    UsersLoaded(ApiResult<Vec<User>>),
    Select(i64),
    DetailLoaded {
        epoch: u64,
        jobs: ApiResult<Vec<Job>>,
        workspaces: ApiResult<Vec<Workspace>>,
    },
    Add,
    Edit,
    Cancel,
    Save(UserDraft),
    Saved(ApiResult<()>),
    Delete,
    Disable,
    Enable,
    Toggled { user_id: i64, enabled: bool, result: ApiResult<()> },
    AddToWorkspace(i64),
    RemoveFromWorkspace(i64),
    MembershipChanged(ApiResult<()>),
    DismissNotice(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadUsers,
    LoadDetail { epoch: u64, user_id: i64 },
    Create(UserForm),
    Update(UserForm),
    Disable(i64),
    Enable(i64),
    AddToWorkspace(MembershipForm),
    RemoveFromWorkspace(MembershipForm),
}

#[derive(Debug, Default, Serialize)]
pub struct UsersPage {
    users: ListView<User>,
    jobs: ListView<Job>,
    workspaces: ListView<Workspace>,
    draft: Option<UserDraft>,
    #[serde(skip)]
    detail_epoch: u64,
    notices: Notices,
}

impl UsersPage {
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn draft(&self) -> Option<&UserDraft> {
        self.draft.as_ref()
    }

    pub fn users(&self) -> &ListView<User> {
        &self.users
    }

    pub fn jobs(&self) -> &ListView<Job> {
        &self.jobs
    }

    pub fn workspaces(&self) -> &ListView<Workspace> {
        &self.workspaces
    }
}

impl Reducer for UsersPage {
    type Action = UsersAction;
    type Effect = Effect;

    fn apply(&mut self, action: UsersAction) -> Option<Effect> {
        match action {
            UsersAction::Open => {
                self.users.begin_load();
                Some(Effect::LoadUsers)
            }
            UsersAction::UsersLoaded(result) => {
                self.users.finish_load(result, &mut self.notices);
                None
            }
            UsersAction::Select(user_id) => {
                if self.users.select(user_id).is_none() {
                    self.notices
                        .push(NoticeKind::ValidationFailure, format!("No user with id {}", user_id));
                    return None;
                }
                self.draft = None;
                Some(self.load_detail(user_id))
            }
            UsersAction::DetailLoaded { epoch, jobs, workspaces } => {
                if epoch != self.detail_epoch {
                    tracing::debug!("Discarding user detail for epoch {}", epoch);
                    return None;
                }
                self.jobs.finish_load(jobs, &mut self.notices);
                self.workspaces.finish_load(workspaces, &mut self.notices);
                None
            }
            UsersAction::Add => {
                self.draft = Some(UserDraft::blank());
                None
            }
            UsersAction::Edit => {
                match self.users.selected() {
                    Some(user) => self.draft = Some(UserDraft::from_user(user)),
                    None => self.require_selection(),
                }
                None
            }
            UsersAction::Cancel => {
                self.draft = None;
                None
            }
            UsersAction::Save(draft) => {
                let form = match draft.validate() {
                    Ok(form) => form,
                    Err(err) => {
                        self.notices.push(NoticeKind::ValidationFailure, err.to_string());
                        self.draft = Some(draft);
                        return None;
                    }
                };
                self.draft = Some(draft);
                if form.user_id.is_some() {
                    Some(Effect::Update(form))
                } else {
                    Some(Effect::Create(form))
                }
            }
            UsersAction::Saved(result) => match result {
                Ok(()) => {
                    self.draft = None;
                    self.notices.push(NoticeKind::Info, "User saved");
                    self.users.begin_load();
                    Some(Effect::LoadUsers)
                }
                Err(err) => {
                    self.notices.report(&err);
                    None
                }
            },
            // Users are never removed, only disabled
            UsersAction::Delete | UsersAction::Disable => match self.users.selected() {
                Some(user) => Some(Effect::Disable(user.user_id)),
                None => {
                    self.require_selection();
                    None
                }
            },
            UsersAction::Enable => match self.users.selected() {
                Some(user) => Some(Effect::Enable(user.user_id)),
                None => {
                    self.require_selection();
                    None
                }
            },
            UsersAction::Toggled { user_id, enabled, result } => {
                match result {
                    Ok(()) => {
                        self.users.update(user_id, |user| user.is_enabled = enabled);
                    }
                    Err(err) => {
                        self.notices.report(&err);
                    }
                }
                None
            }
            UsersAction::AddToWorkspace(workspace_id) => {
                let Some(user) = self.users.selected() else {
                    self.require_selection();
                    return None;
                };
                if !user.is_enabled {
                    let message = format!("{} is disabled and cannot join a workspace", user.username);
                    self.notices.push(NoticeKind::ValidationFailure, message);
                    return None;
                }
                Some(Effect::AddToWorkspace(MembershipForm {
                    workspace_id,
                    user_id: user.user_id,
                }))
            }
            UsersAction::RemoveFromWorkspace(workspace_id) => {
                let Some(user) = self.users.selected() else {
                    self.require_selection();
                    return None;
                };
                Some(Effect::RemoveFromWorkspace(MembershipForm {
                    workspace_id,
                    user_id: user.user_id,
                }))
            }
            UsersAction::MembershipChanged(result) => {
                if let Err(err) = result {
                    self.notices.report(&err);
                    return None;
                }
                let user_id = self.users.selected().map(|user| user.user_id)?;
                Some(self.load_detail(user_id))
            }
            UsersAction::DismissNotice(id) => {
                self.notices.dismiss(id);
                None
            }
        }
    }
}

impl UsersPage {
    fn load_detail(&mut self, user_id: i64) -> Effect {
        self.detail_epoch += 1;
        self.jobs.clear();
        self.workspaces.clear();
        self.jobs.begin_load();
        self.workspaces.begin_load();
        Effect::LoadDetail {
            epoch: self.detail_epoch,
            user_id,
        }
    }

    fn require_selection(&mut self) {
        self.notices.push(NoticeKind::ValidationFailure, "Select a user first");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::views::ViewStatus;

    fn user(id: i64, enabled: bool) -> User {
        User {
            user_id: id,
            username: format!("user{}", id),
            first_name: "Ada".into(),
            last_name: "L".into(),
            email: String::new(),
            is_admin: false,
            is_enabled: enabled,
        }
    }

    fn loaded() -> UsersPage {
        let mut page = UsersPage::default();
        assert_eq!(page.apply(UsersAction::Open), Some(Effect::LoadUsers));
        page.apply(UsersAction::UsersLoaded(Ok(vec![user(1, true), user(2, false)])));
        page
    }

    #[test]
    fn draft_validation_rules() {
        let mut draft = UserDraft::blank();
        assert_eq!(draft.validate(), Err(DraftError::MissingUsername));

        draft.username = "bob".into();
        assert_eq!(draft.validate(), Err(DraftError::MissingPassword));

        draft.password = "secret".into();
        draft.confirm_password = "secrte".into();
        assert_eq!(draft.validate(), Err(DraftError::PasswordMismatch));

        draft.confirm_password = "secret".into();
        let form = draft.validate().unwrap();
        assert_eq!(form.user_id, None);
        assert!(form.is_enabled);
    }

    #[test]
    fn editing_keeps_the_placeholder_password() {
        let draft = UserDraft::from_user(&user(1, true));
        let form = draft.validate().unwrap();
        assert_eq!(form.user_id, Some(1));
        assert_eq!(form.password, PASSWORD_PLACEHOLDER);
    }

    #[test]
    fn select_loads_detail_and_discards_stale() {
        let mut page = loaded();
        let Some(Effect::LoadDetail { epoch: first, user_id }) = page.apply(UsersAction::Select(1)) else {
            panic!("expected a detail load");
        };
        assert_eq!(user_id, 1);
        let Some(Effect::LoadDetail { epoch: second, .. }) = page.apply(UsersAction::Select(2)) else {
            panic!("expected a detail load");
        };

        page.apply(UsersAction::DetailLoaded {
            epoch: first,
            jobs: Err(ApiError::Server(500)),
            workspaces: Ok(Vec::new()),
        });
        assert!(page.notices().is_empty());
        assert_eq!(page.jobs().status(), ViewStatus::Loading);

        page.apply(UsersAction::DetailLoaded {
            epoch: second,
            jobs: Ok(Vec::new()),
            workspaces: Ok(vec![Workspace {
                workspace_id: 5,
                workspace_name: "Class".into(),
                description: String::new(),
            }]),
        });
        assert_eq!(page.jobs().status(), ViewStatus::Empty);
        assert_eq!(page.workspaces().rows().len(), 1);
    }

    #[test]
    fn save_routes_to_create_or_update() {
        let mut page = loaded();
        page.apply(UsersAction::Add);
        let mut draft = page.draft().cloned().unwrap();
        draft.username = "carol".into();
        draft.password = "pw".into();
        draft.confirm_password = "pw".into();
        assert!(matches!(page.apply(UsersAction::Save(draft)), Some(Effect::Create(_))));

        page.apply(UsersAction::Select(1));
        page.apply(UsersAction::Edit);
        let draft = page.draft().cloned().unwrap();
        assert!(matches!(page.apply(UsersAction::Save(draft)), Some(Effect::Update(_))));

        assert_eq!(page.apply(UsersAction::Saved(Ok(()))), Some(Effect::LoadUsers));
        assert!(page.draft().is_none());
    }

    #[test]
    fn invalid_draft_is_kept_with_a_notice() {
        let mut page = loaded();
        assert!(page.apply(UsersAction::Save(UserDraft::blank())).is_none());
        assert_eq!(page.notices().count(NoticeKind::ValidationFailure), 1);
        assert!(page.draft().is_some());
    }

    #[test]
    fn delete_disables() {
        let mut page = loaded();
        page.apply(UsersAction::Select(1));
        assert_eq!(page.apply(UsersAction::Delete), Some(Effect::Disable(1)));

        page.apply(UsersAction::Toggled { user_id: 1, enabled: false, result: Ok(()) });
        assert!(!page.users().get(1).unwrap().is_enabled);
        assert_eq!(page.users().rows().len(), 2);
    }

    #[test]
    fn disabled_user_cannot_join_workspace() {
        let mut page = loaded();
        page.apply(UsersAction::Select(2));
        assert!(page.apply(UsersAction::AddToWorkspace(5)).is_none());
        assert_eq!(page.notices().count(NoticeKind::ValidationFailure), 1);

        page.apply(UsersAction::Select(1));
        assert_eq!(
            page.apply(UsersAction::AddToWorkspace(5)),
            Some(Effect::AddToWorkspace(MembershipForm { workspace_id: 5, user_id: 1 }))
        );
        assert_eq!(
            page.apply(UsersAction::RemoveFromWorkspace(5)),
            Some(Effect::RemoveFromWorkspace(MembershipForm { workspace_id: 5, user_id: 1 }))
        );
    }

    #[test]
    fn actions_without_selection_are_reported() {
        let mut page = loaded();
        assert!(page.apply(UsersAction::Enable).is_none());
        assert!(page.apply(UsersAction::Edit).is_none());
        assert_eq!(page.notices().count(NoticeKind::ValidationFailure), 2);
    }
}
