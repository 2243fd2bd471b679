//! Admin workspace management.
//!
//! Selecting a workspace loads what hangs off it: its jobs, the PCE-module
//! pairs it offers, its members and the users who could still join.

use serde::Serialize;
use crate::errors::ApiResult;
use crate::models::{Job, MembershipForm, PairForm, User, Workspace, WorkspaceForm, WorkspacePair};
use super::{ListView, NoticeKind, Notices, Reducer, ViewStatus};

/// Sub-collections of one workspace, fetched together.
#[derive(Debug)]
pub struct WorkspaceDetail {
    pub jobs: ApiResult<Vec<Job>>,
    pub pairs: ApiResult<Vec<WorkspacePair>>,
    pub members: ApiResult<Vec<User>>,
    pub candidates: ApiResult<Vec<User>>,
}

#[derive(Debug)]
pub enum WorkspacesAction {
    Open,
    Loaded(ApiResult<Vec<Workspace>>),
    Select(i64),
    DetailLoaded { epoch: u64, detail: WorkspaceDetail },
    Create(WorkspaceForm),
    Created(ApiResult<Workspace>),
    AddUser(i64),
    RemoveUser(i64),
    MembershipChanged { form: MembershipForm, added: bool, result: ApiResult<()> },
    AddPair { pce_id: i64, module_id: i64 },
    PairAdded { form: PairForm, result: ApiResult<()> },
    Delete(i64),
    DismissNotice(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadWorkspaces,
    LoadDetail { epoch: u64, workspace_id: i64 },
    Create(WorkspaceForm),
    AddUser(MembershipForm),
    RemoveUser(MembershipForm),
    AddPair(PairForm),
}

#[derive(Debug, Default, Serialize)]
pub struct WorkspacesPage {
    workspaces: ListView<Workspace>,
    jobs: ListView<Job>,
    pair_status: ViewStatus,
    pairs: Vec<WorkspacePair>,
    members: ListView<User>,
    candidates: ListView<User>,
    #[serde(skip)]
    detail_epoch: u64,
    notices: Notices,
}

impl WorkspacesPage {
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn workspaces(&self) -> &ListView<Workspace> {
        &self.workspaces
    }

    pub fn jobs(&self) -> &ListView<Job> {
        &self.jobs
    }

    pub fn pairs(&self) -> &[WorkspacePair] {
        &self.pairs
    }

    pub fn members(&self) -> &ListView<User> {
        &self.members
    }

    pub fn candidates(&self) -> &ListView<User> {
        &self.candidates
    }

    fn selected_id(&self) -> Option<i64> {
        self.workspaces.selected().map(|ws| ws.workspace_id)
    }
}

impl Reducer for WorkspacesPage {
    type Action = WorkspacesAction;
    type Effect = Effect;

    fn apply(&mut self, action: WorkspacesAction) -> Option<Effect> {
        match action {
            WorkspacesAction::Open => {
                self.workspaces.begin_load();
                Some(Effect::LoadWorkspaces)
            }
            WorkspacesAction::Loaded(result) => {
                self.workspaces.finish_load(result, &mut self.notices);
                None
            }
            WorkspacesAction::Select(workspace_id) => {
                if self.workspaces.select(workspace_id).is_none() {
                    self.notices.push(
                        NoticeKind::ValidationFailure,
                        format!("No workspace with id {}", workspace_id),
                    );
                    return None;
                }
                Some(self.load_detail(workspace_id))
            }
            WorkspacesAction::DetailLoaded { epoch, detail } => {
                if epoch != self.detail_epoch {
                    tracing::debug!("Discarding workspace detail for epoch {}", epoch);
                    return None;
                }
                self.jobs.finish_load(detail.jobs, &mut self.notices);
                self.members.finish_load(detail.members, &mut self.notices);
                self.candidates.finish_load(detail.candidates, &mut self.notices);
                match detail.pairs {
                    Ok(pairs) => {
                        self.pair_status = if pairs.is_empty() { ViewStatus::Empty } else { ViewStatus::Loaded };
                        self.pairs = pairs;
                    }
                    Err(err) => {
                        self.notices.report(&err);
                        self.pair_status = ViewStatus::Failed;
                    }
                }
                None
            }
            WorkspacesAction::Create(form) => {
                if form.name.trim().is_empty() {
                    self.notices.push(NoticeKind::ValidationFailure, "A workspace name is required");
                    return None;
                }
                Some(Effect::Create(WorkspaceForm {
                    name: form.name.trim().to_string(),
                    description: form.description,
                }))
            }
            WorkspacesAction::Created(result) => {
                match result {
                    Ok(ws) => {
                        self.notices.push(
                            NoticeKind::Info,
                            format!("Workspace {} created with ID {}", ws.workspace_name, ws.workspace_id),
                        );
                        self.workspaces.push(ws);
                    }
                    Err(err) => {
                        self.notices.report(&err);
                    }
                }
                None
            }
            WorkspacesAction::AddUser(user_id) => {
                let workspace_id = self.require_selection()?;
                if self.members.contains(user_id) {
                    self.notices.push(
                        NoticeKind::ValidationFailure,
                        format!("User {} already has access to this workspace", user_id),
                    );
                    return None;
                }
                Some(Effect::AddUser(MembershipForm { workspace_id, user_id }))
            }
            WorkspacesAction::RemoveUser(user_id) => {
                let workspace_id = self.require_selection()?;
                if !self.members.contains(user_id) {
                    self.notices.push(
                        NoticeKind::ValidationFailure,
                        format!("User {} is not a member of this workspace", user_id),
                    );
                    return None;
                }
                Some(Effect::RemoveUser(MembershipForm { workspace_id, user_id }))
            }
            WorkspacesAction::MembershipChanged { form, added, result } => {
                if let Err(err) = result {
                    self.notices.report(&err);
                    return None;
                }
                // The admin may have moved on to another workspace meanwhile
                if self.selected_id() != Some(form.workspace_id) {
                    return None;
                }
                let (from, to) = if added {
                    (&mut self.candidates, &mut self.members)
                } else {
                    (&mut self.members, &mut self.candidates)
                };
                if let Some(user) = from.remove(form.user_id) {
                    let verb = if added { "added to" } else { "removed from" };
                    self.notices
                        .push(NoticeKind::Info, format!("{} {} the workspace", user.username, verb));
                    to.push(user);
                }
                None
            }
            WorkspacesAction::AddPair { pce_id, module_id } => {
                let workspace_id = self.require_selection()?;
                if self.pairs.iter().any(|pair| pair.is(pce_id, module_id)) {
                    self.notices.push(
                        NoticeKind::ValidationFailure,
                        format!("Module {} on PCE {} is already offered here", module_id, pce_id),
                    );
                    return None;
                }
                Some(Effect::AddPair(PairForm { workspace_id, pce_id, module_id }))
            }
            WorkspacesAction::PairAdded { form, result } => {
                if let Err(err) = result {
                    self.notices.report(&err);
                    return None;
                }
                self.notices.push(
                    NoticeKind::Info,
                    format!("Module {} on PCE {} added to the workspace", form.module_id, form.pce_id),
                );
                if self.selected_id() != Some(form.workspace_id) {
                    return None;
                }
                Some(self.load_detail(form.workspace_id))
            }
            WorkspacesAction::Delete(workspace_id) => {
                tracing::warn!("Workspace {} delete requested; the server has no such operation", workspace_id);
                self.notices.push(
                    NoticeKind::Unsupported,
                    "Deleting a workspace is not supported by the OnRamp server",
                );
                None
            }
            WorkspacesAction::DismissNotice(id) => {
                self.notices.dismiss(id);
                None
            }
        }
    }
}

impl WorkspacesPage {
    fn load_detail(&mut self, workspace_id: i64) -> Effect {
        self.detail_epoch += 1;
        self.jobs.clear();
        self.members.clear();
        self.candidates.clear();
        self.pairs.clear();
        self.jobs.begin_load();
        self.members.begin_load();
        self.candidates.begin_load();
        self.pair_status = ViewStatus::Loading;
        Effect::LoadDetail {
            epoch: self.detail_epoch,
            workspace_id,
        }
    }

    fn require_selection(&mut self) -> Option<i64> {
        let selected = self.selected_id();
        if selected.is_none() {
            self.notices.push(NoticeKind::ValidationFailure, "Select a workspace first");
        }
        selected
    }
}
