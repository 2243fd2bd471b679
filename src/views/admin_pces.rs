//! Admin PCE management: the PCE list and, for the selected PCE, its
//! modules with their deployment state, the workspaces using it and its jobs.

use serde::Serialize;
use crate::errors::ApiResult;
use crate::models::{Job, Module, ModuleForm, Pce, PceForm, Workspace};
use super::{ListView, NoticeKind, Notices, Reducer};

#[derive(Debug)]
pub struct PceDetail {
    pub modules: ApiResult<Vec<Module>>,
    pub workspaces: ApiResult<Vec<Workspace>>,
    pub jobs: ApiResult<Vec<Job>>,
}

#[derive(Debug)]
pub enum PcesAction {
    Open,
    Loaded(ApiResult<Vec<Pce>>),
    Select(i64),
    DetailLoaded { epoch: u64, detail: PceDetail },
    Add(PceForm),
    Added { name: String, result: ApiResult<()> },
    AddModule(ModuleForm),
    ModuleAdded { form: ModuleForm, result: ApiResult<()> },
    Deploy(i64),
    Deployed { pce_id: i64, module_id: i64, result: ApiResult<()> },
    CheckState(i64),
    StateChecked { pce_id: i64, module_id: i64, result: ApiResult<Module> },
    Delete(i64),
    DismissNotice(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadPces,
    LoadDetail { epoch: u64, pce_id: i64 },
    Add(PceForm),
    AddModule(ModuleForm),
    Deploy { pce_id: i64, module_id: i64 },
    CheckState { pce_id: i64, module_id: i64 },
}

#[derive(Debug, Default, Serialize)]
pub struct PcesPage {
    pces: ListView<Pce>,
    modules: ListView<Module>,
    workspaces: ListView<Workspace>,
    jobs: ListView<Job>,
    #[serde(skip)]
    detail_epoch: u64,
    notices: Notices,
}

impl PcesPage {
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn pces(&self) -> &ListView<Pce> {
        &self.pces
    }

    pub fn modules(&self) -> &ListView<Module> {
        &self.modules
    }

    pub fn workspaces(&self) -> &ListView<Workspace> {
        &self.workspaces
    }

    pub fn jobs(&self) -> &ListView<Job> {
        &self.jobs
    }
}

impl Reducer for PcesPage {
    type Action = PcesAction;
    type Effect = Effect;

    fn apply(&mut self, action: PcesAction) -> Option<Effect> {
        match action {
            PcesAction::Open => {
                self.pces.begin_load();
                Some(Effect::LoadPces)
            }
            PcesAction::Loaded(result) => {
                self.pces.finish_load(result, &mut self.notices);
                None
            }
            PcesAction::Select(pce_id) => {
                if self.pces.select(pce_id).is_none() {
                    self.notices
                        .push(NoticeKind::ValidationFailure, format!("No PCE with id {}", pce_id));
                    return None;
                }
                Some(self.load_detail(pce_id))
            }
            PcesAction::DetailLoaded { epoch, detail } => {
                if epoch != self.detail_epoch {
                    tracing::debug!("Discarding PCE detail for epoch {}", epoch);
                    return None;
                }
                self.modules.finish_load(detail.modules, &mut self.notices);
                self.workspaces.finish_load(detail.workspaces, &mut self.notices);
                self.jobs.finish_load(detail.jobs, &mut self.notices);
                None
            }
            PcesAction::Add(form) => {
                if form.name.trim().is_empty() || form.url.trim().is_empty() {
                    self.notices.push(NoticeKind::ValidationFailure, "A PCE needs a name and a URL");
                    return None;
                }
                Some(Effect::Add(form))
            }
            PcesAction::Added { name, result } => match result {
                Ok(()) => {
                    self.notices.push(NoticeKind::Info, format!("PCE {} added", name));
                    self.pces.begin_load();
                    Some(Effect::LoadPces)
                }
                Err(err) => {
                    self.notices.report(&err);
                    None
                }
            },
            PcesAction::AddModule(mut form) => {
                let pce_id = self.require_selection()?;
                if form.module_name.trim().is_empty() {
                    self.notices.push(NoticeKind::ValidationFailure, "A module name is required");
                    return None;
                }
                if self.modules.contains(form.module_id) {
                    self.notices.push(
                        NoticeKind::ValidationFailure,
                        format!("Module {} is already on this PCE", form.module_id),
                    );
                    return None;
                }
                form.pce_id = pce_id;
                Some(Effect::AddModule(form))
            }
            PcesAction::ModuleAdded { form, result } => {
                if let Err(err) = result {
                    self.notices.report(&err);
                    return None;
                }
                self.notices.push(
                    NoticeKind::Info,
                    format!("Module {} added to PCE {}", form.module_name, form.pce_id),
                );
                if self.selected_id() != Some(form.pce_id) {
                    return None;
                }
                Some(self.load_detail(form.pce_id))
            }
            PcesAction::Deploy(module_id) => {
                let pce_id = self.require_module(module_id)?;
                Some(Effect::Deploy { pce_id, module_id })
            }
            PcesAction::Deployed { pce_id, module_id, result } => {
                if let Err(err) = result {
                    self.notices.report(&err);
                    return None;
                }
                self.notices.push(
                    NoticeKind::Info,
                    format!("Deployment of module {} on PCE {} started", module_id, pce_id),
                );
                Some(Effect::CheckState { pce_id, module_id })
            }
            PcesAction::CheckState(module_id) => {
                let pce_id = self.require_module(module_id)?;
                Some(Effect::CheckState { pce_id, module_id })
            }
            PcesAction::StateChecked { pce_id, module_id, result } => {
                match result {
                    Ok(reported) => {
                        if self.selected_id() == Some(pce_id) {
                            self.modules.update(module_id, |module| {
                                module.state = reported.state;
                                module.state_str = reported.state_str;
                            });
                        }
                    }
                    Err(err) => {
                        self.notices.report(&err);
                    }
                }
                None
            }
            PcesAction::Delete(pce_id) => {
                tracing::warn!("PCE {} delete requested; the server has no such operation", pce_id);
                self.notices
                    .push(NoticeKind::Unsupported, "Deleting a PCE is not supported by the OnRamp server");
                None
            }
            PcesAction::DismissNotice(id) => {
                self.notices.dismiss(id);
                None
            }
        }
    }
}

impl PcesPage {
    fn load_detail(&mut self, pce_id: i64) -> Effect {
        self.detail_epoch += 1;
        self.modules.clear();
        self.workspaces.clear();
        self.jobs.clear();
        self.modules.begin_load();
        self.workspaces.begin_load();
        self.jobs.begin_load();
        Effect::LoadDetail {
            epoch: self.detail_epoch,
            pce_id,
        }
    }

    fn selected_id(&self) -> Option<i64> {
        self.pces.selected().map(|pce| pce.pce_id)
    }

    fn require_selection(&mut self) -> Option<i64> {
        let selected = self.selected_id();
        if selected.is_none() {
            self.notices.push(NoticeKind::ValidationFailure, "Select a PCE first");
        }
        selected
    }

    /// The selected PCE, provided it lists the module.
    fn require_module(&mut self, module_id: i64) -> Option<i64> {
        let pce_id = self.require_selection()?;
        if !self.modules.contains(module_id) {
            self.notices.push(
                NoticeKind::ValidationFailure,
                format!("Module {} is not on PCE {}", module_id, pce_id),
            );
            return None;
        }
        Some(pce_id)
    }
}
