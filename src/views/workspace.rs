//! State of the workspace page: the workspace's PCEs and modules and the
//! job form built from them.
//!
//! The page is a reducer. Handlers feed it [`WorkspaceAction`]s and perform
//! whatever [`Effect`] comes back, then feed the outcome in as another action.

use serde::Serialize;
use serde_json::Value;
use crate::errors::ApiResult;
use crate::models::{LaunchRequest, Module, ParamSchema, Pce, Workspace};
use super::job_form::{JobForm, PairSet, SchemaRequest, Selection, SchemaStatus, FormField};
use super::{FamilyTable, ListView, NoticeKind, Notices, Reducer, ViewStatus};

/// What the upstream returned for one workspace.
#[derive(Debug)]
pub struct WorkspaceData {
    pub info: ApiResult<Workspace>,
    pub pces: ApiResult<Vec<Pce>>,
    /// Modules deployed on each PCE, in PCE order.
    pub modules: Vec<(i64, ApiResult<Vec<Module>>)>,
}

#[derive(Debug)]
pub enum WorkspaceAction {
    Open { workspace_id: i64 },
    Loaded { epoch: u64, data: WorkspaceData },
    SelectPce(i64),
    SelectModule(i64),
    ClearPce,
    ClearModule,
    SchemaLoaded { epoch: u64, result: ApiResult<ParamSchema> },
    EditField { index: usize, data: Value },
    Launch { user_id: Option<i64> },
    Launched(ApiResult<i64>),
    DismissNotice(u64),
    DismissConfirmation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Load { epoch: u64, workspace_id: i64 },
    FetchSchema(SchemaRequest),
    Launch(LaunchRequest),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Confirmation {
    pub job_id: i64,
    pub message: String,
    pub redirect: String,
}

impl Confirmation {
    fn for_job(job_id: i64) -> Self {
        Self {
            job_id,
            message: format!("Job created. ID {}", job_id),
            redirect: format!("/public/Jobs/?job_id={}", job_id),
        }
    }
}

#[derive(Debug)]
pub struct WorkspacePage {
    workspace_id: Option<i64>,
    load_epoch: u64,
    info: Option<Workspace>,
    pces: ListView<Pce>,
    modules: ListView<Module>,
    pairs: PairSet,
    form: JobForm,
    families: FamilyTable,
    launching: bool,
    confirmation: Option<Confirmation>,
    notices: Notices,
}

impl WorkspacePage {
    pub fn new(families: FamilyTable) -> Self {
        Self {
            workspace_id: None,
            load_epoch: 0,
            info: None,
            pces: ListView::default(),
            modules: ListView::default(),
            pairs: PairSet::default(),
            form: JobForm::default(),
            families,
            launching: false,
            confirmation: None,
            notices: Notices::default(),
        }
    }

    pub fn workspace_id(&self) -> Option<i64> {
        self.workspace_id
    }

    pub fn form(&self) -> &JobForm {
        &self.form
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }
}

impl Reducer for WorkspacePage {
    type Action = WorkspaceAction;
    type Effect = Effect;

    fn apply(&mut self, action: WorkspaceAction) -> Option<Effect> {
        match action {
            WorkspaceAction::Open { workspace_id } => {
                self.load_epoch += 1;
                self.workspace_id = Some(workspace_id);
                self.info = None;
                self.pces.clear();
                self.modules.clear();
                self.pairs.clear();
                self.form.reset();
                self.launching = false;
                self.confirmation = None;
                self.pces.begin_load();
                self.modules.begin_load();
                Some(Effect::Load {
                    epoch: self.load_epoch,
                    workspace_id,
                })
            }
            WorkspaceAction::Loaded { epoch, data } => {
                if epoch != self.load_epoch {
                    tracing::debug!("Discarding workspace load for epoch {}", epoch);
                    return None;
                }
                self.loaded(data);
                None
            }
            WorkspaceAction::SelectPce(pce_id) => {
                if !self.pces.contains(pce_id) {
                    self.notices
                        .push(NoticeKind::ValidationFailure, format!("PCE {} is not in this workspace", pce_id));
                    return None;
                }
                self.pces.select(pce_id);
                let request = self.form.select_pce(pce_id, &self.pairs);
                self.sync_selection();
                self.schema_effect(request)
            }
            WorkspaceAction::SelectModule(module_id) => {
                if !self.modules.contains(module_id) {
                    self.notices.push(
                        NoticeKind::ValidationFailure,
                        format!("Module {} is not in this workspace", module_id),
                    );
                    return None;
                }
                self.modules.select(module_id);
                let request = self.form.select_module(module_id, &self.pairs);
                self.sync_selection();
                self.schema_effect(request)
            }
            WorkspaceAction::ClearPce => {
                self.form.clear_pce();
                self.sync_selection();
                None
            }
            WorkspaceAction::ClearModule => {
                self.form.clear_module();
                self.sync_selection();
                None
            }
            WorkspaceAction::SchemaLoaded { epoch, result } => {
                match result {
                    Ok(schema) => {
                        if let Err(err) = self.form.schema_loaded(epoch, Ok(schema)) {
                            self.notices.push(NoticeKind::ServerError, err.to_string());
                        }
                    }
                    Err(err) => {
                        // Only a failure for the current selection is worth reporting
                        if self.form.schema_loaded(epoch, Err(err.to_string())).is_err() {
                            self.notices.report(&err);
                        }
                    }
                }
                None
            }
            WorkspaceAction::EditField { index, data } => {
                if let Err(err) = self.form.edit(index, data) {
                    self.notices.push(NoticeKind::ValidationFailure, err.to_string());
                }
                None
            }
            WorkspaceAction::Launch { user_id } => {
                if self.launching {
                    return None;
                }
                let Some(workspace_id) = self.workspace_id else {
                    self.notices
                        .push(NoticeKind::ValidationFailure, "Open a workspace before launching a job");
                    return None;
                };
                match self.form.submission() {
                    Ok((pce_id, module_id, job_name, uioptions)) => {
                        self.launching = true;
                        self.confirmation = None;
                        Some(Effect::Launch(LaunchRequest {
                            workspace_id,
                            pce_id,
                            module_id,
                            user_id,
                            job_name,
                            uioptions,
                        }))
                    }
                    Err(err) => {
                        self.notices.push(NoticeKind::ValidationFailure, err.to_string());
                        None
                    }
                }
            }
            WorkspaceAction::Launched(result) => {
                self.launching = false;
                match result {
                    Ok(job_id) => {
                        tracing::info!("Job {} created", job_id);
                        self.confirmation = Some(Confirmation::for_job(job_id));
                    }
                    Err(err) => {
                        self.notices.report(&err);
                    }
                }
                None
            }
            WorkspaceAction::DismissNotice(id) => {
                self.notices.dismiss(id);
                None
            }
            WorkspaceAction::DismissConfirmation => {
                self.confirmation = None;
                None
            }
        }
    }
}

impl WorkspacePage {
    fn loaded(&mut self, data: WorkspaceData) {
        match data.info {
            Ok(info) => self.info = Some(info),
            Err(err) => {
                self.notices.report(&err);
            }
        }

        // Modules hang off the PCE list; without it there is nothing to report twice
        if data.pces.is_err() {
            self.pces.finish_load(data.pces, &mut self.notices);
            self.modules.fail();
            return;
        }
        self.pces.finish_load(data.pces, &mut self.notices);

        let mut modules: Vec<Module> = Vec::new();
        let mut failed = None;
        for (pce_id, result) in data.modules {
            match result {
                Ok(rows) => {
                    for module in rows {
                        self.pairs.insert(pce_id, module.module_id);
                        if !modules.iter().any(|m| m.module_id == module.module_id) {
                            modules.push(module);
                        }
                    }
                }
                Err(err) => failed = Some(err),
            }
        }

        match failed {
            Some(err) if modules.is_empty() => self.modules.finish_load(Err(err), &mut self.notices),
            Some(err) => {
                self.notices.report(&err);
                self.modules.replace(modules);
            }
            None => self.modules.replace(modules),
        }
    }

    fn schema_effect(&mut self, request: Option<SchemaRequest>) -> Option<Effect> {
        let request = request?;
        let family = self
            .modules
            .get(request.module_id)
            .map(|module| self.families.resolve(module))?;
        tracing::debug!(
            "Fetching parameters of module {} on PCE {} as family {:?}",
            request.module_id, request.pce_id, family
        );
        self.form.expect_family(family);
        Some(Effect::FetchSchema(request))
    }

    // List selection mirrors the form's
    fn sync_selection(&mut self) {
        let selection = self.form.selection();
        match selection.pce_id() {
            Some(id) => {
                self.pces.select(id);
            }
            None => self.pces.clear_selection(),
        }
        match selection.module_id() {
            Some(id) => {
                self.modules.select(id);
            }
            None => self.modules.clear_selection(),
        }
    }

    /// PCEs offered for selection: narrowed to those running the selected module.
    pub fn visible_pces(&self) -> Vec<&Pce> {
        match self.form.selection().module_id() {
            Some(module_id) => {
                let pces = self.pairs.pces_for(module_id);
                self.pces.rows().iter().filter(|p| pces.contains(&p.pce_id)).collect()
            }
            None => self.pces.rows().iter().collect(),
        }
    }

    /// Modules offered for selection: narrowed to those deployed on the selected PCE.
    pub fn visible_modules(&self) -> Vec<&Module> {
        match self.form.selection().pce_id() {
            Some(pce_id) => {
                let modules = self.pairs.modules_on(pce_id);
                self.modules.rows().iter().filter(|m| modules.contains(&m.module_id)).collect()
            }
            None => self.modules.rows().iter().collect(),
        }
    }

    pub fn view(&self) -> WorkspaceView<'_> {
        WorkspaceView {
            workspace_id: self.workspace_id,
            workspace: self.info.as_ref(),
            pce_status: self.pces.status(),
            module_status: self.modules.status(),
            pces: self.visible_pces(),
            modules: self.visible_modules(),
            selection: self.form.selection(),
            family: self.form.family(),
            schema_status: self.form.schema_status(),
            fields: self.form.fields(),
            launching: self.launching,
            confirmation: self.confirmation.as_ref(),
            notices: &self.notices,
        }
    }
}

/// What the browser renders for the workspace page.
#[derive(Debug, Serialize)]
pub struct WorkspaceView<'a> {
    pub workspace_id: Option<i64>,
    pub workspace: Option<&'a Workspace>,
    pub pce_status: ViewStatus,
    pub module_status: ViewStatus,
    pub pces: Vec<&'a Pce>,
    pub modules: Vec<&'a Module>,
    pub selection: Selection,
    pub family: Option<&'a str>,
    pub schema_status: SchemaStatus,
    pub fields: &'a [FormField],
    pub launching: bool,
    pub confirmation: Option<&'a Confirmation>,
    pub notices: &'a Notices,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use serde_json::json;
    use std::collections::HashMap;

    fn pce(id: i64) -> Pce {
        serde_json::from_value(json!({"pce_id": id, "pce_name": format!("pce{}", id)})).unwrap()
    }

    fn module(id: i64, path: &str) -> Module {
        serde_json::from_value(json!({
            "module_id": id, "module_name": format!("mod{}", id), "src_location": path
        }))
        .unwrap()
    }

    fn families() -> FamilyTable {
        FamilyTable::new(HashMap::from([("mpi-ring".to_string(), "ring".to_string())]))
    }

    fn data() -> WorkspaceData {
        WorkspaceData {
            info: Ok(Workspace {
                workspace_id: 5,
                workspace_name: "Class".into(),
                description: String::new(),
            }),
            pces: Ok(vec![pce(1), pce(2)]),
            modules: vec![
                (1, Ok(vec![module(3, "modules/mpi-ring")])),
                (2, Ok(vec![module(3, "modules/mpi-ring"), module(4, "modules/AUC")])),
            ],
        }
    }

    fn opened() -> WorkspacePage {
        let mut page = WorkspacePage::new(families());
        let Some(Effect::Load { epoch, workspace_id }) = page.apply(WorkspaceAction::Open { workspace_id: 5 })
        else {
            panic!("opening a workspace should load it");
        };
        assert_eq!(workspace_id, 5);
        page.apply(WorkspaceAction::Loaded { epoch, data: data() });
        page
    }

    fn ring_schema() -> ParamSchema {
        ParamSchema::from_value(&json!({"onramp": ["nodes"], "ring": ["iters"]})).unwrap()
    }

    #[test]
    fn load_builds_lists_and_pairs() {
        let page = opened();
        assert_eq!(page.view().pces.len(), 2);
        assert_eq!(page.view().modules.len(), 2);
        assert_eq!(page.view().module_status, ViewStatus::Loaded);
        assert!(page.notices().is_empty());
    }

    #[test]
    fn selecting_pce_narrows_modules() {
        let mut page = opened();
        assert!(page.apply(WorkspaceAction::SelectPce(1)).is_none());
        let modules: Vec<i64> = page.visible_modules().iter().map(|m| m.module_id).collect();
        assert_eq!(modules, [3]);
        assert_eq!(page.visible_pces().len(), 2);
    }

    #[test]
    fn selecting_module_narrows_pces() {
        let mut page = opened();
        page.apply(WorkspaceAction::SelectModule(4));
        let pces: Vec<i64> = page.visible_pces().iter().map(|p| p.pce_id).collect();
        assert_eq!(pces, [2]);
    }

    #[test]
    fn both_selected_fetches_schema_once_with_family() {
        let mut page = opened();
        page.apply(WorkspaceAction::SelectPce(2));
        let effect = page.apply(WorkspaceAction::SelectModule(3));
        let Some(Effect::FetchSchema(request)) = effect else {
            panic!("expected a schema fetch, got {:?}", effect);
        };
        assert_eq!((request.pce_id, request.module_id), (2, 3));
        assert_eq!(page.form().family(), Some("ring"));

        page.apply(WorkspaceAction::SchemaLoaded {
            epoch: request.epoch,
            result: Ok(ring_schema()),
        });
        let labels: Vec<&str> = page.form().fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(labels, ["job_name", "onramp nodes", "ring iters"]);
    }

    #[test]
    fn unknown_pce_is_reported() {
        let mut page = opened();
        assert!(page.apply(WorkspaceAction::SelectPce(42)).is_none());
        assert_eq!(page.notices().count(NoticeKind::ValidationFailure), 1);
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut page = WorkspacePage::new(families());
        let Some(Effect::Load { epoch: old, .. }) = page.apply(WorkspaceAction::Open { workspace_id: 5 }) else {
            panic!("expected load");
        };
        page.apply(WorkspaceAction::Open { workspace_id: 6 });
        page.apply(WorkspaceAction::Loaded { epoch: old, data: data() });
        assert!(page.view().pces.is_empty());
        assert_eq!(page.view().pce_status, ViewStatus::Loading);
    }

    #[test]
    fn stale_schema_failure_is_silent() {
        let mut page = opened();
        page.apply(WorkspaceAction::SelectPce(2));
        let Some(Effect::FetchSchema(first)) = page.apply(WorkspaceAction::SelectModule(3)) else {
            panic!("expected a schema fetch");
        };
        page.apply(WorkspaceAction::SelectModule(4));
        page.apply(WorkspaceAction::SchemaLoaded {
            epoch: first.epoch,
            result: Err(ApiError::Server(500)),
        });
        assert!(page.notices().is_empty());
    }

    #[test]
    fn launch_posts_once_and_confirms() {
        let mut page = opened();
        page.apply(WorkspaceAction::SelectPce(2));
        let Some(Effect::FetchSchema(request)) = page.apply(WorkspaceAction::SelectModule(3)) else {
            panic!("expected a schema fetch");
        };
        page.apply(WorkspaceAction::SchemaLoaded { epoch: request.epoch, result: Ok(ring_schema()) });
        page.apply(WorkspaceAction::EditField { index: 0, data: json!("test1") });
        page.apply(WorkspaceAction::EditField { index: 1, data: json!(1) });
        page.apply(WorkspaceAction::EditField { index: 2, data: json!(5) });

        let Some(Effect::Launch(launch)) = page.apply(WorkspaceAction::Launch { user_id: Some(9) }) else {
            panic!("expected a launch");
        };
        assert_eq!(launch.workspace_id, 5);
        assert_eq!(launch.job_name, "test1");
        assert_eq!(launch.uioptions, json!({"onramp": {"nodes": 1}, "ring": {"iters": 5}}));

        // a second click while the first is in flight does nothing
        assert!(page.apply(WorkspaceAction::Launch { user_id: Some(9) }).is_none());

        page.apply(WorkspaceAction::Launched(Ok(77)));
        let confirmation = page.confirmation().unwrap();
        assert_eq!(confirmation.message, "Job created. ID 77");
        assert_eq!(confirmation.redirect, "/public/Jobs/?job_id=77");
    }

    #[test]
    fn launch_without_name_is_rejected_locally() {
        let mut page = opened();
        page.apply(WorkspaceAction::SelectPce(2));
        let Some(Effect::FetchSchema(request)) = page.apply(WorkspaceAction::SelectModule(3)) else {
            panic!("expected a schema fetch");
        };
        page.apply(WorkspaceAction::SchemaLoaded { epoch: request.epoch, result: Ok(ring_schema()) });
        assert!(page.apply(WorkspaceAction::Launch { user_id: None }).is_none());
        assert_eq!(page.notices().count(NoticeKind::ValidationFailure), 1);
    }

    #[test]
    fn failed_module_fetch_reports_once() {
        let mut page = WorkspacePage::new(families());
        let Some(Effect::Load { epoch, .. }) = page.apply(WorkspaceAction::Open { workspace_id: 5 }) else {
            panic!("expected load");
        };
        let mut data = data();
        data.modules = vec![(1, Err(ApiError::Auth)), (2, Ok(vec![module(4, "AUC")]))];
        page.apply(WorkspaceAction::Loaded { epoch, data });
        assert_eq!(page.notices().count(NoticeKind::AuthFailure), 1);
        assert_eq!(page.view().modules.len(), 1);
    }

    #[test]
    fn failed_pce_fetch_fails_modules_without_a_second_notice() {
        let mut page = WorkspacePage::new(families());
        let Some(Effect::Load { epoch, .. }) = page.apply(WorkspaceAction::Open { workspace_id: 5 }) else {
            panic!("expected load");
        };
        let mut data = data();
        data.pces = Err(ApiError::Server(500));
        data.modules = Vec::new();
        page.apply(WorkspaceAction::Loaded { epoch, data });

        assert_eq!(page.view().pce_status, ViewStatus::Failed);
        assert_eq!(page.view().module_status, ViewStatus::Failed);
        assert_eq!(page.notices().items().len(), 1);
        assert_eq!(page.notices().count(NoticeKind::ServerError), 1);
    }

    #[test]
    fn launch_before_opening_a_workspace_is_reported() {
        let mut page = WorkspacePage::new(families());
        assert!(page.apply(WorkspaceAction::Launch { user_id: None }).is_none());
        assert_eq!(page.notices().count(NoticeKind::ValidationFailure), 1);
    }
}
