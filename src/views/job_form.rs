//! The dynamic job-submission form.
//!
//! Parameter schemas are specific to a (PCE, module) pair, so the form only
//! materialises once both are selected. Every selection change bumps the
//! epoch; a schema response tagged with an older epoch is dropped.

use std::collections::HashSet;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use crate::models::{ParamSchema, PceModulePair, COMMON_FAMILY};

pub const JOB_NAME_FIELD: &str = "job_name";

#[derive(Error, Debug, PartialEq)]
pub enum FormError {
    #[error("Select both a PCE and a module first")]
    NotReady,

    #[error("The form has no field {0}")]
    NoSuchField(usize),

    #[error("Field {0:?} does not belong to this module")]
    UnknownField(String),

    #[error("A job name is required")]
    MissingJobName,

    #[error("{0}")]
    Schema(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Selection {
    NoSelection,
    PceSelected { pce_id: i64 },
    ModuleSelected { module_id: i64 },
    BothSelected { pce_id: i64, module_id: i64 },
}

impl Selection {
    fn from_parts(pce_id: Option<i64>, module_id: Option<i64>) -> Self {
        match (pce_id, module_id) {
            (None, None) => Selection::NoSelection,
            (Some(pce_id), None) => Selection::PceSelected { pce_id },
            (None, Some(module_id)) => Selection::ModuleSelected { module_id },
            (Some(pce_id), Some(module_id)) => Selection::BothSelected { pce_id, module_id },
        }
    }

    pub fn pce_id(&self) -> Option<i64> {
        match *self {
            Selection::PceSelected { pce_id } | Selection::BothSelected { pce_id, .. } => Some(pce_id),
            _ => None,
        }
    }

    pub fn module_id(&self) -> Option<i64> {
        match *self {
            Selection::ModuleSelected { module_id } | Selection::BothSelected { module_id, .. } => {
                Some(module_id)
            }
            _ => None,
        }
    }
}

/// Fetch of the parameter schema for one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRequest {
    pub epoch: u64,
    pub pce_id: i64,
    pub module_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// One editable form row. `field` is `job_name` or `<family> <parameter>`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FormField {
    pub field: String,
    pub data: Value,
}

impl FormField {
    pub fn new(field: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            data: data.into(),
        }
    }
}

/// Which modules run on which PCEs within a workspace.
#[derive(Debug, Clone, Default)]
pub struct PairSet(HashSet<PceModulePair>);

impl PairSet {
    pub fn insert(&mut self, pce_id: i64, module_id: i64) {
        self.0.insert(PceModulePair { pce_id, module_id });
    }

    pub fn contains(&self, pce_id: i64, module_id: i64) -> bool {
        self.0.contains(&PceModulePair { pce_id, module_id })
    }

    pub fn modules_on(&self, pce_id: i64) -> HashSet<i64> {
        self.0.iter().filter(|p| p.pce_id == pce_id).map(|p| p.module_id).collect()
    }

    pub fn pces_for(&self, module_id: i64) -> HashSet<i64> {
        self.0.iter().filter(|p| p.module_id == module_id).map(|p| p.pce_id).collect()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<PceModulePair> for PairSet {
    fn from_iter<I: IntoIterator<Item = PceModulePair>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobForm {
    selection: Selection,
    epoch: u64,
    family: Option<String>,
    schema_status: SchemaStatus,
    fields: Vec<FormField>,
}

impl Default for JobForm {
    fn default() -> Self {
        Self {
            selection: Selection::NoSelection,
            epoch: 0,
            family: None,
            schema_status: SchemaStatus::Idle,
            fields: Vec::new(),
        }
    }
}

impl JobForm {
    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn schema_status(&self) -> SchemaStatus {
        self.schema_status
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Selects a PCE. A selected module survives only if it runs on the new PCE.
    pub fn select_pce(&mut self, pce_id: i64, pairs: &PairSet) -> Option<SchemaRequest> {
        let module_id = self
            .selection
            .module_id()
            .filter(|&module_id| pairs.contains(pce_id, module_id));
        self.transition(Selection::from_parts(Some(pce_id), module_id))
    }

    /// Selects a module. A selected PCE survives only if the module runs on it.
    pub fn select_module(&mut self, module_id: i64, pairs: &PairSet) -> Option<SchemaRequest> {
        let pce_id = self
            .selection
            .pce_id()
            .filter(|&pce_id| pairs.contains(pce_id, module_id));
        self.transition(Selection::from_parts(pce_id, Some(module_id)))
    }

    pub fn clear_pce(&mut self) {
        let next = Selection::from_parts(None, self.selection.module_id());
        self.transition(next);
    }

    pub fn clear_module(&mut self) {
        let next = Selection::from_parts(self.selection.pce_id(), None);
        self.transition(next);
    }

    pub fn reset(&mut self) {
        self.transition(Selection::NoSelection);
    }

    fn transition(&mut self, next: Selection) -> Option<SchemaRequest> {
        self.epoch += 1;
        self.selection = next;
        self.fields.clear();
        self.family = None;

        match next {
            Selection::BothSelected { pce_id, module_id } => {
                self.schema_status = SchemaStatus::Loading;
                Some(SchemaRequest {
                    epoch: self.epoch,
                    pce_id,
                    module_id,
                })
            }
            _ => {
                self.schema_status = SchemaStatus::Idle;
                None
            }
        }
    }

    /// Records the family resolved for the selected module, before the schema arrives.
    pub fn expect_family(&mut self, family: impl Into<String>) {
        self.family = Some(family.into());
    }

    /// Applies a fetched schema if it belongs to the current selection.
    ///
    /// Returns `false` when the response is stale and was discarded.
    pub fn schema_loaded(&mut self, epoch: u64, schema: Result<ParamSchema, String>) -> Result<bool, FormError> {
        if epoch != self.epoch || !matches!(self.selection, Selection::BothSelected { .. }) {
            tracing::debug!("Discarding schema for epoch {} (current {})", epoch, self.epoch);
            return Ok(false);
        }

        let outcome = schema.and_then(|schema| {
            let family = pick_family(&schema, self.family.as_deref())?;
            let fields = flatten(&schema, family.as_deref());
            Ok((family, fields))
        });

        match outcome {
            Ok((family, fields)) => {
                self.family = family;
                self.fields = fields;
                self.schema_status = SchemaStatus::Ready;
                Ok(true)
            }
            Err(msg) => {
                self.schema_status = SchemaStatus::Failed;
                Err(FormError::Schema(msg))
            }
        }
    }

    pub fn edit(&mut self, index: usize, data: Value) -> Result<(), FormError> {
        let field = self.fields.get_mut(index).ok_or(FormError::NoSuchField(index))?;
        field.data = data;
        Ok(())
    }

    /// The submission payload: job name plus nested `uioptions`.
    pub fn submission(&self) -> Result<(i64, i64, String, Value), FormError> {
        let Selection::BothSelected { pce_id, module_id } = self.selection else {
            return Err(FormError::NotReady);
        };
        if self.schema_status != SchemaStatus::Ready {
            return Err(FormError::NotReady);
        }

        let mut nested = unflatten(&self.fields, self.family.as_deref())?;
        let job_name = match nested.remove(JOB_NAME_FIELD) {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(FormError::MissingJobName),
        };
        Ok((pce_id, module_id, job_name, Value::Object(nested)))
    }
}

/// Chooses the module family to read from the schema.
///
/// The expected family wins when the schema has it; otherwise a schema
/// carrying exactly one module family names it.
fn pick_family(schema: &ParamSchema, expected: Option<&str>) -> Result<Option<String>, String> {
    if let Some(family) = expected {
        if schema.params(family).is_some() {
            return Ok(Some(family.to_string()));
        }
    }

    let offered: Vec<&str> = schema.module_families().collect();
    match offered.as_slice() {
        [] => Ok(expected.map(str::to_string)),
        [only] => Ok(Some(only.to_string())),
        _ => Err(format!(
            "no parameters for {:?}; the server offers {}",
            expected.unwrap_or(""),
            offered.join(", ")
        )),
    }
}

/// `[job_name, "onramp <p>"..., "<family> <p>"...]`, all empty.
pub fn flatten(schema: &ParamSchema, family: Option<&str>) -> Vec<FormField> {
    let mut fields = vec![FormField::new(JOB_NAME_FIELD, "")];
    let mut add = |family: &str| {
        for param in schema.params(family).unwrap_or_default() {
            fields.push(FormField::new(format!("{} {}", family, param), ""));
        }
    };
    add(COMMON_FAMILY);
    if let Some(family) = family.filter(|f| *f != COMMON_FAMILY) {
        add(family);
    }
    fields
}

/// Reassembles form rows into `{job_name, onramp: {..}, <family>: {..}}`.
pub fn unflatten(fields: &[FormField], family: Option<&str>) -> Result<Map<String, Value>, FormError> {
    let mut common = Map::new();
    let mut specific = Map::new();
    let mut job_name = Value::String(String::new());

    for field in fields {
        if field.field == JOB_NAME_FIELD {
            job_name = field.data.clone();
            continue;
        }
        let (prefix, param) = field
            .field
            .split_once(' ')
            .ok_or_else(|| FormError::UnknownField(field.field.clone()))?;

        if prefix == COMMON_FAMILY {
            common.insert(param.to_string(), field.data.clone());
        } else if Some(prefix) == family {
            specific.insert(param.to_string(), field.data.clone());
        } else {
            return Err(FormError::UnknownField(field.field.clone()));
        }
    }

    let mut nested = Map::new();
    nested.insert(JOB_NAME_FIELD.to_string(), job_name);
    nested.insert(COMMON_FAMILY.to_string(), Value::Object(common));
    if let Some(family) = family.filter(|f| *f != COMMON_FAMILY) {
        nested.insert(family.to_string(), Value::Object(specific));
    }
    Ok(nested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs() -> PairSet {
        [(1, 3), (2, 3), (2, 4)]
            .into_iter()
            .map(|(pce_id, module_id)| PceModulePair { pce_id, module_id })
            .collect()
    }

    fn ring_schema() -> ParamSchema {
        ParamSchema::from_value(&json!({"onramp": ["nodes", "np"], "ring": ["iters", "work"]})).unwrap()
    }

    #[test]
    fn pce_then_module_issues_one_schema_request() {
        let mut form = JobForm::default();
        assert!(form.select_pce(2, &pairs()).is_none());
        assert_eq!(form.selection(), Selection::PceSelected { pce_id: 2 });

        let request = form.select_module(3, &pairs()).unwrap();
        assert_eq!((request.pce_id, request.module_id), (2, 3));
        assert_eq!(request.epoch, form.epoch());
        assert_eq!(form.selection(), Selection::BothSelected { pce_id: 2, module_id: 3 });
        assert_eq!(form.schema_status(), SchemaStatus::Loading);
    }

    #[test]
    fn module_not_on_pce_drops_the_pce() {
        let mut form = JobForm::default();
        form.select_pce(1, &pairs());
        assert!(form.select_module(4, &pairs()).is_none());
        assert_eq!(form.selection(), Selection::ModuleSelected { module_id: 4 });
    }

    #[test]
    fn unflatten_nests_by_family() {
        let fields = vec![
            FormField::new("job_name", "Run1"),
            FormField::new("onramp nodes", "2"),
            FormField::new("ring iters", "5"),
        ];
        let nested = unflatten(&fields, Some("ring")).unwrap();
        assert_eq!(
            Value::Object(nested),
            json!({"job_name": "Run1", "onramp": {"nodes": "2"}, "ring": {"iters": "5"}})
        );
    }

    #[test]
    fn unflatten_rejects_foreign_prefix() {
        let fields = vec![FormField::new("hello name", "x")];
        assert_eq!(
            unflatten(&fields, Some("ring")),
            Err(FormError::UnknownField("hello name".into()))
        );
    }

    #[test]
    fn flatten_orders_common_before_module() {
        let labels: Vec<String> = flatten(&ring_schema(), Some("ring"))
            .into_iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(labels, ["job_name", "onramp nodes", "onramp np", "ring iters", "ring work"]);
    }

    #[test]
    fn changing_pce_discards_fields() {
        let mut form = JobForm::default();
        form.select_module(3, &pairs());
        let request = form.select_pce(2, &pairs()).unwrap();
        form.expect_family("ring");
        assert!(form.schema_loaded(request.epoch, Ok(ring_schema())).unwrap());
        assert_eq!(form.fields().len(), 5);

        form.clear_pce();
        assert!(form.fields().is_empty());
        assert_eq!(form.selection(), Selection::ModuleSelected { module_id: 3 });

        form.select_pce(2, &pairs());
        form.clear_module();
        assert!(form.fields().is_empty());
        assert_eq!(form.selection(), Selection::PceSelected { pce_id: 2 });
    }

    #[test]
    fn switching_to_pce_without_the_module_narrows() {
        let mut form = JobForm::default();
        form.select_pce(2, &pairs());
        form.select_module(4, &pairs()).unwrap();
        // module 4 is not deployed on PCE 1
        assert!(form.select_pce(1, &pairs()).is_none());
        assert_eq!(form.selection(), Selection::PceSelected { pce_id: 1 });
    }

    #[test]
    fn stale_schema_is_discarded() {
        let mut form = JobForm::default();
        form.select_pce(2, &pairs());
        let first = form.select_module(3, &pairs()).unwrap();
        let second = form.select_module(4, &pairs()).unwrap();
        assert!(second.epoch > first.epoch);

        form.expect_family("hello");
        assert!(!form.schema_loaded(first.epoch, Ok(ring_schema())).unwrap());
        assert!(form.fields().is_empty());
        assert_eq!(form.schema_status(), SchemaStatus::Loading);

        let hello = ParamSchema::from_value(&json!({"onramp": ["np"], "hello": ["name"]})).unwrap();
        assert!(form.schema_loaded(second.epoch, Ok(hello)).unwrap());
        assert_eq!(form.fields().last().unwrap().field, "hello name");
    }

    #[test]
    fn server_supplied_family_wins_when_alias_misses() {
        let mut form = JobForm::default();
        form.select_pce(2, &pairs());
        let request = form.select_module(3, &pairs()).unwrap();
        form.expect_family("mpi-ring");
        form.schema_loaded(request.epoch, Ok(ring_schema())).unwrap();
        assert_eq!(form.family(), Some("ring"));
    }

    #[test]
    fn submission_requires_ready_form_and_name() {
        let mut form = JobForm::default();
        assert_eq!(form.submission(), Err(FormError::NotReady));

        form.select_pce(2, &pairs());
        let request = form.select_module(3, &pairs()).unwrap();
        form.expect_family("ring");
        form.schema_loaded(request.epoch, Ok(ring_schema())).unwrap();
        assert_eq!(form.submission(), Err(FormError::MissingJobName));

        form.edit(0, json!("test1")).unwrap();
        form.edit(1, json!(1)).unwrap();
        form.edit(2, json!(2)).unwrap();
        form.edit(3, json!(5)).unwrap();
        form.edit(4, json!(1)).unwrap();
        assert_eq!(form.edit(9, json!(0)), Err(FormError::NoSuchField(9)));

        let (pce_id, module_id, name, opts) = form.submission().unwrap();
        assert_eq!((pce_id, module_id), (2, 3));
        assert_eq!(name, "test1");
        assert_eq!(opts, json!({"onramp": {"nodes": 1, "np": 2}, "ring": {"iters": 5, "work": 1}}));
    }
}
