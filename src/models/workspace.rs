use serde::{Deserialize, Serialize};
use super::{de, Keyed};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Workspace {
    #[serde(alias = "id", deserialize_with = "de::lenient_i64")]
    pub workspace_id: i64,
    #[serde(default, alias = "name", deserialize_with = "de::lenient_string")]
    pub workspace_name: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub description: String,
}

impl Keyed for Workspace {
    fn key(&self) -> i64 {
        self.workspace_id
    }
}

/// A module that may run on a PCE within one workspace.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PceModulePair {
    #[serde(deserialize_with = "de::lenient_i64")]
    pub pce_id: i64,
    #[serde(deserialize_with = "de::lenient_i64")]
    pub module_id: i64,
}

/// A PCE-module pair as the admin workspace listing reports it, with names.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkspacePair {
    #[serde(deserialize_with = "de::lenient_i64")]
    pub pce_id: i64,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub pce_name: String,
    #[serde(deserialize_with = "de::lenient_i64")]
    pub module_id: i64,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub module_name: String,
}

impl WorkspacePair {
    pub fn is(&self, pce_id: i64, module_id: i64) -> bool {
        self.pce_id == pce_id && self.module_id == module_id
    }
}
