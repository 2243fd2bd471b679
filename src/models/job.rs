use serde::{Deserialize, Serialize};
use super::{de, Keyed};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Job {
    #[serde(alias = "id", deserialize_with = "de::lenient_i64")]
    pub job_id: i64,
    #[serde(default, alias = "user", deserialize_with = "de::lenient_opt_i64")]
    pub user_id: Option<i64>,
    #[serde(default, alias = "workspace", deserialize_with = "de::lenient_opt_i64")]
    pub workspace_id: Option<i64>,
    #[serde(default, alias = "pce", deserialize_with = "de::lenient_opt_i64")]
    pub pce_id: Option<i64>,
    #[serde(default, alias = "module", deserialize_with = "de::lenient_opt_i64")]
    pub module_id: Option<i64>,
    #[serde(default, alias = "name", deserialize_with = "de::lenient_string")]
    pub job_name: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub state_str: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub output_file: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub runtime: String,
}

impl Keyed for Job {
    fn key(&self) -> i64 {
        self.job_id
    }
}

/// Live status of one job as reported by its PCE.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct JobInfo {
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub output: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub file: String,
}
