use serde::{Deserialize, Serialize};
use super::{de, Keyed};

/// Parallel Computing Environment: a compute resource jobs run on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Pce {
    #[serde(alias = "id", deserialize_with = "de::lenient_i64")]
    pub pce_id: i64,
    #[serde(default, alias = "name", deserialize_with = "de::lenient_string")]
    pub pce_name: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub location: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub contact_info: String,
    #[serde(default, alias = "url", deserialize_with = "de::lenient_string")]
    pub ip_addr: String,
    #[serde(default, alias = "port", deserialize_with = "de::lenient_opt_i64")]
    pub ip_port: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub pce_username: String,
}

impl Pce {
    /// Address the PCE service listens on; port 0 means the scheme default.
    pub fn url(&self) -> String {
        if self.ip_addr.is_empty() {
            return String::new();
        }
        match self.ip_port {
            Some(port) if port > 0 => format!("http://{}:{}", self.ip_addr, port),
            _ => format!("http://{}", self.ip_addr),
        }
    }
}

impl Keyed for Pce {
    fn key(&self) -> i64 {
        self.pce_id
    }
}
