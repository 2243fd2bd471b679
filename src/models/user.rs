use serde::{Deserialize, Serialize};
use super::{de, Keyed};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    #[serde(alias = "id", deserialize_with = "de::lenient_i64")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub username: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub last_name: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub email: String,
    #[serde(default, alias = "is_superuser", deserialize_with = "de::lenient_bool")]
    pub is_admin: bool,
    #[serde(default = "enabled", alias = "is_active", deserialize_with = "de::lenient_bool")]
    pub is_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl Keyed for User {
    fn key(&self) -> i64 {
        self.user_id
    }
}
