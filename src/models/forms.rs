use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown in place of a stored password; sent back unchanged it means "keep".
pub const PASSWORD_PLACEHOLDER: &str = "**********";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Body of `/admin/Users/Create/` and `/admin/Users/Update/`.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct UserForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
    pub is_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct WorkspaceForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Body of `/admin/PCEs/Add/`.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PceForm {
    pub name: String,
    pub url: String,
    pub port: u16,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub pce_username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pce_password: String,
}

/// Body of `/admin/PCEs/addmodule/`: a module to install on one PCE.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ModuleForm {
    // Filled in from the selected PCE, never trusted from the browser
    #[serde(default)]
    pub pce_id: i64,
    pub module_id: i64,
    pub module_name: String,
    #[serde(default)]
    pub install_location: String,
    #[serde(default)]
    pub src_location_type: String,
    #[serde(default)]
    pub src_location_path: String,
}

/// A job submission for one (workspace, PCE, module) triple.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LaunchRequest {
    pub workspace_id: i64,
    pub pce_id: i64,
    pub module_id: i64,
    pub user_id: Option<i64>,
    pub job_name: String,
    pub uioptions: Value,
}

impl LaunchRequest {
    /// Form encoding used by the launch endpoint: `uioptions` travels as a JSON string.
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("workspace_id", self.workspace_id.to_string()),
            ("pce_id", self.pce_id.to_string()),
            ("module_id", self.module_id.to_string()),
        ];
        if let Some(user_id) = self.user_id {
            form.push(("user_id", user_id.to_string()));
        }
        form.push(("job_name", self.job_name.clone()));
        form.push(("uioptions", self.uioptions.to_string()));
        form
    }
}

// Bodies of the view-model endpoints

#[derive(Debug, Deserialize)]
pub struct UserIdForm {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct JobIdForm {
    pub job_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceIdForm {
    pub workspace_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PceIdForm {
    pub pce_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ModuleIdForm {
    pub module_id: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct MembershipForm {
    pub workspace_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct PairForm {
    pub workspace_id: i64,
    pub pce_id: i64,
    pub module_id: i64,
}

/// Names a module on the selected PCE.
#[derive(Debug, Deserialize)]
pub struct PairIdsForm {
    pub pce_id: i64,
    pub module_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct FieldEdit {
    pub index: usize,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct NoticeIdForm {
    pub id: u64,
}
