use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tower_sessions::cookie::Cookie;
use crate::config::UpstreamConfig;
use crate::errors::{ApiError, ApiResult};
use crate::models::{
    de, table, Job, JobInfo, LaunchRequest, LoginForm, MembershipForm, Module, ModuleForm, PairForm,
    ParamSchema, Pce, PceForm, User, UserForm, Workspace, WorkspaceForm, WorkspacePair,
};
use crate::session::AuthSession;

/// Upstream paths (generation-2 API).
pub mod endpoints {
    pub const LOGIN_PAGE: &str = "/";
    pub const LOGIN: &str = "/login/";
    pub const LOGOUT: &str = "/logout/";

    pub const DASHBOARD_USERS: &str = "/admin/Dashboard/GetUsers/";
    pub const DASHBOARD_JOBS: &str = "/admin/Dashboard/GetJobs/";
    pub const DASHBOARD_WORKSPACES: &str = "/admin/Dashboard/GetWorkspaces/";
    pub const DASHBOARD_PCES: &str = "/admin/Dashboard/GetPces/";
    pub const DASHBOARD_MODULES: &str = "/admin/Dashboard/GetModules/";

    pub const USERS_ALL: &str = "/admin/Users/GetAll/";
    pub const USERS_CREATE: &str = "/admin/Users/Create/";
    pub const USERS_UPDATE: &str = "/admin/Users/Update/";
    pub const USERS_DISABLE: &str = "/admin/Users/Disable/";
    pub const USERS_ENABLE: &str = "/admin/Users/Enable/";
    pub const USERS_JOBS: &str = "/admin/Users/Jobs/";
    pub const USERS_WORKSPACES: &str = "/admin/Users/Workspaces/";

    pub const JOBS_ALL: &str = "/admin/Jobs/GetAll";
    pub const JOBS_DELETE: &str = "/admin/Jobs/Delete";

    pub const WORKSPACES_ALL: &str = "/admin/Workspaces/All";
    pub const WORKSPACES_CREATE: &str = "/admin/Workspaces/Create";
    pub const WORKSPACES_ADD_USER: &str = "/admin/Workspaces/AddUser";
    pub const WORKSPACES_REMOVE_USER: &str = "/admin/Workspaces/RemoveUser";
    pub const WORKSPACES_ADD_PAIR: &str = "/admin/Workspaces/AddPCEModPair";
    pub const WORKSPACES_JOBS: &str = "/admin/Workspaces/Jobs";
    pub const WORKSPACES_PAIRS: &str = "/admin/Workspaces/PCEs";
    pub const WORKSPACES_USERS: &str = "/admin/Workspaces/WorkspaceUsers";
    pub const WORKSPACES_POTENTIAL_USERS: &str = "/admin/Workspaces/PotentialUsers";

    pub const PCES_ALL: &str = "/admin/PCEs/GetAll/";
    pub const PCES_ADD: &str = "/admin/PCEs/Add/";
    pub const PCES_MODULES: &str = "/admin/PCEs/GetPCEModules/";
    pub const PCES_WORKSPACES: &str = "/admin/PCEs/GetPCEWorkspaces/";
    pub const PCES_JOBS: &str = "/admin/PCEs/GetPCEJobs/";
    pub const PCES_MODULE_STATE: &str = "/admin/PCEs/GetModuleState/";
    pub const PCES_DEPLOY_MODULE: &str = "/admin/PCEs/DeployModule/";
    pub const PCES_ADD_MODULE: &str = "/admin/PCEs/addmodule/";

    pub const MY_JOBS: &str = "/public/Dashboard/GetJobs/";
    pub const MY_WORKSPACES: &str = "/public/Dashboard/GetWorkspaces/";

    pub const WORKSPACE_INFO: &str = "/public/Workspace/GetWorkspace/";
    pub const WORKSPACE_PCES: &str = "/public/Workspace/GetPCEs/";
    pub const WORKSPACE_MODULES: &str = "/public/Workspace/GetModules/";
    pub const MODULE_OPTIONS: &str = "/public/Workspace/GetModuleOptions/";
    pub const LAUNCH_JOB: &str = "/public/Workspace/LaunchJob/";

    pub const JOB_INFO: &str = "/public/Jobs/GetJobInfo/";
    pub const USER_JOBS: &str = "/public/Jobs/UserJobs/";
}

/// Decoded JSON body of a successful upstream response.
#[derive(Debug, Clone)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn new(value: Value) -> ApiResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ApiError::Shape(format!("expected a JSON object, found {}", other))),
        }
    }

    /// `success` wins when present; otherwise a negative or false `status` is a failure.
    pub fn is_success(&self) -> bool {
        if let Some(success) = self.0.get("success") {
            return truthy(success);
        }
        match self.0.get("status") {
            Some(Value::Bool(ok)) => *ok,
            Some(Value::Number(n)) => n.as_f64().map_or(true, |n| n >= 0.0),
            Some(Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(code) => code >= 0,
                Err(_) => !s.eq_ignore_ascii_case("false"),
            },
            _ => true,
        }
    }

    pub fn message(&self) -> String {
        // "stauts_message" is how some admin endpoints spell it
        ["status_message", "message", "stauts_message"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
            .filter(|msg| !msg.is_empty())
            .unwrap_or("The request was rejected by the server")
            .to_string()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Rows under `key`, in either list shape. A missing key is an empty list.
    pub fn rows<T: DeserializeOwned>(&self, key: &str) -> ApiResult<Vec<T>> {
        table::decode_rows(self.0.get(key).unwrap_or(&Value::Null))
    }

    pub fn value<T: DeserializeOwned>(&self, key: &str) -> ApiResult<T> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| ApiError::Shape(format!("response has no {:?}", key)))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// The whole body as one object.
    pub fn decode<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map_or(false, |n| n > 0),
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

fn is_unsafe(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// Classifies an upstream response: 401, other non-200, undecodable body, business-rule rejection.
async fn read_envelope(response: Response) -> ApiResult<Envelope> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Auth);
    }
    if status != StatusCode::OK {
        return Err(ApiError::Server(status.as_u16()));
    }

    let body = response.text().await?;
    let envelope = Envelope::new(serde_json::from_str(&body)?)?;
    if !envelope.is_success() {
        return Err(ApiError::Validation(envelope.message()));
    }
    Ok(envelope)
}

#[derive(Deserialize)]
struct Launched {
    #[serde(deserialize_with = "de::lenient_i64")]
    job_id: i64,
}

/// Generation-1 login responses carry the credentials in an `auth` block.
#[derive(Deserialize, Default)]
struct LoginAuth {
    #[serde(default)]
    apikey: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_opt_i64")]
    user_id: Option<i64>,
}

/// HTTP client for the OnRamp API.
#[derive(Clone)]
pub struct OnRampClient {
    http: Client,
    base_url: String,
    csrf_header: String,
    csrf_cookie: String,
    session_cookie: String,
}

impl OnRampClient {
    pub fn new(config: &UpstreamConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            csrf_header: config.csrf_header.clone(),
            csrf_cookie: config.csrf_cookie.clone(),
            session_cookie: config.session_cookie.clone(),
        })
    }

    fn request(&self, method: Method, path: &str, auth: Option<&AuthSession>) -> RequestBuilder {
        let unsafe_method = is_unsafe(&method);
        let mut request = self.http.request(method, format!("{}{}", self.base_url, path));

        let Some(auth) = auth else {
            return request;
        };

        let mut cookies = Vec::new();
        if let Some(session_id) = &auth.upstream_session {
            cookies.push(format!("{}={}", self.session_cookie, session_id));
        }
        if let Some(token) = &auth.upstream_csrf {
            cookies.push(format!("{}={}", self.csrf_cookie, token));
            if unsafe_method {
                request = request.header(self.csrf_header.as_str(), token.as_str());
            }
        }
        if !cookies.is_empty() {
            request = request.header(header::COOKIE, cookies.join("; "));
        }
        if let Some(key) = &auth.api_key {
            request = request.query(&[("apikey", key)]);
        }
        request
    }

    pub async fn get(&self, auth: &AuthSession, path: &str) -> ApiResult<Envelope> {
        tracing::debug!("GET {} for {}", path, auth.username);
        let response = self.request(Method::GET, path, Some(auth)).send().await.map_err(|e| {
            tracing::warn!("GET {} failed: {}", path, e);
            ApiError::from(e)
        })?;
        read_envelope(response).await
    }

    pub async fn post<F>(&self, auth: &AuthSession, path: &str, form: &F) -> ApiResult<Envelope>
    where
        F: Serialize + ?Sized,
    {
        tracing::debug!("POST {} for {}", path, auth.username);
        let response = self
            .request(Method::POST, path, Some(auth))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("POST {} failed: {}", path, e);
                ApiError::from(e)
            })?;
        read_envelope(response).await
    }

    fn cookie_from(&self, response: &Response, name: &str) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw.to_string()).ok())
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    // Auth

    /// Authenticates against the upstream and returns the session to store.
    pub async fn login(&self, form: &LoginForm) -> ApiResult<AuthSession> {
        tracing::info!("Login attempt for user: {}", form.username);

        // The login page hands out the CSRF cookie the login post must echo
        let page = self.request(Method::GET, endpoints::LOGIN_PAGE, None).send().await?;
        let mut auth = AuthSession::new(form.username.clone());
        auth.upstream_csrf = self.cookie_from(&page, &self.csrf_cookie);

        let response = self
            .request(Method::POST, endpoints::LOGIN, Some(&auth))
            .form(form)
            .send()
            .await?;
        let session_id = self.cookie_from(&response, &self.session_cookie);
        let rotated_csrf = self.cookie_from(&response, &self.csrf_cookie);
        let envelope = read_envelope(response).await?;

        if session_id.is_some() {
            auth.upstream_session = session_id;
        }
        if rotated_csrf.is_some() {
            auth.upstream_csrf = rotated_csrf;
        }

        let landing = envelope.get("url").and_then(Value::as_str).unwrap_or("");
        auth.is_admin = landing.contains("admin")
            || envelope.get("is_admin").map_or(false, truthy);

        let legacy: LoginAuth = match envelope.get("auth") {
            Some(block) => serde_json::from_value(block.clone())?,
            None => envelope.decode().unwrap_or_default(),
        };
        auth.api_key = legacy.apikey;
        auth.user_id = legacy.user_id;

        tracing::info!("User {} logged in (admin: {})", auth.username, auth.is_admin);
        Ok(auth)
    }

    /// Ends the upstream session. The response is a page, not JSON.
    pub async fn logout(&self, auth: &AuthSession) -> ApiResult<()> {
        let response = self
            .request(Method::GET, endpoints::LOGOUT, Some(auth))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ApiError::Auth),
            status => Err(ApiError::Server(status.as_u16())),
        }
    }

    // Admin dashboard

    pub async fn dashboard_users(&self, auth: &AuthSession) -> ApiResult<Vec<User>> {
        self.get(auth, endpoints::DASHBOARD_USERS).await?.rows("users")
    }

    pub async fn dashboard_jobs(&self, auth: &AuthSession) -> ApiResult<Vec<Job>> {
        self.get(auth, endpoints::DASHBOARD_JOBS).await?.rows("jobs")
    }

    pub async fn dashboard_workspaces(&self, auth: &AuthSession) -> ApiResult<Vec<Workspace>> {
        self.get(auth, endpoints::DASHBOARD_WORKSPACES).await?.rows("workspaces")
    }

    pub async fn dashboard_pces(&self, auth: &AuthSession) -> ApiResult<Vec<Pce>> {
        self.get(auth, endpoints::DASHBOARD_PCES).await?.rows("pces")
    }

    pub async fn dashboard_modules(&self, auth: &AuthSession) -> ApiResult<Vec<Module>> {
        self.get(auth, endpoints::DASHBOARD_MODULES).await?.rows("modules")
    }

    // Users

    pub async fn all_users(&self, auth: &AuthSession) -> ApiResult<Vec<User>> {
        self.get(auth, endpoints::USERS_ALL).await?.rows("users")
    }

    pub async fn user_jobs(&self, auth: &AuthSession, user_id: i64) -> ApiResult<Vec<Job>> {
        self.post(auth, endpoints::USERS_JOBS, &[("user_id", user_id)])
            .await?
            .rows("jobs")
    }

    pub async fn user_workspaces(&self, auth: &AuthSession, user_id: i64) -> ApiResult<Vec<Workspace>> {
        self.post(auth, endpoints::USERS_WORKSPACES, &[("user_id", user_id)])
            .await?
            .rows("workspaces")
    }

    pub async fn create_user(&self, auth: &AuthSession, form: &UserForm) -> ApiResult<()> {
        self.post(auth, endpoints::USERS_CREATE, form).await.map(|_| ())
    }

    pub async fn update_user(&self, auth: &AuthSession, form: &UserForm) -> ApiResult<()> {
        self.post(auth, endpoints::USERS_UPDATE, form).await.map(|_| ())
    }

    pub async fn disable_user(&self, auth: &AuthSession, user_id: i64) -> ApiResult<()> {
        self.post(auth, endpoints::USERS_DISABLE, &[("user_id", user_id)])
            .await
            .map(|_| ())
    }

    pub async fn enable_user(&self, auth: &AuthSession, user_id: i64) -> ApiResult<()> {
        self.post(auth, endpoints::USERS_ENABLE, &[("user_id", user_id)])
            .await
            .map(|_| ())
    }

    // Jobs

    pub async fn all_jobs(&self, auth: &AuthSession) -> ApiResult<Vec<Job>> {
        self.get(auth, endpoints::JOBS_ALL).await?.rows("jobs")
    }

    pub async fn delete_job(&self, auth: &AuthSession, job_id: i64) -> ApiResult<()> {
        self.post(auth, endpoints::JOBS_DELETE, &[("id", job_id)])
            .await
            .map(|_| ())
    }

    pub async fn my_jobs(&self, auth: &AuthSession) -> ApiResult<Vec<Job>> {
        self.get(auth, endpoints::MY_JOBS).await?.rows("jobs")
    }

    pub async fn user_jobs_self(&self, auth: &AuthSession) -> ApiResult<Vec<Job>> {
        self.get(auth, endpoints::USER_JOBS).await?.rows("jobs")
    }

    pub async fn job_info(&self, auth: &AuthSession, job_id: i64) -> ApiResult<JobInfo> {
        self.post(auth, endpoints::JOB_INFO, &[("job_id", job_id)])
            .await?
            .decode()
    }

    // Workspaces

    pub async fn all_workspaces(&self, auth: &AuthSession) -> ApiResult<Vec<Workspace>> {
        self.get(auth, endpoints::WORKSPACES_ALL).await?.rows("workspaces")
    }

    pub async fn my_workspaces(&self, auth: &AuthSession) -> ApiResult<Vec<Workspace>> {
        self.get(auth, endpoints::MY_WORKSPACES).await?.rows("workspaces")
    }

    pub async fn create_workspace(&self, auth: &AuthSession, form: &WorkspaceForm) -> ApiResult<Workspace> {
        self.post(auth, endpoints::WORKSPACES_CREATE, form)
            .await?
            .value("workspace")
    }

    pub async fn add_user_to_workspace(&self, auth: &AuthSession, form: &MembershipForm) -> ApiResult<()> {
        self.post(auth, endpoints::WORKSPACES_ADD_USER, form).await.map(|_| ())
    }

    pub async fn remove_user_from_workspace(&self, auth: &AuthSession, form: &MembershipForm) -> ApiResult<()> {
        self.post(auth, endpoints::WORKSPACES_REMOVE_USER, form).await.map(|_| ())
    }

    pub async fn add_pce_module_pair(&self, auth: &AuthSession, form: &PairForm) -> ApiResult<()> {
        self.post(auth, endpoints::WORKSPACES_ADD_PAIR, form).await.map(|_| ())
    }

    pub async fn workspace_jobs(&self, auth: &AuthSession, workspace_id: i64) -> ApiResult<Vec<Job>> {
        self.post(auth, endpoints::WORKSPACES_JOBS, &[("workspace_id", workspace_id)])
            .await?
            .rows("jobs")
    }

    /// PCE-module pairs of a workspace, with their names. The server lists them under `pces`.
    pub async fn workspace_pairs(&self, auth: &AuthSession, workspace_id: i64) -> ApiResult<Vec<WorkspacePair>> {
        self.post(auth, endpoints::WORKSPACES_PAIRS, &[("workspace_id", workspace_id)])
            .await?
            .rows("pces")
    }

    pub async fn workspace_users(&self, auth: &AuthSession, workspace_id: i64) -> ApiResult<Vec<User>> {
        self.post(auth, endpoints::WORKSPACES_USERS, &[("workspace_id", workspace_id)])
            .await?
            .rows("users")
    }

    /// Users who could be added to a workspace: non-admins not already in it.
    pub async fn potential_users(&self, auth: &AuthSession, workspace_id: i64) -> ApiResult<Vec<User>> {
        self.post(auth, endpoints::WORKSPACES_POTENTIAL_USERS, &[("workspace_id", workspace_id)])
            .await?
            .rows("users")
    }

    pub async fn workspace(&self, auth: &AuthSession, workspace_id: i64) -> ApiResult<Workspace> {
        self.post(auth, endpoints::WORKSPACE_INFO, &[("workspace_id", workspace_id)])
            .await?
            .value("data")
    }

    pub async fn workspace_pces(&self, auth: &AuthSession, workspace_id: i64) -> ApiResult<Vec<Pce>> {
        self.post(auth, endpoints::WORKSPACE_PCES, &[("workspace_id", workspace_id)])
            .await?
            .rows("pces")
    }

    pub async fn workspace_modules(
        &self,
        auth: &AuthSession,
        workspace_id: i64,
        pce_id: i64,
    ) -> ApiResult<Vec<Module>> {
        self.post(
            auth,
            endpoints::WORKSPACE_MODULES,
            &[("workspace_id", workspace_id), ("pce_id", pce_id)],
        )
        .await?
        .rows("modules")
    }

    pub async fn module_options(
        &self,
        auth: &AuthSession,
        pce_id: i64,
        module_id: i64,
    ) -> ApiResult<ParamSchema> {
        let envelope = self
            .post(auth, endpoints::MODULE_OPTIONS, &[("pce_id", pce_id), ("module_id", module_id)])
            .await?;
        let options = envelope
            .get("uioptions")
            .ok_or_else(|| ApiError::Shape("response has no \"uioptions\"".into()))?;
        ParamSchema::from_value(options).map_err(ApiError::Shape)
    }

    /// Creates a job and returns its id.
    pub async fn launch_job(&self, auth: &AuthSession, request: &LaunchRequest) -> ApiResult<i64> {
        tracing::info!(
            "Launching job {:?} (workspace {}, pce {}, module {})",
            request.job_name, request.workspace_id, request.pce_id, request.module_id
        );
        let launched: Launched = self
            .post(auth, endpoints::LAUNCH_JOB, &request.to_form())
            .await?
            .decode()?;
        Ok(launched.job_id)
    }

    // PCEs

    pub async fn all_pces(&self, auth: &AuthSession) -> ApiResult<Vec<Pce>> {
        self.get(auth, endpoints::PCES_ALL).await?.rows("pces")
    }

    pub async fn pce_modules(&self, auth: &AuthSession, pce_id: i64) -> ApiResult<Vec<Module>> {
        self.post(auth, endpoints::PCES_MODULES, &[("pce_id", pce_id)])
            .await?
            .rows("modules")
    }

    pub async fn pce_workspaces(&self, auth: &AuthSession, pce_id: i64) -> ApiResult<Vec<Workspace>> {
        self.post(auth, endpoints::PCES_WORKSPACES, &[("pce_id", pce_id)])
            .await?
            .rows("workspaces")
    }

    pub async fn pce_jobs(&self, auth: &AuthSession, pce_id: i64) -> ApiResult<Vec<Job>> {
        self.post(auth, endpoints::PCES_JOBS, &[("pce_id", pce_id)])
            .await?
            .rows("jobs")
    }

    pub async fn add_module_to_pce(&self, auth: &AuthSession, form: &ModuleForm) -> ApiResult<()> {
        tracing::info!("Adding module {} to PCE {}", form.module_id, form.pce_id);
        self.post(auth, endpoints::PCES_ADD_MODULE, form).await.map(|_| ())
    }

    /// Starts deploying a module already added to a PCE.
    pub async fn deploy_module(&self, auth: &AuthSession, pce_id: i64, module_id: i64) -> ApiResult<()> {
        tracing::info!("Deploying module {} on PCE {}", module_id, pce_id);
        self.post(auth, endpoints::PCES_DEPLOY_MODULE, &[("pce_id", pce_id), ("module_id", module_id)])
            .await
            .map(|_| ())
    }

    /// Deployment state of a module on a PCE, as a `module` object or a row of `modules`.
    pub async fn module_state(&self, auth: &AuthSession, pce_id: i64, module_id: i64) -> ApiResult<Module> {
        let envelope = self
            .post(auth, endpoints::PCES_MODULE_STATE, &[("pce_id", pce_id), ("module_id", module_id)])
            .await?;
        if envelope.get("module").is_some() {
            return envelope.value("module");
        }
        envelope
            .rows::<Module>("modules")?
            .into_iter()
            .find(|module| module.module_id == module_id)
            .ok_or_else(|| ApiError::Shape(format!("no state reported for module {}", module_id)))
    }

    pub async fn add_pce(&self, auth: &AuthSession, form: &PceForm) -> ApiResult<()> {
        let envelope = self.post(auth, endpoints::PCES_ADD, form).await?;
        // This endpoint answers a duplicate name with status 1 and an explanation
        let message = envelope.message();
        if envelope.get("status").and_then(Value::as_i64) == Some(1) && message != "Success" {
            return Err(ApiError::Validation(message));
        }
        Ok(())
    }
}
