use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
    pub upload: UploadConfig,
    // Module slug -> parameter family, e.g. "mpi-ring" -> "ring"
    #[serde(default = "default_families")]
    pub families: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub csrf_header: String,
    pub csrf_cookie: String,
    pub session_cookie: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
    // Header the browser must echo the CSRF token in for unsafe methods
    pub csrf_header: String,
    // Sessions and their page state expire after this much inactivity
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_body_size: usize,
}

fn default_idle_timeout() -> u64 {
    3600
}

fn default_families() -> HashMap<String, String> {
    HashMap::from([
        ("mpi-ring".to_string(), "ring".to_string()),
        ("template".to_string(), "hello".to_string()),
    ])
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
impl Config {
    /// Configuration pointing the upstream client at `base_url`, used by tests.
    pub fn for_upstream(base_url: &str) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                static_dir: "static".into(),
            },
            upstream: UpstreamConfig {
                base_url: base_url.into(),
                timeout_secs: 5,
                csrf_header: "X-CSRFToken".into(),
                csrf_cookie: "csrftoken".into(),
                session_cookie: "sessionid".into(),
            },
            session: SessionConfig {
                cookie_name: "onramp_session".into(),
                secure: false,
                csrf_header: "X-CSRFToken".into(),
                idle_timeout_secs: default_idle_timeout(),
            },
            upload: UploadConfig { max_body_size: 1024 * 1024 },
            families: default_families(),
        }
    }
}
