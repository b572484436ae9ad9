use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8000";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120; // max silence between two upstream reads
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Top-level config (cyberchat.toml + CYBERCHAT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CyberchatConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// The backend inference API the gateway proxies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:8000`.
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Abort a relayed stream when the upstream stays silent this long.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl UpstreamConfig {
    /// Join `path` onto the base URL, tolerating a trailing slash on either side.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Settings for the terminal client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Where the gateway listens, e.g. `http://127.0.0.1:3000`.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default)]
    pub finalize: FinalizeMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            finalize: FinalizeMode::default(),
        }
    }
}

/// How a finished stream session is folded into the transcript.
///
/// `Legacy` keeps the older chat UI behaviour of appending the streamed
/// buffer twice when no step messages were produced; `Single` appends it once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalizeMode {
    #[default]
    Single,
    Legacy,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}
fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}
fn default_gateway_url() -> String {
    format!("http://{}:{}", DEFAULT_BIND, DEFAULT_PORT)
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cyberchat/cyberchat.db", home)
}

impl CyberchatConfig {
    /// Load config from a TOML file with CYBERCHAT_* env var overrides.
    ///
    /// The file is optional: a missing file yields the defaults plus
    /// whatever the environment sets. Nested keys use a double underscore,
    /// e.g. `CYBERCHAT_UPSTREAM__BASE_URL`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CyberchatConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CYBERCHAT_").split("__"))
            .extract()
            .map_err(|e| crate::error::CyberchatError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cyberchat/cyberchat.toml", home)
}
