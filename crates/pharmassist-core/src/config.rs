use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::LangMode;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_CHAT_PATH: &str = "/chat/stream";
pub const HEALTH_PATH: &str = "/health";
pub const ENV_PREFIX: &str = "PHARMASSIST_";

/// Top-level config (pharmassist.toml + PHARMASSIST_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PharmAssistConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Where the chat server lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// TCP connect timeout. The streamed body itself has no deadline.
    pub connect_timeout_ms: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            connect_timeout_ms: None,
        }
    }
}

impl EndpointConfig {
    /// Full URL of the streaming chat endpoint.
    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn health_url(&self) -> String {
        join_url(&self.base_url, HEALTH_PATH)
    }
}

/// Client-side behaviour toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Render tool_call / tool_result events (hidden by default).
    #[serde(default)]
    pub show_tool_events: bool,
    /// Email or phone sent as `user_identifier` for prescription lookups.
    pub user_identifier: Option<String>,
    /// Omitted from requests when unset; the server then defaults to `auto`.
    pub lang_mode: Option<LangMode>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_chat_path() -> String {
    DEFAULT_CHAT_PATH.to_string()
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl PharmAssistConfig {
    /// Load config from a TOML file with PHARMASSIST_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.pharmassist/pharmassist.toml
    ///
    /// Nested keys use a double underscore in env vars, e.g.
    /// `PHARMASSIST_ENDPOINT__BASE_URL`. A missing file is not an error.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        tracing::debug!(path = %path, "loading config");

        let config: PharmAssistConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| crate::error::PharmAssistError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pharmassist/pharmassist.toml", home)
}
