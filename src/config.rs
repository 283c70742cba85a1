//! Static application configuration: agent identity, endpoints, UI copy.
//!
//! Values come from an optional TOML file and are then overridden by
//! `AGENT_CONNECT_*` environment variables. Every field has a default, so an
//! empty file (or no file) yields a working local-development setup.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ExchangeError};

pub const DEFAULT_TOKEN_ENDPOINT: &str = "/api/connection-details";
pub const DEFAULT_SETTINGS_ENDPOINT: &str = "http://localhost:8080/setAgentConfig";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:3000/api/auth";
/// Origin used to resolve relative endpoints when no origin is configured.
pub const FALLBACK_ORIGIN: &str = "http://localhost:3000";
/// Server URL used when the token response names none.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:7880";
pub const DEFAULT_SIGNAL_PATH: &str = "/rtc";

pub const ENV_TOKEN_ENDPOINT: &str = "AGENT_CONNECT_TOKEN_ENDPOINT";
pub const ENV_SETTINGS_ENDPOINT: &str = "AGENT_CONNECT_SETTINGS_ENDPOINT";
pub const ENV_SANDBOX_ID: &str = "AGENT_CONNECT_SANDBOX_ID";
pub const ENV_AGENT_NAME: &str = "AGENT_CONNECT_AGENT_NAME";
pub const ENV_ORIGIN: &str = "AGENT_CONNECT_ORIGIN";
pub const ENV_AUTH_URL: &str = "AGENT_CONNECT_AUTH_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Agent identity sent as `agent_name` in every credential request.
    pub agent_name: String,
    /// Tenant identifier sent in the `X-Sandbox-Id` header.
    pub sandbox_id: String,
    /// Relative path or absolute URL of the token endpoint.
    pub token_endpoint: String,
    /// Absolute URL of the "prepare agent" notification endpoint.
    pub settings_endpoint: String,
    /// Base URL of the auth/session collaborator.
    pub auth_url: String,
    /// Origin that relative endpoints are resolved against.
    pub origin: Option<String>,
    pub default_server_url: String,
    /// Path appended to the server URL when opening the real-time transport.
    pub signal_path: String,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,

    pub company_name: String,
    pub page_title: String,
    pub start_button_text: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent_name: String::new(),
            sandbox_id: String::new(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            settings_endpoint: DEFAULT_SETTINGS_ENDPOINT.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            origin: None,
            default_server_url: DEFAULT_SERVER_URL.to_string(),
            signal_path: DEFAULT_SIGNAL_PATH.to_string(),
            connect_timeout_ms: None,
            request_timeout_ms: None,
            company_name: "LiveKit".to_string(),
            page_title: "Voice Agent".to_string(),
            start_button_text: "Start call".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_toml_str(&raw, &display)
    }

    /// Load from `path` when given (defaults otherwise), then apply environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from a key lookup. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(v) = get(ENV_TOKEN_ENDPOINT) {
            self.token_endpoint = v;
        }
        if let Some(v) = get(ENV_SETTINGS_ENDPOINT) {
            self.settings_endpoint = v;
        }
        if let Some(v) = get(ENV_SANDBOX_ID) {
            self.sandbox_id = v;
        }
        if let Some(v) = get(ENV_AGENT_NAME) {
            self.agent_name = v;
        }
        if let Some(v) = get(ENV_ORIGIN) {
            self.origin = Some(v);
        }
        if let Some(v) = get(ENV_AUTH_URL) {
            self.auth_url = v;
        }
    }

    /// Resolve the token endpoint to an absolute URL.
    ///
    /// Values starting with `http` are taken as absolute; anything else is
    /// joined onto `origin`, or [`FALLBACK_ORIGIN`] when no origin is set.
    pub fn resolve_token_url(&self) -> Result<Url, ExchangeError> {
        let endpoint = self.token_endpoint.trim();
        let invalid = |detail: String| ExchangeError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            detail,
        };
        if endpoint.starts_with("http") {
            return Url::parse(endpoint).map_err(|e| invalid(e.to_string()));
        }
        let origin = self.origin.as_deref().unwrap_or(FALLBACK_ORIGIN);
        let base = Url::parse(origin).map_err(|e| invalid(format!("origin '{origin}': {e}")))?;
        base.join(endpoint).map_err(|e| invalid(e.to_string()))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
