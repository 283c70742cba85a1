//! Client for the auth/session collaborator.
//!
//! The connection core only needs this to seed option defaults from the
//! signed-in user's stored settings. The backend keeps the session in a
//! cookie, so the HTTP client carries a cookie store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::options::UserSettings;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    #[serde(default)]
    pub settings: Option<UserSettings>,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

/// Check a registration form before anything is sent.
pub fn validate_registration(
    email: &str,
    password: &str,
    confirm: &str,
    name: &str,
) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
        return Err(AuthError::Validation("Missing required fields".into()));
    }
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Settings from a login reply: the `settings` member when present, else the body itself.
fn settings_from_login(body: Value) -> Option<UserSettings> {
    let mut candidate = match body {
        Value::Object(mut map) => match map.remove("settings") {
            Some(Value::Null) | None => Value::Object(map),
            Some(settings) => settings,
        },
        _ => return None,
    };
    if let Value::Object(map) = &mut candidate {
        map.remove("user");
        if map.is_empty() {
            return None;
        }
    }
    serde_json::from_value(candidate).ok()
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Current session, or `None` when not signed in (401).
    pub async fn session(&self) -> Result<Option<AuthSession>, AuthError> {
        let url = self.url("session");
        let resp = self.client.get(&url).send().await.map_err(|e| AuthError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!(url = %url, "not signed in");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(rejection(resp, "Session check failed").await);
        }
        resp.json::<AuthSession>()
            .await
            .map(Some)
            .map_err(|e| AuthError::Decode {
                url,
                detail: e.to_string(),
            })
    }

    /// Sign in and return the user's stored settings, if any.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<UserSettings>, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Missing email or password".into()));
        }
        let url = self.url("login");
        let resp = self
            .client
            .post(&url)
            .json(&LoginBody { email, password })
            .send()
            .await
            .map_err(|e| AuthError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(rejection(resp, "Login failed").await);
        }
        let body: Value = resp.json().await.map_err(|e| AuthError::Decode {
            url,
            detail: e.to_string(),
        })?;
        Ok(settings_from_login(body))
    }

    /// Create an account, then sign in with it.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<UserSettings>, AuthError> {
        validate_registration(email, password, password, name)?;
        let url = self.url("register");
        let resp = self
            .client
            .post(&url)
            .json(&RegisterBody { email, password, name })
            .send()
            .await
            .map_err(|e| AuthError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(rejection(resp, "Registration failed").await);
        }
        self.login(email, password).await
    }

    /// End the session. Failures are logged; the local cookie is dropped either way.
    pub async fn logout(&self) {
        let url = self.url("logout");
        if let Err(e) = self.client.post(&url).send().await {
            warn!(error = %e, url = %url, "logout request failed");
        }
    }
}

/// Turn a non-2xx reply into `AuthError::Rejected`, preferring the backend's `error` text.
async fn rejection(resp: reqwest::Response, fallback: &str) -> AuthError {
    let status = resp.status().as_u16();
    let message = resp
        .json::<Value>()
        .await
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    AuthError::Rejected { status, message }
}
