//! Fire-and-forget "prepare agent" notification.
//!
//! The same payload that buys the credential is posted to a separate
//! settings endpoint so the backend can warm up the agent. The exchange never
//! waits on it: failures are logged and dropped.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::TransportError;
use crate::payload::CredentialRequest;

#[derive(Debug, Clone)]
pub struct SettingsNotifier {
    url: String,
    client: reqwest::Client,
}

impl SettingsNotifier {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        Self::new(config.settings_endpoint.clone(), client)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post the payload once. The response status is returned but carries no meaning.
    pub async fn send(&self, request: &CredentialRequest) -> Result<u16, TransportError> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connect {
                url: self.url.clone(),
                detail: e.to_string(),
            })?;
        Ok(resp.status().as_u16())
    }

    /// Spawn [`send`](Self::send) on the runtime and return immediately.
    ///
    /// Dropping the handle leaves the task running. One-shot callers that are
    /// about to exit can bound the wait with [`settle`].
    pub fn dispatch(&self, request: CredentialRequest) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            debug!(url = %notifier.url, "sending agent settings");
            match notifier.send(&request).await {
                Ok(status) => debug!(url = %notifier.url, status, "agent settings delivered"),
                Err(e) => warn!(error = %e, url = %notifier.url, "failed to send agent settings"),
            }
        })
    }
}

/// Wait up to `limit` for a dispatched notification to finish.
///
/// Returns `false` (and logs) when the task was still running and got cut off.
pub async fn settle(handle: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, handle).await {
        Ok(_) => true,
        Err(_) => {
            warn!(limit_ms = limit.as_millis() as u64, "agent settings notification still pending, giving up");
            false
        }
    }
}
