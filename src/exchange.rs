//! Token exchange: POST the credential request, normalize whatever comes back.
//!
//! The round-trip is all-or-nothing. A non-2xx status, an empty body or an
//! unusable credential rejects the whole exchange; nothing is retried.

use std::future::Future;

use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::credential::{RawTokenResponse, SessionCredential};
use crate::error::{ExchangeError, TransportError};
use crate::notify::SettingsNotifier;
use crate::payload::CredentialRequest;

/// Header carrying the tenant/sandbox identifier.
pub const SANDBOX_HEADER: &str = "X-Sandbox-Id";

/// Anything that can trade a credential request for a session credential.
pub trait CredentialSource: Send + Sync + 'static {
    fn request_credential(
        &self,
        request: CredentialRequest,
    ) -> impl Future<Output = Result<SessionCredential, ExchangeError>> + Send;
}

/// HTTP client for the token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    token_url: Url,
    sandbox_id: String,
    default_server_url: String,
    client: reqwest::Client,
    notifier: Option<SettingsNotifier>,
}

impl TokenExchangeClient {
    /// Build a client from configuration, with a fresh HTTP client.
    pub fn from_config(config: &AppConfig) -> Result<Self, ExchangeError> {
        Self::with_client(config, build_http_client(config))
    }

    /// Build a client that shares an existing HTTP client.
    pub fn with_client(config: &AppConfig, client: reqwest::Client) -> Result<Self, ExchangeError> {
        Ok(Self {
            token_url: config.resolve_token_url()?,
            sandbox_id: config.sandbox_id.clone(),
            default_server_url: config.default_server_url.clone(),
            client,
            notifier: None,
        })
    }

    /// Attach the settings notifier dispatched after every successful exchange.
    pub fn with_notifier(mut self, notifier: SettingsNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Perform one credential exchange.
    ///
    /// # Returns
    /// - `Ok(SessionCredential)` on a 2xx reply carrying a compact token.
    /// - `Err(ExchangeError::Transport)` on connection failure, non-2xx status or empty body.
    /// - `Err(ExchangeError::Format)` when no well-formed credential can be extracted.
    pub async fn exchange(&self, request: &CredentialRequest) -> Result<SessionCredential, ExchangeError> {
        self.exchange_tracked(request).await.map(|(credential, _)| credential)
    }

    /// Like [`exchange`](Self::exchange), but also hands back the settings
    /// notification task when one was dispatched.
    ///
    /// Short-lived callers can wait on it with [`notify::settle`](crate::notify::settle)
    /// before the runtime shuts down.
    pub async fn exchange_tracked(
        &self,
        request: &CredentialRequest,
    ) -> Result<(SessionCredential, Option<JoinHandle<()>>), ExchangeError> {
        let url = self.token_url.to_string();
        debug!(
            url = %url,
            payload = %serde_json::to_string(request).unwrap_or_default(),
            "sending credential request"
        );

        let resp = self
            .client
            .post(self.token_url.clone())
            .header(SANDBOX_HEADER, &self.sandbox_id)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "token endpoint rejected request");
            return Err(TransportError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                url,
            }
            .into());
        }

        // Read as text: the body is either a JSON document or the bare token.
        let text = resp.text().await.map_err(|e| TransportError::Body {
            url: url.clone(),
            detail: e.to_string(),
        })?;
        if text.is_empty() {
            return Err(TransportError::EmptyBody { url }.into());
        }

        let raw = RawTokenResponse::parse(&text);
        debug!(encoding = raw.encoding(), bytes = text.len(), "token response received");

        let credential = raw.normalize(&self.default_server_url).map_err(|e| {
            warn!(error = %e, encoding = raw.encoding(), "token response is not a usable credential");
            e
        })?;

        info!(
            token_length = credential.participant_token.len(),
            token_preview = %credential.preview(),
            server_url = %credential.server_url,
            "credential issued"
        );

        let notification = self
            .notifier
            .as_ref()
            .map(|notifier| notifier.dispatch(request.clone()));

        Ok((credential, notification))
    }
}

impl CredentialSource for TokenExchangeClient {
    fn request_credential(
        &self,
        request: CredentialRequest,
    ) -> impl Future<Output = Result<SessionCredential, ExchangeError>> + Send {
        async move { self.exchange(&request).await }
    }
}

/// reqwest client honoring the configured timeouts. No request timeout unless configured.
pub fn build_http_client(config: &AppConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(t) = config.connect_timeout() {
        builder = builder.connect_timeout(t);
    }
    if let Some(t) = config.request_timeout() {
        builder = builder.timeout(t);
    }
    builder.build().unwrap_or_default()
}
