//! Error taxonomy for the credential exchange and the connection lifecycle.
//!
//! Two families matter to callers of [`crate::exchange::TokenExchangeClient`]:
//! [`TransportError`] (the round-trip itself failed) and [`FormatError`] (the
//! backend answered, but not with a usable credential). Both are terminal for
//! the current attempt and are folded into [`ExchangeError`].

use thiserror::Error;

/// The HTTP round-trip to the token endpoint failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A TCP-level connection could not be established, or the request timed out.
    #[error("request to {url} failed: {detail}")]
    Connect { url: String, detail: String },
    /// The backend replied with a non-2xx status code.
    #[error("backend returned {status}: {status_text}")]
    Http {
        status: u16,
        status_text: String,
        url: String,
    },
    /// The response body could not be read.
    #[error("failed to read response body from {url}: {detail}")]
    Body { url: String, detail: String },
    #[error("backend returned empty response from {url}")]
    EmptyBody { url: String },
}

impl TransportError {
    /// HTTP status code of the failed reply, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The backend answered but the credential could not be extracted or is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// None of the accepted credential keys carried a value.
    #[error("response carries no credential under any accepted key")]
    MissingCredential,
    /// The credential value is a structure that has no string form.
    #[error("token value is a {kind} and cannot be coerced to a string")]
    NotCoercible { kind: &'static str },
    /// The credential is not in compact signed-token form.
    #[error("invalid token format: expected 3 dot-separated segments, found {segments}")]
    MalformedToken { segments: usize },
}

/// Single rejected outcome of a credential exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("error fetching connection details: {0}")]
    Transport(#[from] TransportError),
    #[error("error fetching connection details: {0}")]
    Format(#[from] FormatError),
    /// The configured token endpoint could not be turned into a URL.
    #[error("invalid token endpoint '{endpoint}': {detail}")]
    InvalidEndpoint { endpoint: String, detail: String },
}

impl ExchangeError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ExchangeError::Transport(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ExchangeError::Format(_))
    }

    /// HTTP status carried by a non-2xx transport failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ExchangeError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// Outcome of a failed connect attempt.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    /// The real-time transport could not be opened with the issued credential.
    #[error("failed to open real-time transport to {url}: {detail}")]
    Transport { url: String, detail: String },
    /// A newer connect attempt or a disconnect overtook this attempt; its result was discarded.
    #[error("connect attempt superseded by a newer request")]
    Superseded,
}

/// Loading the on-disk configuration failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Failures talking to the auth/session collaborator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request to {url} failed: {detail}")]
    Connect { url: String, detail: String },
    /// The auth backend refused the request; `message` is the backend's own error text when it sent one.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("failed to decode auth response from {url}: {detail}")]
    Decode { url: String, detail: String },
    /// Input was refused before any request was sent.
    #[error("{0}")]
    Validation(String),
}
