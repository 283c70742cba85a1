//! Normalization of the backend's token response into a session credential.
//!
//! The token endpoint is loosely specified: it may answer with a JSON object
//! whose credential and endpoint live under one of several alias keys, or with
//! the bare token as plain text. [`RawTokenResponse`] captures the two shapes;
//! [`RawTokenResponse::normalize`] resolves the aliases in a fixed order and
//! enforces the compact-token invariant.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FormatError;

/// Accepted credential keys, in lookup order. First present key wins.
pub const TOKEN_KEYS: [&str; 4] = ["token", "participantToken", "accessToken", "participant_token"];
/// Accepted server endpoint keys, in lookup order. First present key wins.
pub const ENDPOINT_KEYS: [&str; 4] = ["wsUrl", "serverUrl", "url", "server_url"];

/// Tokens up to this length are previewed fully masked.
const SHORT_TOKEN_LEN: usize = 40;

/// Body of a successful token response, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTokenResponse {
    JsonObject(Map<String, Value>),
    /// Bare token text (also used for a JSON string body).
    PlainString(String),
}

impl RawTokenResponse {
    /// Classify a response body. Text that is not JSON is taken as the token itself.
    ///
    /// JSON numbers and booleans become their textual form; `null` and arrays
    /// carry no credential keys and classify as an empty object.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => RawTokenResponse::JsonObject(map),
            Ok(Value::String(s)) => RawTokenResponse::PlainString(s),
            Ok(v @ (Value::Number(_) | Value::Bool(_))) => RawTokenResponse::PlainString(v.to_string()),
            Ok(Value::Null | Value::Array(_)) => RawTokenResponse::JsonObject(Map::new()),
            Err(_) => RawTokenResponse::PlainString(text.to_string()),
        }
    }

    pub fn encoding(&self) -> &'static str {
        match self {
            RawTokenResponse::JsonObject(_) => "json",
            RawTokenResponse::PlainString(_) => "plain",
        }
    }

    fn credential_value(&self) -> Result<String, FormatError> {
        let map = match self {
            RawTokenResponse::PlainString(s) => return Ok(s.clone()),
            RawTokenResponse::JsonObject(map) => map,
        };
        for key in TOKEN_KEYS {
            if let Some(value) = map.get(key) {
                if let Some(s) = coerce(value)? {
                    return Ok(s);
                }
            }
        }
        Err(FormatError::MissingCredential)
    }

    fn endpoint(&self) -> Option<&str> {
        let RawTokenResponse::JsonObject(map) = self else {
            return None;
        };
        ENDPOINT_KEYS
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|url| !url.is_empty())
    }

    /// Extract, trim and validate the credential, filling in `default_server_url`
    /// when the response names no endpoint.
    pub fn normalize(&self, default_server_url: &str) -> Result<SessionCredential, FormatError> {
        let raw = self.credential_value()?;
        let token = trim_token(&raw);
        validate_compact(token)?;
        let server_url = self.endpoint().unwrap_or(default_server_url).to_string();
        Ok(SessionCredential {
            participant_token: token.to_string(),
            server_url,
        })
    }
}

/// String form of a credential value. `Ok(None)` means "treat as missing".
///
/// Falsy values (`null`, `""`, `0`, `false`) count as missing so the next alias is tried.
fn coerce(value: &Value) -> Result<Option<String>, FormatError> {
    match value {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) => Err(FormatError::NotCoercible { kind: "array" }),
        Value::Object(_) => Err(FormatError::NotCoercible { kind: "object" }),
    }
}

/// Strip surrounding whitespace and one layer of double quotes.
fn trim_token(raw: &str) -> &str {
    let t = raw.trim();
    t.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(t)
}

/// Structural check only: exactly three dot-separated segments.
/// Signatures and expiry are not inspected.
pub fn validate_compact(token: &str) -> Result<(), FormatError> {
    if token.is_empty() {
        return Err(FormatError::MalformedToken { segments: 0 });
    }
    match token.split('.').count() {
        3 => Ok(()),
        segments => Err(FormatError::MalformedToken { segments }),
    }
}

/// Log-safe preview of a credential.
///
/// Short tokens (40 chars or fewer) have every character but the last four
/// masked; longer ones show the first 16 and last 8 characters.
pub fn mask_preview(token: &str) -> String {
    let chars: Vec<char> = token.trim().chars().collect();
    let n = chars.len();
    if n <= SHORT_TOKEN_LEN {
        let keep_from = n.saturating_sub(4);
        return chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i < keep_from { '*' } else { *c })
            .collect();
    }
    let first: String = chars[..16].iter().collect();
    let last: String = chars[n - 8..].iter().collect();
    format!("{first}...{last}")
}

/// A validated credential plus the server it is valid for.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredential {
    pub participant_token: String,
    pub server_url: String,
}

impl SessionCredential {
    pub fn preview(&self) -> String {
        mask_preview(&self.participant_token)
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("participant_token", &self.preview())
            .field("server_url", &self.server_url)
            .finish()
    }
}
