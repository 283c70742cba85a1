//! Credential request payload: one agent entry wrapped in a room configuration.
//!
//! ```json
//! { "room_config": { "agents": [ { "agent_name": "kora", "voice": "echo" } ] } }
//! ```

use serde::{Deserialize, Serialize};

use crate::options::{present, ConnectionOptions};

/// Agent entry sent to the backend.
///
/// Only the agent name is required. Absent options are omitted from the
/// serialized JSON body (never `null`, never `""`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub agents: Vec<AgentEntry>,
}

/// Body of both the token request and the settings notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub room_config: RoomConfig,
}

impl CredentialRequest {
    /// Snapshot the current options into a fresh request. Never fails.
    pub fn build(agent_name: &str, options: &ConnectionOptions) -> Self {
        let owned = |v: &Option<String>| present(v.as_deref()).map(str::to_string);
        let entry = AgentEntry {
            agent_name: agent_name.to_string(),
            voice: owned(&options.voice),
            personality: owned(&options.personality),
            language: owned(&options.language),
            user_name: owned(&options.display_name),
        };
        Self {
            room_config: RoomConfig {
                agents: vec![entry],
            },
        }
    }

    /// The single agent entry.
    pub fn agent(&self) -> Option<&AgentEntry> {
        self.room_config.agents.first()
    }
}
