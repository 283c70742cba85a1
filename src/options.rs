//! User-selected connection options and the stored settings that seed them.

use serde::{Deserialize, Serialize};

/// Options the user picks before connecting. Every field is optional; an
/// absent (or empty) option is left out of the credential request entirely
/// so the backend applies its own default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    pub display_name: Option<String>,
    pub voice: Option<String>,
    pub personality: Option<String>,
    pub language: Option<String>,
}

/// Per-user settings stored by the auth backend. Unknown keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConnectionOptions {
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = Some(personality.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Fill options that are still unset from stored user settings.
    /// Explicit selections always win.
    pub fn seed_from(&mut self, settings: &UserSettings) {
        fill(&mut self.voice, &settings.voice);
        fill(&mut self.personality, &settings.personality);
        fill(&mut self.language, &settings.language);
    }
}

fn fill(slot: &mut Option<String>, source: &Option<String>) {
    if present(slot.as_deref()).is_none() {
        if let Some(v) = present(source.as_deref()) {
            *slot = Some(v.to_string());
        }
    }
}

/// `Some` only for a non-empty value. Empty strings count as "not chosen".
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
