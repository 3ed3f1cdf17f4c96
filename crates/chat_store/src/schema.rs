use serde::{Deserialize, Serialize};

pub const HISTORY_VERSION: u32 = 1;

/// Author of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One committed conversation turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Set when generation was cut short by the user before the model
    /// finished. Informational only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl Turn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            interrupted: false,
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            interrupted: false,
        }
    }

    #[must_use]
    pub fn assistant_interrupted(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            interrupted: true,
        }
    }
}

/// Persisted history document, the sole value stored under the history key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDocument {
    pub version: u32,
    pub saved_at: String,
    pub turns: Vec<Turn>,
}

impl HistoryDocument {
    #[must_use]
    pub fn v1(saved_at: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            version: HISTORY_VERSION,
            saved_at: saved_at.into(),
            turns,
        }
    }
}
