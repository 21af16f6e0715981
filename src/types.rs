//! Normalized records shared by the message log, both adapters and storage.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Milliseconds since [`std::time::UNIX_EPOCH`]
pub type Timestamp = i64;

/// Content placeholder for binary payloads, which are never decoded for display.
pub const BINARY_PLACEHOLDER: &str = "[Binary Data]";

/// What a [`Message`] carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum MessageKind {
    Text,
    Binary,
    /// Lifecycle notice produced by an adapter, never user payload.
    Connection,
}

/// The subset of [`MessageKind`] a caller can send or save.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum PayloadKind {
    #[default]
    Text,
    Binary,
}

impl From<PayloadKind> for MessageKind {
    fn from(kind: PayloadKind) -> Self {
        match kind {
            PayloadKind::Text => Self::Text,
            PayloadKind::Binary => Self::Binary,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum Direction {
    Sent,
    Received,
    System,
}

/// Severity of a [`MessageKind::Connection`] entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// A single entry in the [`MessageLog`](crate::log::MessageLog).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub direction: Direction,
    pub timestamp: Timestamp,
    /// Only set for [`MessageKind::Connection`] entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    /// Socket.IO event name. Always `None` for raw WebSocket traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl Message {
    #[must_use]
    pub fn system<S: Into<String>>(level: Level, content: S) -> Self {
        Self {
            content: content.into(),
            kind: MessageKind::Connection,
            direction: Direction::System,
            timestamp: now(),
            level: Some(level),
            event: None,
        }
    }

    #[must_use]
    pub fn sent<S: Into<String>>(content: S, kind: PayloadKind, event: Option<String>) -> Self {
        Self {
            content: content.into(),
            kind: kind.into(),
            direction: Direction::Sent,
            timestamp: now(),
            level: None,
            event,
        }
    }

    #[must_use]
    pub fn received<S: Into<String>>(content: S, kind: PayloadKind, event: Option<String>) -> Self {
        Self {
            content: content.into(),
            kind: kind.into(),
            direction: Direction::Received,
            timestamp: now(),
            level: None,
            event,
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::Connection
    }
}

fn now() -> Timestamp {
    Utc::now().timestamp_millis()
}
