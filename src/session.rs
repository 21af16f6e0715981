//! Session state owned by the [`ConnectionManager`](crate::manager::ConnectionManager).

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::log::MessageLog;
use crate::types::{Level, Message};

/// Wire protocol selected for a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[non_exhaustive]
pub enum Protocol {
    #[serde(rename = "websocket")]
    #[strum(serialize = "websocket")]
    WebSocket,
    #[serde(rename = "socketio")]
    #[strum(serialize = "socketio")]
    SocketIo,
}

impl Protocol {
    /// Pick a protocol from the URL scheme.
    ///
    /// This is a prefix check, not URL parsing: `ws://` and `wss://` select [`Protocol::WebSocket`]
    /// and everything else is handed to Socket.IO.
    #[must_use]
    pub fn detect(url: &str) -> Self {
        let url = url.trim_start();
        if url.starts_with("ws://") || url.starts_with("wss://") {
            Self::WebSocket
        } else {
            Self::SocketIo
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum Status {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    protocol: Option<Protocol>,
    status: Status,
    last_error: Option<String>,
}

impl Session {
    #[must_use]
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == Status::Connected
    }

    pub(crate) fn begin(&mut self, protocol: Protocol) {
        self.protocol = Some(protocol);
        self.status = Status::Connecting;
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        #[cfg(feature = "tracing")]
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "Session status changed");
        }
        self.status = status;
    }
}

/// Mutable view an adapter gets while it handles a call or a transport event.
pub(crate) struct Context<'a> {
    pub session: &'a mut Session,
    pub log: &'a mut MessageLog,
}

impl<'a> Context<'a> {
    pub fn new(session: &'a mut Session, log: &'a mut MessageLog) -> Self {
        Self { session, log }
    }

    pub fn info<S: Into<String>>(&mut self, content: S) {
        self.log.system(Level::Info, content);
    }

    pub fn success<S: Into<String>>(&mut self, content: S) {
        self.log.system(Level::Success, content);
    }

    pub fn warning<S: Into<String>>(&mut self, content: S) {
        self.log.system(Level::Warning, content);
    }

    pub fn error<S: Into<String>>(&mut self, content: S) {
        self.log.system(Level::Error, content);
    }

    pub fn append(&mut self, message: Message) {
        self.log.append(message);
    }

    pub fn connected(&mut self) {
        self.session.set_status(Status::Connected);
        self.session.last_error = None;
    }

    pub fn disconnected(&mut self) {
        self.session.set_status(Status::Disconnected);
    }

    pub fn set_error<S: Into<String>>(&mut self, error: S) {
        let error = error.into();
        #[cfg(feature = "tracing")]
        tracing::warn!(%error, "Session error");
        self.session.last_error = Some(error);
    }

    /// Record a connection-level failure: error state, disconnected, and an error entry.
    pub fn fail<E: Display, S: Into<String>>(&mut self, error: E, entry: S) {
        self.set_error(error.to_string());
        self.disconnected();
        self.error(entry);
    }

    /// Refuse a send before anything reaches the transport.
    pub fn reject(&mut self, reason: &str) {
        self.set_error(reason);
        self.error(format!("Failed to send message: {reason}"));
    }
}
