//! Plumbing between transport tasks and the manager's event loop.
//!
//! Every live handle runs in its own tokio task. Tasks never touch session state: they push
//! [`TransportEvent`]s tagged with their [`HandleId`] into one channel, and the
//! [`ConnectionManager`](crate::manager::ConnectionManager) applies them in arrival order, dropping
//! anything produced by a handle that is no longer active.

use std::fmt;

use tokio::sync::mpsc;

use crate::{socketio, ws};

/// Identity of one transport handle. Never reused within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    WebSocket(ws::Event),
    SocketIo(socketio::Event),
}

impl From<ws::Event> for TransportEvent {
    fn from(event: ws::Event) -> Self {
        Self::WebSocket(event)
    }
}

impl From<socketio::Event> for TransportEvent {
    fn from(event: socketio::Event) -> Self {
        Self::SocketIo(event)
    }
}

#[derive(Debug)]
pub(crate) struct Envelope {
    pub handle: HandleId,
    pub event: TransportEvent,
}

/// Sending half given to a transport task; stamps every event with the task's handle.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    handle: HandleId,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSender {
    pub fn new(handle: HandleId, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { handle, tx }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Returns `false` once the manager is gone, which tells the task to stop.
    pub fn emit<E: Into<TransportEvent>>(&self, event: E) -> bool {
        self.tx
            .send(Envelope {
                handle: self.handle,
                event: event.into(),
            })
            .is_ok()
    }
}
