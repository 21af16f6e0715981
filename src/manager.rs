//! The connection manager: one entry point over both protocols.
//!
//! The manager owns the session, the message log and at most one active adapter. Calls such as
//! [`ConnectionManager::connect`] return immediately; everything the transport reports afterwards
//! arrives on an internal channel and is applied by [`ConnectionManager::process_next_event`] or
//! [`ConnectionManager::process_pending_events`], always on the caller's task.

use tokio::sync::mpsc;

use crate::config::Config;
use crate::log::MessageLog;
use crate::session::{Context, Protocol, Session, Status};
use crate::socketio::SocketIoAdapter;
use crate::transport::{Envelope, EventSender, HandleId, TransportEvent};
use crate::types::{Message, PayloadKind};
use crate::ws::WebSocketAdapter;
use crate::ws::adapter::NOT_CONNECTED;

/// The adapter behind the active session.
#[derive(Debug)]
enum Adapter {
    WebSocket(WebSocketAdapter),
    SocketIo(SocketIoAdapter),
}

impl Adapter {
    fn handle(&self) -> HandleId {
        match self {
            Self::WebSocket(adapter) => adapter.handle(),
            Self::SocketIo(adapter) => adapter.handle(),
        }
    }
}

/// Unified client for raw WebSocket and Socket.IO endpoints.
///
/// ```no_run
/// use socket_probe::ConnectionManager;
/// use socket_probe::types::PayloadKind;
///
/// # async fn run() {
/// let mut manager = ConnectionManager::default();
/// manager.connect("wss://echo.example.com");
///
/// while !manager.is_connected() && manager.error().is_none() {
///     manager.process_next_event().await;
/// }
/// manager.send_message("hello", PayloadKind::Text, None);
/// # }
/// ```
///
/// Dropping the manager releases the active handle and stops its task.
#[derive(Debug)]
pub struct ConnectionManager {
    config: Config,
    session: Session,
    log: MessageLog,
    adapter: Option<Adapter>,
    events_tx: mpsc::UnboundedSender<Envelope>,
    events_rx: mpsc::UnboundedReceiver<Envelope>,
    next_handle: u64,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ConnectionManager {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            session: Session::default(),
            log: MessageLog::new(),
            adapter: None,
            events_tx,
            events_rx,
            next_handle: 0,
        }
    }

    /// Open a session for `url`.
    ///
    /// `ws://` and `wss://` URLs use a raw WebSocket; anything else is treated as Socket.IO. A
    /// handle left over from the previous session is released first. Failures never surface as
    /// errors here: they show up in [`error`](Self::error) and the message log.
    ///
    /// Must be called within a tokio runtime.
    pub fn connect(&mut self, url: &str) {
        self.release();

        let protocol = Protocol::detect(url);
        self.session.begin(protocol);
        let events = self.next_sender();

        #[cfg(feature = "tracing")]
        tracing::debug!(%url, %protocol, handle = %events.handle(), "Connecting");

        let mut ctx = Context::new(&mut self.session, &mut self.log);
        let adapter = match protocol {
            Protocol::WebSocket => Adapter::WebSocket(WebSocketAdapter::open(
                url,
                self.config.websocket_timeout,
                events,
                &mut ctx,
            )),
            Protocol::SocketIo => Adapter::SocketIo(SocketIoAdapter::open(
                url,
                &self.config.socketio,
                events,
                &mut ctx,
            )),
        };
        self.adapter = Some(adapter);
    }

    /// Close the active session. Does nothing when there is none.
    pub fn disconnect(&mut self) {
        let Some(mut adapter) = self.adapter.take() else {
            return;
        };

        self.session.set_status(Status::Disconnecting);
        let mut ctx = Context::new(&mut self.session, &mut self.log);
        match &mut adapter {
            Adapter::WebSocket(adapter) => adapter.close(&mut ctx),
            Adapter::SocketIo(adapter) => adapter.close(&mut ctx),
        }
    }

    /// Send through the active adapter. `event` names the Socket.IO event and is ignored for raw
    /// WebSocket sessions.
    pub fn send_message(&mut self, content: &str, kind: PayloadKind, event: Option<&str>) {
        let mut ctx = Context::new(&mut self.session, &mut self.log);
        match &mut self.adapter {
            Some(Adapter::WebSocket(adapter)) => adapter.send(content, kind, &mut ctx),
            Some(Adapter::SocketIo(adapter)) => adapter.send(content, kind, event, &mut ctx),
            None => ctx.reject(NOT_CONNECTED),
        }
    }

    pub fn clear_messages(&mut self) {
        self.log.clear();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.log.all()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.session.last_error()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.session.status()
    }

    #[must_use]
    pub fn protocol(&self) -> Option<Protocol> {
        self.session.protocol()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wait for the next transport event and apply it.
    ///
    /// Returns `false` when the event came from a handle that is no longer active and was
    /// discarded. Waits forever while no handle is running, so callers usually wrap this in a
    /// timeout or a `select!`.
    pub async fn process_next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(envelope) => self.dispatch(envelope),
            None => false,
        }
    }

    /// Apply every event already queued without waiting. Returns how many were applied.
    pub fn process_pending_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(envelope) = self.events_rx.try_recv() {
            if self.dispatch(envelope) {
                applied += 1;
            }
        }
        applied
    }

    fn dispatch(&mut self, envelope: Envelope) -> bool {
        let Envelope { handle, event } = envelope;

        let Some(adapter) = self
            .adapter
            .as_mut()
            .filter(|adapter| adapter.handle() == handle)
        else {
            #[cfg(feature = "tracing")]
            tracing::trace!(%handle, ?event, "Discarding event from released handle");
            return false;
        };

        let mut ctx = Context::new(&mut self.session, &mut self.log);
        match (adapter, event) {
            (Adapter::WebSocket(adapter), TransportEvent::WebSocket(event)) => {
                adapter.handle_event(event, &mut ctx);
            }
            (Adapter::SocketIo(adapter), TransportEvent::SocketIo(event)) => {
                adapter.handle_event(event, &mut ctx);
            }
            (_, event) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%handle, ?event, "Event does not match the active protocol");
                #[cfg(not(feature = "tracing"))]
                let _ = &event;
                return false;
            }
        }
        true
    }

    fn next_sender(&mut self) -> EventSender {
        self.next_handle += 1;
        EventSender::new(HandleId::new(self.next_handle), self.events_tx.clone())
    }

    /// Drop the active handle without logging; its task stops and its queued events go stale.
    fn release(&mut self) {
        if let Some(adapter) = self.adapter.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(handle = %adapter.handle(), "Releasing previous handle");
            drop(adapter);
        }
    }
}
