use backoff::ExponentialBackoff;
use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::{CancellationToken, DropGuard};
use url::Url;

use super::config::Config;
use super::error::SocketIoError;
use super::packet::{
    BinaryAssembly, DEFAULT_NAMESPACE, EnginePacket, Handshake, Packet, PacketKind, is_reserved,
};
use crate::Result;
use crate::transport::EventSender;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The only transport this client negotiates.
pub const TRANSPORT_NAME: &str = "websocket";

/// Why an established connection ended.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DisconnectReason {
    /// The server sent a namespace `DISCONNECT`
    #[strum(serialize = "io server disconnect")]
    ServerDisconnect,
    #[strum(serialize = "transport close")]
    TransportClose,
    #[strum(serialize = "transport error")]
    TransportError,
    /// No ping within `pingInterval + pingTimeout`
    #[strum(serialize = "ping timeout")]
    PingTimeout,
}

/// Lifecycle and traffic of one Socket.IO connection.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected {
        sid: String,
        transport: String,
    },
    ConnectError(String),
    Disconnected(DisconnectReason),
    /// Reconnection attempt `n` of the current cycle is starting
    ReconnectAttempt(u32),
    /// Connected again after `n` attempts
    Reconnected(u32),
    ReconnectError(String),
    /// Every attempt of the cycle failed
    ReconnectFailed,
    /// Application event caught by the catch-all listener
    Message {
        event: String,
        args: Vec<Value>,
    },
    /// An emit queued before the connection was lost never reached the server
    EmitDropped(String),
}

#[derive(Debug)]
pub(crate) enum Outgoing {
    Json(Value),
    Binary(Vec<u8>),
}

#[derive(Debug)]
pub(crate) enum Command {
    Emit { event: String, payload: Outgoing },
    /// Start a fresh connection cycle if the task is idle
    Reconnect,
}

/// Owning handle for a Socket.IO task. Dropping it disconnects.
#[derive(Debug)]
pub(crate) struct Connection {
    commands: mpsc::UnboundedSender<Command>,
    _shutdown: DropGuard,
}

impl Connection {
    /// Spawn the connection task; it connects right away.
    pub fn open(endpoint: Url, namespace: String, config: Config, events: EventSender) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = Task {
            endpoint,
            namespace,
            config,
            events,
            commands: commands_rx,
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run());

        Self {
            commands: commands_tx,
            _shutdown: cancel.drop_guard(),
        }
    }

    pub fn emit(&self, event: String, payload: Outgoing) -> Result<()> {
        self.command(Command::Emit { event, payload })
    }

    pub fn reconnect(&self) -> Result<()> {
        self.command(Command::Reconnect)
    }

    /// Send the namespace disconnect and close the socket. Nothing is reported afterwards.
    pub fn close(self) {
        drop(self);
    }

    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_e| SocketIoError::ConnectionClosed)?;
        Ok(())
    }

    /// Connection without a task, for exercising adapters in isolation.
    #[cfg(test)]
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let connection = Self {
            commands: commands_tx,
            _shutdown: CancellationToken::new().drop_guard(),
        };
        (connection, commands_rx)
    }
}

/// Map a user URL to the Engine.IO WebSocket endpoint and the namespace to join.
///
/// `http` becomes `ws` and `https` becomes `wss`; the URL path names the namespace and is
/// replaced by the Engine.IO `path`; user query parameters are kept.
pub fn resolve_endpoint(url: &str, path: &str) -> Result<(Url, String)> {
    let mut endpoint = Url::parse(url.trim())?;

    let scheme = match endpoint.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(SocketIoError::InvalidUrl(url.to_owned()).into()),
    };
    endpoint
        .set_scheme(scheme)
        .map_err(|()| SocketIoError::InvalidUrl(url.to_owned()))?;

    let namespace = match endpoint.path().trim_end_matches('/') {
        "" => DEFAULT_NAMESPACE.to_owned(),
        nsp => nsp.to_owned(),
    };

    endpoint.set_path(path);
    endpoint.set_fragment(None);
    endpoint
        .query_pairs_mut()
        .append_pair("EIO", "4")
        .append_pair("transport", TRANSPORT_NAME);

    Ok((endpoint, namespace))
}

struct Established {
    stream: WsStream,
    sid: String,
    handshake: Handshake,
}

enum Exit {
    /// The adapter let go of the handle
    Released,
    Lost(DisconnectReason),
}

struct Task {
    endpoint: Url,
    namespace: String,
    config: Config,
    events: EventSender,
    commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
}

impl Task {
    /// Connect, then alternate between serving the connection and waiting to be told to
    /// reconnect. A failed attempt starts a reconnection cycle capped at `max_attempts`.
    async fn run(mut self) {
        let mut backoff: ExponentialBackoff = self.config.reconnect.clone().into();
        let max_attempts = self.config.reconnect.max_attempts;
        // 0 is a plain connect, anything else is the reconnection attempt number.
        let mut attempt = 0_u32;

        loop {
            if attempt > 0 {
                let delay = backoff
                    .next_backoff()
                    .unwrap_or(self.config.reconnect.max_delay);
                tokio::select! {
                    () = self.cancel.cancelled() => return,
                    () = sleep(delay) => {}
                }
                if !self.events.emit(Event::ReconnectAttempt(attempt)) {
                    return;
                }
            }

            let result = tokio::select! {
                () = self.cancel.cancelled() => return,
                result = self.establish() => result,
            };

            match result {
                Ok(established) => {
                    let event = if attempt > 0 {
                        Event::Reconnected(attempt)
                    } else {
                        Event::Connected {
                            sid: established.sid.clone(),
                            transport: TRANSPORT_NAME.to_owned(),
                        }
                    };
                    attempt = 0;
                    backoff.reset();
                    if !self.events.emit(event) {
                        return;
                    }

                    match self.drive(established).await {
                        Exit::Released => return,
                        Exit::Lost(reason) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(%reason, "Socket.IO connection lost");
                            if !self.events.emit(Event::Disconnected(reason)) {
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(endpoint = %self.endpoint, attempt, "Unable to connect: {e:?}");
                    let reason = e.reason();
                    let event = if attempt > 0 {
                        Event::ReconnectError(reason)
                    } else {
                        Event::ConnectError(reason)
                    };
                    if !self.events.emit(event) {
                        return;
                    }

                    if self.config.reconnect.enabled && attempt < max_attempts {
                        attempt = attempt.saturating_add(1);
                        continue;
                    }
                    if attempt > 0 && !self.events.emit(Event::ReconnectFailed) {
                        return;
                    }
                    attempt = 0;
                    backoff.reset();
                }
            }

            if !self.wait_for_reconnect().await {
                return;
            }
        }
    }

    /// Park until a [`Command::Reconnect`] arrives. Returns `false` when released.
    async fn wait_for_reconnect(&mut self) -> bool {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return false,
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect) => return true,
                    Some(Command::Emit { event, .. }) => {
                        if !self.events.emit(Event::EmitDropped(event)) {
                            return false;
                        }
                    }
                    None => return false,
                },
            }
        }
    }

    async fn establish(&self) -> Result<Established> {
        timeout(self.config.timeout, self.open_session())
            .await
            .map_err(|_e| SocketIoError::Timeout)?
    }

    /// Engine.IO handshake followed by the namespace `CONNECT`.
    async fn open_session(&self) -> Result<Established> {
        let (mut stream, _) = connect_async(self.endpoint.as_str()).await?;

        let handshake = loop {
            if let EnginePacket::Open(handshake) = next_packet(&mut stream).await? {
                break handshake;
            }
        };

        stream
            .send(Message::Text(Packet::connect(&self.namespace).to_frame().into()))
            .await?;

        loop {
            match next_packet(&mut stream).await? {
                EnginePacket::Ping => {
                    stream
                        .send(Message::Text(EnginePacket::Pong.encode().into()))
                        .await?;
                }
                EnginePacket::Message(body) => {
                    let packet = Packet::decode(&body)?;
                    if packet.namespace != self.namespace {
                        continue;
                    }
                    match packet.kind {
                        PacketKind::Connect => {
                            let sid = packet
                                .data
                                .as_ref()
                                .and_then(|data| data.get("sid"))
                                .and_then(Value::as_str)
                                .unwrap_or(handshake.sid.as_str())
                                .to_owned();
                            return Ok(Established {
                                stream,
                                sid,
                                handshake,
                            });
                        }
                        PacketKind::ConnectError => {
                            let message = packet
                                .data
                                .as_ref()
                                .and_then(|data| {
                                    data.get("message")
                                        .and_then(Value::as_str)
                                        .or_else(|| data.as_str())
                                })
                                .unwrap_or("connect error")
                                .to_owned();
                            return Err(SocketIoError::ConnectRejected(message).into());
                        }
                        _ => {}
                    }
                }
                EnginePacket::Close => return Err(SocketIoError::HandshakeClosed.into()),
                _ => {}
            }
        }
    }

    /// Serve an established connection until it is lost or released.
    async fn drive(&mut self, established: Established) -> Exit {
        let Established {
            stream, handshake, ..
        } = established;
        let heartbeat = handshake.heartbeat_timeout();
        let (mut write, mut read) = stream.split();
        let mut deadline = Instant::now() + heartbeat;
        let mut pending: Option<BinaryAssembly> = None;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let goodbye = Packet::disconnect(&self.namespace).to_frame();
                    _ = write.send(Message::Text(goodbye.into())).await;
                    _ = write.close().await;
                    return Exit::Released;
                }

                () = sleep_until(deadline) => return Exit::Lost(DisconnectReason::PingTimeout),

                command = self.commands.recv() => match command {
                    Some(Command::Emit { event, payload }) => {
                        for frame in self.encode_emit(&event, payload) {
                            if write.send(frame).await.is_err() {
                                self.events.emit(Event::EmitDropped(event));
                                return Exit::Lost(DisconnectReason::TransportError);
                            }
                        }
                    }
                    Some(Command::Reconnect) => {}
                    None => return Exit::Released,
                },

                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => match EnginePacket::decode(text.as_str()) {
                        Ok(EnginePacket::Ping) => {
                            deadline = Instant::now() + heartbeat;
                            let pong = Message::Text(EnginePacket::Pong.encode().into());
                            if write.send(pong).await.is_err() {
                                return Exit::Lost(DisconnectReason::TransportError);
                            }
                        }
                        Ok(EnginePacket::Close) => return Exit::Lost(DisconnectReason::TransportClose),
                        Ok(EnginePacket::Message(body)) => {
                            if let Some(reason) = self.on_packet(&body, &mut pending) {
                                return Exit::Lost(reason);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(%text, error = %e, "Failed to parse Engine.IO packet");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                        }
                    },
                    Some(Ok(Message::Binary(data))) => {
                        if let Some(mut assembly) = pending.take() {
                            if assembly.push(data.to_vec()) {
                                self.deliver(assembly.finish());
                            } else {
                                pending = Some(assembly);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Exit::Lost(DisconnectReason::TransportClose);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %e, "Socket.IO transport error");
                        #[cfg(not(feature = "tracing"))]
                        let _ = &e;
                        return Exit::Lost(DisconnectReason::TransportError);
                    }
                },
            }
        }
    }

    /// Handle one Socket.IO packet; returns the reason if it ends the connection.
    fn on_packet(
        &self,
        body: &str,
        pending: &mut Option<BinaryAssembly>,
    ) -> Option<DisconnectReason> {
        let packet = match Packet::decode(body) {
            Ok(packet) => packet,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%body, error = %e, "Failed to parse Socket.IO packet");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                return None;
            }
        };

        if packet.namespace != self.namespace {
            return None;
        }

        match packet.kind {
            PacketKind::Disconnect => Some(DisconnectReason::ServerDisconnect),
            PacketKind::BinaryEvent if packet.attachments > 0 => {
                *pending = Some(BinaryAssembly::new(packet));
                None
            }
            PacketKind::Event | PacketKind::BinaryEvent => {
                self.deliver(packet);
                None
            }
            _ => None,
        }
    }

    /// Report an application event, skipping the reserved lifecycle names.
    fn deliver(&self, packet: Packet) {
        let Some(event) = packet.event_name() else {
            return;
        };
        if is_reserved(event) {
            return;
        }
        self.events.emit(Event::Message {
            event: event.to_owned(),
            args: packet.args().to_vec(),
        });
    }

    fn encode_emit(&self, event: &str, payload: Outgoing) -> Vec<Message> {
        match payload {
            Outgoing::Json(value) => {
                let packet = Packet::event(&self.namespace, event, vec![value]);
                vec![Message::Text(packet.to_frame().into())]
            }
            Outgoing::Binary(bytes) => {
                let packet = Packet::binary_event(&self.namespace, event);
                vec![
                    Message::Text(packet.to_frame().into()),
                    Message::Binary(bytes.into()),
                ]
            }
        }
    }
}

async fn next_packet(stream: &mut WsStream) -> Result<EnginePacket> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return EnginePacket::decode(text.as_str()),
            Some(Ok(Message::Close(_))) | None => {
                return Err(SocketIoError::HandshakeClosed.into());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}
