#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests, and https://github.com/rust-lang/rust-clippy/issues/13981"
)]
#![allow(
    unused,
    reason = "Each test binary uses a different subset of these helpers"
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt as _, StreamExt as _};
use serde_json::json;
use socket_probe::ConnectionManager;
use socket_probe::types::{Level, Message};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// Something the test asks the server to do on every open connection.
#[derive(Debug, Clone)]
pub enum Action {
    Send(Frame),
    Close { code: u16, reason: String },
    /// Drop the socket without a closing handshake
    Drop,
}

/// Mock raw WebSocket server.
pub struct MockWsServer {
    addr: SocketAddr,
    /// Broadcast actions to ALL connected clients
    action_tx: broadcast::Sender<Action>,
    /// Frames received from clients
    frame_rx: mpsc::UnboundedReceiver<Frame>,
}

impl MockWsServer {
    /// Start a server on a random port.
    pub async fn start() -> Self {
        Self::start_with_greeting(None).await
    }

    /// Start a server that sends `greeting` as a text frame right after each handshake.
    pub async fn start_with_greeting(greeting: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (action_tx, _) = broadcast::channel::<Action>(100);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<Frame>();
        let broadcast_tx = action_tx.clone();
        let greeting = greeting.map(str::to_owned);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };

                let (mut write, mut read) = ws_stream.split();
                let frame_tx = frame_tx.clone();
                let mut action_rx = broadcast_tx.subscribe();
                let greeting = greeting.clone();

                tokio::spawn(async move {
                    if let Some(greeting) = greeting {
                        if write.send(Frame::Text(greeting.into())).await.is_err() {
                            return;
                        }
                    }

                    loop {
                        tokio::select! {
                            msg = read.next() => match msg {
                                Some(Ok(frame @ (Frame::Text(_) | Frame::Binary(_)))) => {
                                    drop(frame_tx.send(frame));
                                }
                                Some(Ok(Frame::Close(_))) | None | Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            },
                            action = action_rx.recv() => match action {
                                Ok(Action::Send(frame)) => {
                                    if write.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(Action::Close { code, reason }) => {
                                    let frame = CloseFrame {
                                        code: CloseCode::from(code),
                                        reason: reason.into(),
                                    };
                                    drop(write.send(Frame::Close(Some(frame))).await);
                                    // Wait for the client's reply so the handshake completes.
                                    while let Some(Ok(msg)) = read.next().await {
                                        if msg.is_close() {
                                            break;
                                        }
                                    }
                                    break;
                                }
                                Ok(Action::Drop) | Err(_) => break,
                            },
                        }
                    }
                });
            }
        });

        Self {
            addr,
            action_tx,
            frame_rx,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn act(&self, action: Action) {
        drop(self.action_tx.send(action));
    }

    pub fn send_text(&self, text: &str) {
        self.act(Action::Send(Frame::Text(text.into())));
    }

    /// Next frame a client sent.
    pub async fn recv(&mut self) -> Option<Frame> {
        timeout(Duration::from_secs(2), self.frame_rx.recv())
            .await
            .ok()
            .flatten()
    }
}

/// How the mock Socket.IO server answers.
#[derive(Debug, Clone)]
pub struct SocketIoOptions {
    pub ping_interval: u64,
    pub ping_timeout: u64,
    /// Answer namespace connects with `CONNECT_ERROR` carrying this message.
    pub reject: Option<String>,
    /// With `reject` set, accept every connection after the first `n`.
    pub accept_after: Option<usize>,
}

impl Default for SocketIoOptions {
    fn default() -> Self {
        Self {
            ping_interval: 25_000,
            ping_timeout: 20_000,
            reject: None,
            accept_after: None,
        }
    }
}

/// Mock Socket.IO server speaking Engine.IO v4 over WebSocket, default namespace only.
pub struct MockSocketIoServer {
    addr: SocketAddr,
    action_tx: broadcast::Sender<Action>,
    frame_rx: mpsc::UnboundedReceiver<Frame>,
    connections: Arc<AtomicUsize>,
}

impl MockSocketIoServer {
    pub async fn start() -> Self {
        Self::start_with(SocketIoOptions::default()).await
    }

    pub async fn start_with(options: SocketIoOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (action_tx, _) = broadcast::channel::<Action>(100);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<Frame>();
        let connections = Arc::new(AtomicUsize::new(0));

        let broadcast_tx = action_tx.clone();
        let counter = Arc::clone(&connections);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };

                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let (mut write, mut read) = ws_stream.split();
                let frame_tx = frame_tx.clone();
                let options = options.clone();
                // Subscribe before the handshake so no action sent after connect is missed.
                let mut action_rx = broadcast_tx.subscribe();

                tokio::spawn(async move {
                    let open = json!({
                        "sid": format!("eio-{n}"),
                        "upgrades": [],
                        "pingInterval": options.ping_interval,
                        "pingTimeout": options.ping_timeout,
                        "maxPayload": 1_000_000
                    });
                    if write.send(Frame::Text(format!("0{open}").into())).await.is_err() {
                        return;
                    }

                    // Namespace connect
                    loop {
                        match read.next().await {
                            Some(Ok(Frame::Text(text))) if text.as_str().starts_with("40") => break,
                            Some(Ok(_)) => {}
                            _ => return,
                        }
                    }
                    let rejection = match (options.reject, options.accept_after) {
                        (Some(_), Some(accepted_after)) if n > accepted_after => None,
                        (reject, _) => reject,
                    };
                    let reply = match &rejection {
                        Some(message) => format!("44{}", json!({ "message": message })),
                        None => format!("40{}", json!({ "sid": format!("socket-{n}") })),
                    };
                    if write.send(Frame::Text(reply.into())).await.is_err() {
                        return;
                    }
                    if rejection.is_some() {
                        drop(write.close().await);
                        return;
                    }

                    loop {
                        tokio::select! {
                            msg = read.next() => match msg {
                                Some(Ok(frame @ (Frame::Text(_) | Frame::Binary(_)))) => {
                                    drop(frame_tx.send(frame));
                                }
                                Some(Ok(Frame::Close(_))) | None | Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            },
                            action = action_rx.recv() => match action {
                                Ok(Action::Send(frame)) => {
                                    if write.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(Action::Close { .. } | Action::Drop) | Err(_) => break,
                            },
                        }
                    }
                });
            }
        });

        Self {
            addr,
            action_tx,
            frame_rx,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Completed WebSocket handshakes so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn act(&self, action: Action) {
        drop(self.action_tx.send(action));
    }

    /// Send a raw Engine.IO text frame, e.g. `2` for ping or `41` for a namespace disconnect.
    pub fn send_frame(&self, frame: &str) {
        self.act(Action::Send(Frame::Text(frame.into())));
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        timeout(Duration::from_secs(2), self.frame_rx.recv())
            .await
            .ok()
            .flatten()
    }
}

/// Apply manager events until `done` holds. Panics after five seconds.
pub async fn pump_until<F>(manager: &mut ConnectionManager, mut done: F)
where
    F: FnMut(&ConnectionManager) -> bool,
{
    let reached = timeout(Duration::from_secs(5), async {
        while !done(manager) {
            manager.process_next_event().await;
        }
    })
    .await;

    assert!(
        reached.is_ok(),
        "condition not reached; log: {:#?}",
        manager.messages()
    );
}

/// Apply whatever arrives within `window`.
pub async fn pump_for(manager: &mut ConnectionManager, window: Duration) {
    drop(
        timeout(window, async {
            loop {
                manager.process_next_event().await;
            }
        })
        .await,
    );
}

/// Whether the log holds a connection entry with `level` and exactly `content`.
pub fn has_entry(messages: &[Message], level: Level, content: &str) -> bool {
    messages
        .iter()
        .any(|m| m.level == Some(level) && m.content == content)
}
