use std::time::Duration;

use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::error::WsError;
use crate::Result;
use crate::transport::EventSender;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the connection ends without a closing handshake.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when the peer's close frame carried no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Lifecycle and traffic of one raw socket, in the order the task observed it.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Handshake completed
    Open,
    Text(String),
    Binary(Vec<u8>),
    /// Transport failure. Always followed by an unclean [`Event::Close`].
    Error(String),
    Close {
        code: u16,
        reason: String,
        /// Whether the closing handshake completed
        clean: bool,
    },
}

impl Event {
    fn abnormal_close() -> Self {
        Self::Close {
            code: ABNORMAL_CLOSURE,
            reason: String::new(),
            clean: false,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Owning handle for a socket task. Dropping it closes the socket.
#[derive(Debug)]
pub(crate) struct Connection {
    frames: mpsc::UnboundedSender<Frame>,
    _shutdown: DropGuard,
}

impl Connection {
    /// Spawn the socket task. Progress is reported through `events`.
    pub fn open(url: String, handshake_timeout: Option<Duration>, events: EventSender) -> Self {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            run(url, handshake_timeout, frames_rx, events, task_cancel).await;
        });

        Self {
            frames: frames_tx,
            _shutdown: cancel.drop_guard(),
        }
    }

    /// Queue a frame for the socket task.
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.frames
            .send(frame)
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Start a graceful close. Nothing is reported for this handle afterwards.
    pub fn close(self) {
        drop(self);
    }
}

async fn handshake(url: &str, limit: Option<Duration>) -> Result<WsStream> {
    let connecting = connect_async(url);
    let (stream, _) = match limit {
        Some(limit) => timeout(limit, connecting)
            .await
            .map_err(|_e| WsError::Timeout)??,
        None => connecting.await?,
    };
    Ok(stream)
}

async fn run(
    url: String,
    handshake_timeout: Option<Duration>,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    events: EventSender,
    cancel: CancellationToken,
) {
    let stream = tokio::select! {
        () = cancel.cancelled() => return,
        result = handshake(&url, handshake_timeout) => result,
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(%url, handle = %events.handle(), "Unable to connect: {e:?}");
            events.emit(Event::Error(e.reason()));
            events.emit(Event::abnormal_close());
            return;
        }
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(%url, handle = %events.handle(), "WebSocket connected");
    if !events.emit(Event::Open) {
        return;
    }

    let (mut write, mut read) = stream.split();

    let close = loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: Utf8Bytes::from_static(""),
                };
                _ = write.send(Message::Close(Some(frame))).await;
                return;
            }

            Some(frame) = frames.recv() => {
                let message = match frame {
                    Frame::Text(text) => Message::Text(text.into()),
                    Frame::Binary(bytes) => Message::Binary(bytes.into()),
                };
                if let Err(e) = write.send(message).await {
                    events.emit(Event::Error(e.to_string()));
                    break Event::abnormal_close();
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(%text, "Received WebSocket text message");
                        if !events.emit(Event::Text(text.as_str().to_owned())) {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        if !events.emit(Event::Binary(data.to_vec())) {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        // Push out the close reply tungstenite queued for us.
                        _ = write.flush().await;
                        break match frame {
                            Some(frame) => Event::Close {
                                code: frame.code.into(),
                                reason: frame.reason.as_str().to_owned(),
                                clean: true,
                            },
                            None => Event::Close {
                                code: NO_STATUS_RECEIVED,
                                reason: String::new(),
                                clean: true,
                            },
                        };
                    }
                    Some(Ok(_)) => {
                        // Ping/pong is answered by tungstenite itself.
                    }
                    Some(Err(e)) => {
                        events.emit(Event::Error(e.to_string()));
                        break Event::abnormal_close();
                    }
                    None => break Event::abnormal_close(),
                }
            }
        }
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(handle = %events.handle(), ?close, "WebSocket closed");
    events.emit(close);
}
