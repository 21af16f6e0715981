#![expect(
    clippy::module_name_repetitions,
    reason = "Adapter types carry their protocol in the name"
)]

use std::time::Duration;

use super::connection::{Connection, Event, Frame};
use crate::session::Context;
use crate::transport::{EventSender, HandleId};
use crate::types::{BINARY_PLACEHOLDER, Message, PayloadKind};

pub(crate) const NOT_CONNECTED: &str = "Not connected to server";

/// Translates one raw socket's lifecycle into log entries and session state.
#[derive(Debug)]
pub struct WebSocketAdapter {
    handle: HandleId,
    connection: Option<Connection>,
}

impl WebSocketAdapter {
    pub(crate) fn open(
        url: &str,
        handshake_timeout: Option<Duration>,
        events: EventSender,
        ctx: &mut Context<'_>,
    ) -> Self {
        ctx.info(format!("Connecting to {url}..."));
        let handle = events.handle();
        let connection = Connection::open(url.to_owned(), handshake_timeout, events);

        Self {
            handle,
            connection: Some(connection),
        }
    }

    pub(crate) fn handle(&self) -> HandleId {
        self.handle
    }

    pub(crate) fn handle_event(&mut self, event: Event, ctx: &mut Context<'_>) {
        match event {
            Event::Open => {
                ctx.connected();
                ctx.success("Connection established successfully");
            }
            Event::Close {
                code,
                reason,
                clean,
            } => {
                ctx.disconnected();
                self.connection = None;

                let mut text = format!(
                    "Connection closed{} with code {code}",
                    if clean { " cleanly" } else { "" }
                );
                if !reason.is_empty() {
                    text.push_str(": ");
                    text.push_str(&reason);
                }

                if clean {
                    ctx.info(text);
                } else {
                    ctx.warning(text);
                }
            }
            Event::Error(detail) => {
                ctx.fail(
                    format!("WebSocket error occurred: {detail}"),
                    format!("Connection error occurred: {detail}"),
                );
            }
            Event::Text(text) => {
                ctx.append(Message::received(text, PayloadKind::Text, None));
            }
            Event::Binary(data) => {
                ctx.info(format!("Received binary message ({} bytes)", data.len()));
                ctx.append(Message::received(
                    BINARY_PLACEHOLDER,
                    PayloadKind::Binary,
                    None,
                ));
            }
        }
    }

    pub(crate) fn send(&mut self, content: &str, kind: PayloadKind, ctx: &mut Context<'_>) {
        let Some(connection) = self.connection.as_ref().filter(|_| ctx.session.is_connected())
        else {
            ctx.reject(NOT_CONNECTED);
            return;
        };

        let result = match kind {
            PayloadKind::Binary => {
                let bytes = content.as_bytes().to_vec();
                let len = bytes.len();
                connection
                    .send(Frame::Binary(bytes))
                    .inspect(|()| ctx.info(format!("Sent binary message ({len} bytes)")))
            }
            PayloadKind::Text => connection.send(Frame::Text(content.to_owned())),
        };

        match result {
            Ok(()) => ctx.append(Message::sent(content, kind, None)),
            Err(e) => {
                let reason = e.reason();
                ctx.fail(&reason, format!("Failed to send message: {reason}"));
            }
        }
    }

    pub(crate) fn close(&mut self, ctx: &mut Context<'_>) {
        ctx.info("Disconnecting...");
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        ctx.disconnected();
    }
}
