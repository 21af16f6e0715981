#![expect(
    clippy::module_name_repetitions,
    reason = "Adapter types carry their protocol in the name"
)]

use serde_json::Value;

use super::config::Config;
use super::connection::{Connection, DisconnectReason, Event, Outgoing, resolve_endpoint};
use crate::session::Context;
use crate::transport::{EventSender, HandleId};
use crate::types::{Message, PayloadKind};
use crate::ws::adapter::NOT_CONNECTED;

const EVENT_REQUIRED: &str = "Event name is required for Socket.IO messages";

/// Translates one Socket.IO connection's lifecycle into log entries and session state.
#[derive(Debug)]
pub struct SocketIoAdapter {
    handle: HandleId,
    max_attempts: u32,
    connection: Option<Connection>,
}

impl SocketIoAdapter {
    pub(crate) fn open(
        url: &str,
        config: &Config,
        events: EventSender,
        ctx: &mut Context<'_>,
    ) -> Self {
        ctx.info(format!(
            "Connecting to {url} with options: {}",
            config.describe()
        ));

        let handle = events.handle();
        let connection = match resolve_endpoint(url, &config.path) {
            Ok((endpoint, namespace)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%endpoint, %namespace, %handle, "Opening Socket.IO connection");
                Some(Connection::open(endpoint, namespace, config.clone(), events))
            }
            Err(e) => {
                let reason = e.reason();
                ctx.fail(&reason, format!("Connection error: {reason}"));
                None
            }
        };

        Self {
            handle,
            max_attempts: config.reconnect.max_attempts,
            connection,
        }
    }

    pub(crate) fn handle(&self) -> HandleId {
        self.handle
    }

    pub(crate) fn handle_event(&mut self, event: Event, ctx: &mut Context<'_>) {
        match event {
            Event::Connected { sid, transport } => {
                ctx.connected();
                ctx.success(format!(
                    "Connected to Socket.IO server (id: {sid}, transport: {transport})"
                ));
            }
            Event::ConnectError(reason) => {
                ctx.fail(&reason, format!("Connection error: {reason}"));
            }
            Event::Disconnected(reason) => {
                ctx.disconnected();
                ctx.warning(format!("Disconnected: {reason}"));
                if reason == DisconnectReason::ServerDisconnect {
                    self.reconnect(ctx);
                }
            }
            Event::ReconnectAttempt(attempt) => {
                ctx.info(format!(
                    "Reconnection attempt {attempt}/{}",
                    self.max_attempts
                ));
            }
            Event::Reconnected(attempts) => {
                ctx.connected();
                ctx.success(format!("Reconnected after {attempts} attempt(s)"));
            }
            Event::ReconnectError(reason) => {
                ctx.error(format!("Reconnection error: {reason}"));
            }
            Event::ReconnectFailed => {
                let text = format!("Failed to reconnect after {} attempts", self.max_attempts);
                ctx.set_error(text.clone());
                ctx.error(text);
            }
            Event::Message { event, args } => {
                let content = display_argument(args.first());
                ctx.append(Message::received(content, PayloadKind::Text, Some(event)));
            }
            Event::EmitDropped(event) => {
                ctx.reject(&format!("Connection lost before \"{event}\" was delivered"));
            }
        }
    }

    fn reconnect(&self, ctx: &mut Context<'_>) {
        ctx.info("Server initiated disconnect, attempting to reconnect...");
        let result = match &self.connection {
            Some(connection) => connection.reconnect(),
            None => return,
        };
        if let Err(e) = result {
            let reason = e.reason();
            ctx.fail(&reason, format!("Connection error: {reason}"));
        }
    }

    pub(crate) fn send(
        &mut self,
        content: &str,
        kind: PayloadKind,
        event: Option<&str>,
        ctx: &mut Context<'_>,
    ) {
        let Some(connection) = self
            .connection
            .as_ref()
            .filter(|_| ctx.session.is_connected())
        else {
            ctx.reject(NOT_CONNECTED);
            return;
        };
        let Some(event) = event.map(str::trim).filter(|e| !e.is_empty()) else {
            ctx.reject(EVENT_REQUIRED);
            return;
        };

        let payload = match kind {
            PayloadKind::Binary => Outgoing::Binary(content.as_bytes().to_vec()),
            PayloadKind::Text => Outgoing::Json(
                serde_json::from_str(content).unwrap_or_else(|_e| Value::String(content.to_owned())),
            ),
        };

        if let Err(e) = connection.emit(event.to_owned(), payload) {
            let reason = e.reason();
            ctx.fail(&reason, format!("Failed to send message: {reason}"));
            return;
        }

        ctx.append(Message::sent(content, kind, Some(event.to_owned())));
        ctx.info(format!("Emitted event \"{event}\""));
    }

    pub(crate) fn close(&mut self, ctx: &mut Context<'_>) {
        ctx.info("Disconnecting...");
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        ctx.disconnected();
    }

    #[cfg(test)]
    fn detached(
        max_attempts: u32,
    ) -> (
        Self,
        tokio::sync::mpsc::UnboundedReceiver<super::connection::Command>,
    ) {
        let (connection, commands) = Connection::detached();
        let adapter = Self {
            handle: HandleId::new(1),
            max_attempts,
            connection: Some(connection),
        };
        (adapter, commands)
    }
}

/// Text shown for an event's first argument: JSON structures pretty-printed, strings verbatim.
fn display_argument(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(value @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_e| value.to_string())
        }
        Some(value) => value.to_string(),
    }
}
