//! Interactive terminal client for WebSocket and Socket.IO endpoints.
//!
//! Lines starting with `/` are commands; anything else is sent as a text message. The URL history
//! and saved messages persist in `socket-probe.json` (override with `SOCKET_PROBE_STATE`).
//!
//! ```sh
//! RUST_LOG=info cargo run --example repl --features tracing
//! ```
//!
//! Commands:
//! - `/connect <url>`: `ws://` or `wss://` for raw WebSocket, anything else for Socket.IO
//! - `/disconnect`
//! - `/binary <text>`: send the UTF-8 bytes of `text` as a binary message
//! - `/emit <event> <content>`: emit a Socket.IO event; JSON content is sent as JSON
//! - `/save`: save the last sent message
//! - `/saved`, `/resend <n>`, `/forget <n>`
//! - `/history`, `/unlist <url>`
//! - `/hex <text>`: show a hex dump
//! - `/clear`, `/status`, `/quit`

use std::env;
use std::sync::Arc;

use socket_probe::ConnectionManager;
use socket_probe::format::{hex_dump, pretty_print_json};
use socket_probe::storage::{FileStore, SavedMessage, SavedMessages, Store, UrlHistory};
use socket_probe::types::{Direction, Message, MessageKind, PayloadKind};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const STATE_VAR: &str = "SOCKET_PROBE_STATE";
const DEFAULT_STATE_FILE: &str = "socket-probe.json";

struct Repl {
    manager: ConnectionManager,
    history: UrlHistory,
    saved: SavedMessages,
    rendered: usize,
}

impl Repl {
    /// Returns `false` when the user asked to quit.
    async fn execute(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        let Some(command) = line.strip_prefix('/') else {
            self.manager.send_message(line, PayloadKind::Text, None);
            return true;
        };

        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        let rest = rest.trim();
        match name {
            "connect" => self.connect(rest).await,
            "disconnect" => self.manager.disconnect(),
            "binary" => self.manager.send_message(rest, PayloadKind::Binary, None),
            "emit" => {
                let (event, content) = rest.split_once(' ').unwrap_or((rest, ""));
                self.manager
                    .send_message(content.trim(), PayloadKind::Text, Some(event));
            }
            "save" => self.save_last_sent().await,
            "saved" => self.list_saved(),
            "resend" => self.resend(rest),
            "forget" => self.forget(rest).await,
            "history" => {
                for (i, url) in self.history.urls().iter().enumerate() {
                    info!("{i}: {url}");
                }
            }
            "unlist" => match self.history.remove(rest).await {
                Ok(true) => info!("Removed {rest} from history"),
                Ok(false) => warn!("{rest} is not in the history"),
                Err(e) => error!("Unable to update history: {e}"),
            },
            "hex" => info!("\n{}", hex_dump(rest)),
            "clear" => {
                self.manager.clear_messages();
                self.rendered = 0;
            }
            "status" => info!(
                status = %self.manager.status(),
                protocol = ?self.manager.protocol(),
                error = ?self.manager.error(),
                "Session"
            ),
            "quit" | "exit" => return false,
            _ => warn!("Unknown command /{name}"),
        }
        true
    }

    async fn connect(&mut self, url: &str) {
        if let Err(e) = self.history.record(url).await {
            warn!("Unable to record {url}: {e}");
        }
        self.manager.connect(url);
    }

    async fn save_last_sent(&mut self) {
        let Some(last) = self
            .manager
            .messages()
            .iter()
            .rev()
            .find(|m| m.direction == Direction::Sent)
        else {
            warn!("Nothing sent yet");
            return;
        };

        let kind = if last.kind == MessageKind::Binary {
            PayloadKind::Binary
        } else {
            PayloadKind::Text
        };
        let message = SavedMessage::new(last.content.clone(), kind, last.event.clone());
        match self.saved.save(message).await {
            Ok(true) => info!("Saved"),
            Ok(false) => info!("Already saved"),
            Err(e) => error!("Unable to persist saved messages: {e}"),
        }
    }

    fn list_saved(&self) {
        for (i, message) in self.saved.messages().iter().enumerate() {
            match &message.event {
                Some(event) => info!("{i}: [{}] {event}: {}", message.kind, message.content),
                None => info!("{i}: [{}] {}", message.kind, message.content),
            }
        }
    }

    fn resend(&mut self, index: &str) {
        let Some(message) = index
            .parse::<usize>()
            .ok()
            .and_then(|i| self.saved.messages().get(i))
        else {
            warn!("No saved message {index}");
            return;
        };

        self.manager
            .send_message(&message.content, message.kind, message.event.as_deref());
    }

    async fn forget(&mut self, index: &str) {
        let Ok(index) = index.parse::<usize>() else {
            warn!("Expected an index, got {index}");
            return;
        };
        match self.saved.remove(index).await {
            Ok(Some(message)) => info!("Forgot {}", message.content),
            Ok(None) => warn!("No saved message {index}"),
            Err(e) => error!("Unable to persist saved messages: {e}"),
        }
    }

    /// Print log entries appended since the last call.
    fn render(&mut self) {
        let messages = self.manager.messages();
        if messages.len() < self.rendered {
            self.rendered = 0;
        }
        for message in &messages[self.rendered..] {
            render_message(message);
        }
        self.rendered = messages.len();
    }
}

fn render_message(message: &Message) {
    let content = match message.kind {
        MessageKind::Text => {
            pretty_print_json(&message.content).unwrap_or_else(|| message.content.clone())
        }
        _ => message.content.clone(),
    };
    let event = message
        .event
        .as_deref()
        .map(|event| format!(" {event}:"))
        .unwrap_or_default();

    match message.level {
        Some(level) => info!(%level, "{content}"),
        None => info!(direction = %message.direction, kind = %message.kind, "{event} {content}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_e| "info".into()))
        .init();

    let path = env::var(STATE_VAR).unwrap_or_else(|_e| DEFAULT_STATE_FILE.to_owned());
    let store: Arc<dyn Store> = Arc::new(FileStore::new(path));

    let mut repl = Repl {
        manager: ConnectionManager::default(),
        history: UrlHistory::load(Arc::clone(&store)).await,
        saved: SavedMessages::load(store).await,
        rendered: 0,
    };
    info!("Type /connect <url> to start, /quit to leave");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !repl.execute(&line).await {
                    break;
                }
            }
            _applied = repl.manager.process_next_event() => {}
        }
        repl.render();
    }

    repl.manager.disconnect();
    repl.render();
    Ok(())
}
