//! Engine.IO v4 and Socket.IO v5 packet codec.
//!
//! Over the WebSocket transport every text frame is one Engine.IO packet: a single type digit
//! followed by its payload. Socket.IO packets ride inside Engine.IO `message` packets:
//!
//! ```text
//! <type>[<attachments>-][<namespace>,][<ack id>][<json data>]
//! ```
//!
//! Binary attachments follow their packet as separate binary frames, referenced from the JSON
//! data by `{"_placeholder":true,"num":n}` objects.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::SocketIoError;
use crate::Result;

/// Namespace used when the URL has no path.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Most binary attachments one packet may announce.
pub const MAX_ATTACHMENTS: usize = 64;

/// Event names the catch-all listener never reports.
const RESERVED_EVENTS: &[&str] = &[
    "connect",
    "connect_error",
    "disconnect",
    "disconnecting",
    "newListener",
    "removeListener",
];

/// Whether `name` belongs to the Socket.IO lifecycle rather than the application.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_EVENTS.contains(&name) || name.starts_with("reconnect")
}

/// Parameters the server sends in its Engine.IO `open` packet.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: u64,
}

impl Handshake {
    /// How long the client waits for the next ping before calling the connection dead.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or_else(|| invalid(frame))?;
        let body = chars.as_str();

        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(body)?),
            '1' => Self::Close,
            '2' => Self::Ping,
            '3' => Self::Pong,
            '4' => Self::Message(body.to_owned()),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            _ => return Err(invalid(frame)),
        })
    }

    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => {
                // Handshake only holds strings and integers.
                let body = serde_json::to_string(handshake).unwrap_or_default();
                format!("0{body}")
            }
            Self::Close => "1".to_owned(),
            Self::Ping => "2".to_owned(),
            Self::Pong => "3".to_owned(),
            Self::Message(body) => format!("4{body}"),
            Self::Upgrade => "5".to_owned(),
            Self::Noop => "6".to_owned(),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl PacketKind {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '0' => Self::Connect,
            '1' => Self::Disconnect,
            '2' => Self::Event,
            '3' => Self::Ack,
            '4' => Self::ConnectError,
            '5' => Self::BinaryEvent,
            '6' => Self::BinaryAck,
            _ => return None,
        })
    }

    const fn as_char(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }

    const fn is_binary(self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

/// A decoded Socket.IO packet.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: PacketKind,
    pub namespace: String,
    pub id: Option<u64>,
    /// Number of binary frames that follow this packet
    pub attachments: usize,
    pub data: Option<Value>,
}

impl Packet {
    fn new(kind: PacketKind, namespace: &str, data: Option<Value>) -> Self {
        Self {
            kind,
            namespace: namespace.to_owned(),
            id: None,
            attachments: 0,
            data,
        }
    }

    #[must_use]
    pub fn connect(namespace: &str) -> Self {
        Self::new(PacketKind::Connect, namespace, None)
    }

    #[must_use]
    pub fn disconnect(namespace: &str) -> Self {
        Self::new(PacketKind::Disconnect, namespace, None)
    }

    /// `EVENT` packet carrying `[name, ...args]`.
    #[must_use]
    pub fn event(namespace: &str, name: &str, args: Vec<Value>) -> Self {
        let mut data = Vec::with_capacity(args.len().saturating_add(1));
        data.push(Value::String(name.to_owned()));
        data.extend(args);
        Self::new(PacketKind::Event, namespace, Some(Value::Array(data)))
    }

    /// `BINARY_EVENT` packet whose single argument is attachment 0.
    #[must_use]
    pub fn binary_event(namespace: &str, name: &str) -> Self {
        let mut packet = Self::event(namespace, name, vec![placeholder(0)]);
        packet.kind = PacketKind::BinaryEvent;
        packet.attachments = 1;
        packet
    }

    pub fn decode(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .and_then(PacketKind::from_char)
            .ok_or_else(|| invalid(body))?;
        let mut rest = chars.as_str();

        let mut attachments = 0;
        if kind.is_binary() {
            let (count, tail) = rest.split_once('-').ok_or_else(|| invalid(body))?;
            attachments = count.parse().map_err(|_e| invalid(body))?;
            if attachments > MAX_ATTACHMENTS {
                return Err(invalid(body));
            }
            rest = tail;
        }

        let mut namespace = DEFAULT_NAMESPACE;
        if rest.starts_with('/') {
            let (nsp, tail) = rest.split_once(',').unwrap_or((rest, ""));
            namespace = nsp;
            rest = tail;
        }

        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (id, tail) = rest.split_at(digits);
        let id = if id.is_empty() {
            None
        } else {
            Some(id.parse().map_err(|_e| invalid(body))?)
        };

        let data = if tail.is_empty() {
            None
        } else {
            Some(serde_json::from_str(tail)?)
        };

        Ok(Self {
            kind,
            namespace: namespace.to_owned(),
            id,
            attachments,
            data,
        })
    }

    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());
        if self.kind.is_binary() {
            out.push_str(&self.attachments.to_string());
            out.push('-');
        }
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Full WebSocket text frame: the packet wrapped in an Engine.IO `message`.
    #[must_use]
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }

    /// Event name of an `EVENT` or `BINARY_EVENT` packet.
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        match self.kind {
            PacketKind::Event | PacketKind::BinaryEvent => self.data.as_ref()?.get(0)?.as_str(),
            _ => None,
        }
    }

    /// Arguments following the event name.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        match &self.data {
            Some(Value::Array(items)) if !items.is_empty() => items.get(1..).unwrap_or_default(),
            _ => &[],
        }
    }
}

/// Collects the binary frames announced by a binary packet.
#[derive(Debug)]
pub(crate) struct BinaryAssembly {
    packet: Packet,
    buffers: Vec<Vec<u8>>,
}

impl BinaryAssembly {
    pub fn new(packet: Packet) -> Self {
        Self {
            packet,
            buffers: Vec::new(),
        }
    }

    /// Add the next attachment; returns `true` once all have arrived.
    pub fn push(&mut self, buffer: Vec<u8>) -> bool {
        self.buffers.push(buffer);
        self.buffers.len() >= self.packet.attachments
    }

    /// Packet with each placeholder replaced by a description of its attachment.
    pub fn finish(mut self) -> Packet {
        if let Some(data) = self.packet.data.as_mut() {
            fill_placeholders(data, &self.buffers);
        }
        self.packet
    }
}

fn placeholder(num: usize) -> Value {
    json!({ "_placeholder": true, "num": num })
}

fn fill_placeholders(value: &mut Value, buffers: &[Vec<u8>]) {
    match value {
        Value::Object(map) if map.get("_placeholder") == Some(&Value::Bool(true)) => {
            let len = map
                .get("num")
                .and_then(Value::as_u64)
                .and_then(|num| usize::try_from(num).ok())
                .and_then(|num| buffers.get(num))
                .map(Vec::len);
            if let Some(len) = len {
                *value = Value::String(format!("[Binary Data] ({len} bytes)"));
            }
        }
        Value::Object(map) => map
            .values_mut()
            .for_each(|v| fill_placeholders(v, buffers)),
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| fill_placeholders(v, buffers)),
        _ => {}
    }
}

fn invalid(packet: &str) -> crate::error::Error {
    SocketIoError::InvalidPacket(packet.to_owned()).into()
}
