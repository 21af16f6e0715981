#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// Socket.IO error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum SocketIoError {
    /// Handshake plus namespace connect took longer than the configured timeout
    Timeout,
    /// The server answered the namespace connect with `CONNECT_ERROR`
    ConnectRejected(String),
    /// The transport closed before the handshake finished
    HandshakeClosed,
    /// A packet could not be decoded
    InvalidPacket(String),
    /// The URL cannot be mapped to an Engine.IO endpoint
    InvalidUrl(String),
    /// The connection task is no longer running
    ConnectionClosed,
}

impl fmt::Display for SocketIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectRejected(message) => write!(f, "{message}"),
            Self::HandshakeClosed => write!(f, "transport closed during handshake"),
            Self::InvalidPacket(packet) => write!(f, "invalid packet: {packet}"),
            Self::InvalidUrl(url) => write!(f, "invalid Socket.IO URL: {url}"),
            Self::ConnectionClosed => write!(f, "Socket.IO connection closed"),
        }
    }
}

impl StdError for SocketIoError {}

impl From<SocketIoError> for crate::error::Error {
    fn from(e: SocketIoError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::SocketIo, e)
    }
}
