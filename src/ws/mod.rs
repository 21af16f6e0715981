//! Raw WebSocket protocol adapter.
//!
//! - [`WebSocketAdapter`]: maps one socket's lifecycle to log entries and session state
//! - [`Event`]: what the socket task reports back to the manager
//!
//! Frames are passed through untouched: text frames are logged verbatim, binary frames are
//! logged by size with a placeholder as content.

pub mod adapter;
pub mod connection;
pub mod error;

pub use adapter::WebSocketAdapter;
pub use connection::Event;
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
