//! Socket.IO v5 client over the Engine.IO v4 WebSocket transport.
//!
//! Only the `websocket` transport is negotiated; there is no long-polling fallback. A connection
//! joins the namespace named by the URL path, forwards every application event to the
//! [`ConnectionManager`](crate::ConnectionManager) and retries failed connects with exponential
//! backoff according to [`ReconnectConfig`].
//!
//! ```text
//! ws://host/socket.io/?EIO=4&transport=websocket
//!   <- 0{"sid":"..","pingInterval":25000,"pingTimeout":20000,..}
//!   -> 40
//!   <- 40{"sid":".."}
//!   -> 42["event",{"a":1}]
//! ```

pub mod adapter;
pub mod config;
pub mod connection;
pub mod error;
pub mod packet;

pub use adapter::SocketIoAdapter;
pub use config::{Config, ReconnectConfig};
pub use connection::{DisconnectReason, Event};
pub use error::SocketIoError;
