use std::time::Duration;

use bon::Builder;

use crate::socketio;

/// Configuration for a [`ConnectionManager`](crate::manager::ConnectionManager).
///
/// ```
/// use std::time::Duration;
///
/// use socket_probe::config::Config;
///
/// let config = Config::builder()
///     .websocket_timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(config.socketio.reconnect.max_attempts, 3);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default, Builder)]
pub struct Config {
    /// Policy applied to every Socket.IO connection.
    #[builder(default)]
    pub socketio: socketio::Config,
    /// Upper bound on the raw WebSocket handshake. `None` leaves it to the transport.
    pub websocket_timeout: Option<Duration>,
}
