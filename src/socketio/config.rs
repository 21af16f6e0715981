#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use bon::Builder;

const DEFAULT_PATH: &str = "/socket.io/";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_millis(5000);
const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Policy for Socket.IO connections.
///
/// The transport is always WebSocket (no long-polling fallback), every connect builds a fresh
/// handle, and connecting only starts when the adapter asks for it.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Engine.IO endpoint path on the server
    #[builder(default = DEFAULT_PATH.to_owned(), into)]
    pub path: String,
    /// Maximum time for the transport handshake plus the namespace connect
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub timeout: Duration,
    #[builder(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// One-line summary logged before connecting.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "transports: [websocket], reconnection: {}, reconnectionAttempts: {}, \
             reconnectionDelay: {}ms, timeout: {}ms, forceNew: true, autoConnect: false",
            self.reconnect.enabled,
            self.reconnect.max_attempts,
            self.reconnect.delay.as_millis(),
            self.timeout.as_millis(),
        )
    }
}

/// Configuration for automatic reconnection after a failed connection attempt.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct ReconnectConfig {
    #[builder(default = true)]
    pub enabled: bool,
    /// Attempts per reconnection cycle before giving up.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Delay before the first attempt; later attempts back off exponentially.
    #[builder(default = DEFAULT_RECONNECT_DELAY)]
    pub delay: Duration,
    #[builder(default = DEFAULT_MAX_RECONNECT_DELAY)]
    pub max_delay: Duration,
    /// Jitter applied to each delay, between 0 and 1
    #[builder(default = DEFAULT_RANDOMIZATION_FACTOR)]
    pub randomization_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<ReconnectConfig> for ExponentialBackoff {
    fn from(config: ReconnectConfig) -> Self {
        ExponentialBackoffBuilder::default()
            .with_initial_interval(config.delay)
            .with_max_interval(config.max_delay)
            .with_multiplier(BACKOFF_MULTIPLIER)
            .with_randomization_factor(config.randomization_factor)
            .with_max_elapsed_time(None) // Attempts are capped separately
            .build()
    }
}
