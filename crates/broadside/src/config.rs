//! Client configuration.

use std::time::Duration;

use broadside_match::MatchConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Everything the client needs to know before it starts.
///
/// All fields have defaults, so a config file only lists what it changes:
///
/// ```rust
/// use broadside::ClientConfig;
///
/// let config = ClientConfig::default().with_server_url("ws://game.example:18080/ws");
/// assert_eq!(config.server_url, "ws://game.example:18080/ws");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the match server.
    pub server_url: String,

    /// Upper bound on the opening handshake.
    pub connect_timeout: Duration,

    /// PING interval while connected. Zero disables the heartbeat.
    pub heartbeat_interval: Duration,

    /// Upper bound on the random delay before a silent reconnect.
    /// Zero reconnects immediately.
    pub reconnect_jitter: Duration,

    /// Capacity of the handle → client intent queue.
    pub intent_channel_capacity: usize,

    /// Turn, end-screen and notice timing.
    pub match_config: MatchConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:18080/ws".to_string(),
            connect_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(10),
            reconnect_jitter: Duration::from_millis(250),
            intent_channel_capacity: 64,
            match_config: MatchConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Shortest connect timeout accepted.
    pub const MIN_CONNECT_TIMEOUT: Duration = Duration::from_millis(100);

    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn with_reconnect_jitter(mut self, jitter: Duration) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    #[must_use]
    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`Client::start`](crate::Client::start).
    pub fn validated(mut self) -> Self {
        if self.connect_timeout < Self::MIN_CONNECT_TIMEOUT {
            warn!(
                timeout_ms = self.connect_timeout.as_millis() as u64,
                "connect_timeout below minimum, clamping"
            );
            self.connect_timeout = Self::MIN_CONNECT_TIMEOUT;
        }
        if self.intent_channel_capacity == 0 {
            warn!("intent_channel_capacity is 0, using 1");
            self.intent_channel_capacity = 1;
        }
        self.match_config = self.match_config.validated();
        self
    }
}
