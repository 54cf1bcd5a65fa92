//! Match timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Timing knobs for one match.
///
/// ```rust
/// use std::time::Duration;
/// use broadside_match::MatchConfig;
///
/// let config = MatchConfig::default()
///     .with_fallback_turn_window(Duration::from_millis(800))
///     .validated();
/// assert_eq!(config.fallback_turn_window, Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// How long to wait for an explicit `YOUR_TURN` after
    /// `BOTH_PLAYERS_READY` before the first mover infers its own turn.
    pub fallback_turn_window: Duration,

    /// Delay between `GAME_OVER` and the end-of-game screen.
    pub end_screen_delay: Duration,

    /// How long a transient error notice stays visible.
    pub notice_ttl: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fallback_turn_window: Duration::from_millis(500),
            end_screen_delay: Duration::from_secs(3),
            notice_ttl: Duration::from_secs(4),
        }
    }
}

impl MatchConfig {
    /// Upper bound for the fallback window. Longer than this and the
    /// first mover sits idle for no reason.
    pub const MAX_FALLBACK_TURN_WINDOW: Duration = Duration::from_secs(10);

    /// Lower bound for the notice lifetime.
    pub const MIN_NOTICE_TTL: Duration = Duration::from_millis(100);

    #[must_use]
    pub fn with_fallback_turn_window(mut self, window: Duration) -> Self {
        self.fallback_turn_window = window;
        self
    }

    #[must_use]
    pub fn with_end_screen_delay(mut self, delay: Duration) -> Self {
        self.end_screen_delay = delay;
        self
    }

    #[must_use]
    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`Reconciler::new`](crate::Reconciler::new).
    pub fn validated(mut self) -> Self {
        if self.fallback_turn_window > Self::MAX_FALLBACK_TURN_WINDOW {
            warn!(
                window_ms = self.fallback_turn_window.as_millis() as u64,
                max_ms = Self::MAX_FALLBACK_TURN_WINDOW.as_millis() as u64,
                "fallback_turn_window exceeds maximum, clamping"
            );
            self.fallback_turn_window = Self::MAX_FALLBACK_TURN_WINDOW;
        }
        if self.notice_ttl < Self::MIN_NOTICE_TTL {
            warn!(
                ttl_ms = self.notice_ttl.as_millis() as u64,
                "notice_ttl below minimum, clamping"
            );
            self.notice_ttl = Self::MIN_NOTICE_TTL;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_config_defaults() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.fallback_turn_window, Duration::from_millis(500));
        assert_eq!(cfg.end_screen_delay, Duration::from_secs(3));
        assert_eq!(cfg.notice_ttl, Duration::from_secs(4));
    }

    #[test]
    fn test_match_config_validated_clamps_fallback_window() {
        let cfg = MatchConfig::default()
            .with_fallback_turn_window(Duration::from_secs(60))
            .validated();
        assert_eq!(cfg.fallback_turn_window, MatchConfig::MAX_FALLBACK_TURN_WINDOW);
    }

    #[test]
    fn test_match_config_validated_raises_zero_notice_ttl() {
        let cfg = MatchConfig::default().with_notice_ttl(Duration::ZERO).validated();
        assert_eq!(cfg.notice_ttl, MatchConfig::MIN_NOTICE_TTL);
    }

    #[test]
    fn test_match_config_deserializes_partial() {
        let cfg: MatchConfig = serde_json::from_str(
            r#"{"fallback_turn_window": {"secs": 1, "nanos": 0}}"#,
        )
        .unwrap();
        assert_eq!(cfg.fallback_turn_window, Duration::from_secs(1));
        assert_eq!(cfg.end_screen_delay, Duration::from_secs(3));
    }
}
