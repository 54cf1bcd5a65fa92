//! Reconnect epochs: the single cancellation primitive.
//!
//! Every connection attempt runs under one epoch. Subscriptions and
//! timers capture an [`EpochToken`] when they are created and check
//! [`EpochToken::is_current`] before they act. Advancing the epoch
//! therefore invalidates everything captured earlier in one step,
//! without having to find and cancel each piece individually.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A shared, monotonically increasing generation counter.
///
/// Clones share the same counter, so a token handed to a spawned task
/// observes advances made by the owner.
#[derive(Debug, Clone, Default)]
pub struct Epoch {
    value: Arc<AtomicU64>,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation.
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Starts a new generation and returns its number.
    pub fn advance(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Captures the current generation.
    pub fn token(&self) -> EpochToken {
        EpochToken {
            captured: self.current(),
            shared: Arc::clone(&self.value),
        }
    }
}

/// A generation captured at some point in time.
#[derive(Debug, Clone)]
pub struct EpochToken {
    captured: u64,
    shared: Arc<AtomicU64>,
}

impl EpochToken {
    /// `true` while no reconnect has happened since this token was taken.
    pub fn is_current(&self) -> bool {
        self.shared.load(Ordering::Acquire) == self.captured
    }

    /// The generation this token was taken in.
    pub fn epoch(&self) -> u64 {
        self.captured
    }
}

impl fmt::Display for EpochToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch-{}", self.captured)
    }
}
