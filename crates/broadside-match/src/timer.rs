//! Epoch-tagged one-shot deadlines for the reconciler.
//!
//! Follows the shape of a tick scheduler inside a `select!` loop: the
//! owner awaits [`MatchTimers::next`], which sleeps until the earliest
//! armed deadline, or pends forever when none is armed.

use std::time::Duration;

use broadside_session::EpochToken;
use tokio::time::{self, Instant};

/// The reconciler's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Infers the first mover's turn when `YOUR_TURN` never came.
    FallbackTurn,
    /// Moves from the battle screen to the end-of-game screen.
    EndScreen,
    /// Clears the transient error notice.
    NoticeExpiry,
}

impl TimerKind {
    const ALL: [Self; 3] = [Self::FallbackTurn, Self::EndScreen, Self::NoticeExpiry];

    fn slot(self) -> usize {
        match self {
            Self::FallbackTurn => 0,
            Self::EndScreen => 1,
            Self::NoticeExpiry => 2,
        }
    }
}

/// An armed deadline and the epoch it was armed under.
#[derive(Debug, Clone)]
pub(crate) struct Deadline {
    pub at: Instant,
    pub token: EpochToken,
}

#[derive(Debug, Default)]
pub(crate) struct MatchTimers {
    slots: [Option<Deadline>; 3],
}

impl MatchTimers {
    /// Arms (or re-arms) `kind` to fire `after` from now.
    pub fn arm(&mut self, kind: TimerKind, after: Duration, token: EpochToken) {
        tracing::trace!(?kind, after_ms = after.as_millis() as u64, %token, "timer armed");
        self.slots[kind.slot()] = Some(Deadline {
            at: Instant::now() + after,
            token,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.slots[kind.slot()] = None;
    }

    pub fn cancel_all(&mut self) {
        self.slots = Default::default();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    /// Removes and returns `kind`'s deadline if it is due.
    ///
    /// A deadline that is armed but not yet due stays armed.
    pub fn take_due(&mut self, kind: TimerKind) -> Option<Deadline> {
        let slot = &mut self.slots[kind.slot()];
        let due = slot.as_ref().is_some_and(|d| d.at <= Instant::now());
        if due { slot.take() } else { None }
    }

    fn earliest(&self) -> Option<(TimerKind, Instant)> {
        TimerKind::ALL
            .into_iter()
            .filter_map(|kind| self.slots[kind.slot()].as_ref().map(|d| (kind, d.at)))
            .min_by_key(|&(_, at)| at)
    }

    /// Sleeps until the earliest armed deadline and returns its kind.
    ///
    /// With nothing armed this future never completes, but `select!` will
    /// still process other branches.
    pub async fn next(&self) -> TimerKind {
        match self.earliest() {
            Some((kind, at)) => {
                time::sleep_until(at).await;
                kind
            }
            None => std::future::pending().await,
        }
    }
}
