//! Per-session timers
//!
//! The engine never sleeps or spawns. Deadlines are recorded here against
//! host-supplied monotonic time and fire when the host calls
//! [`PlaybackSession::tick`](crate::PlaybackSession::tick).

use std::time::Duration;

/// Everything a session may be waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next camera orientation attempt
    AngleRetry,

    /// Overlay auto-hide
    HideControls,

    /// End of the resume watchdog window
    Watchdog,

    /// Orbit re-enable after a pinch
    GestureSettle,

    /// Periodic stuck-pinch check
    GestureSafety,

    /// Transient message auto-dismiss
    MessageDismiss,
}

/// One pending deadline per [`TimerKind`]
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    pending: Vec<(TimerKind, Duration)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` at `deadline`, replacing an earlier deadline of the same kind
    pub fn schedule(&mut self, kind: TimerKind, deadline: Duration) {
        self.cancel(kind);
        self.pending.push((kind, deadline));
    }

    /// Cancel `kind`; returns whether it was pending
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != kind);
        before != self.pending.len()
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|(pending, _)| *pending == kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Duration> {
        self.pending
            .iter()
            .find(|(pending, _)| *pending == kind)
            .map(|(_, deadline)| *deadline)
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: Duration) -> Vec<TimerKind> {
        let mut due: Vec<(TimerKind, Duration)> = Vec::new();
        self.pending.retain(|&(kind, deadline)| {
            if deadline <= now {
                due.push((kind, deadline));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(_, deadline)| deadline);
        due.into_iter().map(|(kind, _)| kind).collect()
    }

    /// Earliest pending deadline, for hosts that sleep between ticks
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|&(_, deadline)| deadline).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
