//! Link statistics collection

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters for one multiplexed link
///
/// Updated by the multiplexer's read loop, readable from any task. Orphan
/// replies and checksum errors are diagnostics, not failures; watching them
/// is how a caller notices a misbehaving link.
#[derive(Debug, Default)]
pub struct LinkStatistics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    frames_rejected: AtomicU64,
    checksum_errors: AtomicU64,
    orphan_replies: AtomicU64,
    events_received: AtomicU64,
    timeouts: AtomicU64,
}

/// Point-in-time copy of [`LinkStatistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    /// Request frames written to the stream
    pub frames_sent: u64,
    /// Raw frames reassembled from the stream
    pub frames_received: u64,
    /// Frames dropped because they could not be decoded
    pub frames_rejected: u64,
    /// Frames dropped because their checksum did not verify
    pub checksum_errors: u64,
    /// Reply frames that matched no pending request
    pub orphan_replies: u64,
    /// Event frames forwarded to subscribers
    pub events_received: u64,
    /// Requests abandoned at their deadline
    pub timeouts: u64,
}

impl LinkStatistics {
    /// Create new statistics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_frames_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_frames_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_frames_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_checksum_errors(&self) {
        self.checksum_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_orphan_replies(&self) {
        self.orphan_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_events_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
            orphan_replies: self.orphan_replies.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_increments() {
        let stats = LinkStatistics::new();
        assert_eq!(stats.snapshot(), StatisticsSnapshot::default());

        stats.increment_frames_sent();
        stats.increment_frames_received();
        stats.increment_frames_received();
        stats.increment_orphan_replies();

        let snap = stats.snapshot();
        assert_eq!(snap.frames_sent, 1);
        assert_eq!(snap.frames_received, 2);
        assert_eq!(snap.orphan_replies, 1);
        assert_eq!(snap.checksum_errors, 0);
    }
}
