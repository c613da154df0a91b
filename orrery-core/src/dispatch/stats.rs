use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the engine thread, readable from anywhere.
#[derive(Default)]
pub(crate) struct QueueStats {
    executed: AtomicU64,
    panicked: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    /// Tasks that ran to completion.
    pub executed: u64,
    /// Tasks that panicked; the engine thread survived them.
    pub panicked: u64,
    /// Tasks still queued at shutdown, never run.
    pub dropped: u64,
}

impl QueueStats {
    pub(crate) fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            executed: self.executed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
