use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch counters shared by a component and its workers.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    pub inserts_sent: AtomicU64,
    pub inserts_failed: AtomicU64,
    pub selects_sent: AtomicU64,
    pub selects_failed: AtomicU64,
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub inserts_sent: u64,
    pub inserts_failed: u64,
    pub selects_sent: u64,
    pub selects_failed: u64,
}

impl DispatchMetrics {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            inserts_sent: self.inserts_sent.load(Ordering::Relaxed),
            inserts_failed: self.inserts_failed.load(Ordering::Relaxed),
            selects_sent: self.selects_sent.load(Ordering::Relaxed),
            selects_failed: self.selects_failed.load(Ordering::Relaxed),
        }
    }
}

impl DispatchSnapshot {
    pub fn failures(&self) -> u64 {
        self.inserts_failed + self.selects_failed
    }
}

/// Completion accounting of the SUT adapter
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    pub inserts_received: AtomicU64,
    pub inserts_processed: AtomicU64,
    pub queries_answered: AtomicU64,
}

impl AdapterMetrics {
    pub fn received(&self) -> u64 {
        self.inserts_received.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.inserts_processed.load(Ordering::Relaxed)
    }

    pub fn answered(&self) -> u64 {
        self.queries_answered.load(Ordering::Relaxed)
    }

    pub fn is_balanced(&self) -> bool {
        self.received() == self.processed()
    }
}
