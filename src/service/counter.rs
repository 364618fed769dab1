use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic count of requests accepted by one service instance
///
/// Values are consumed by [`SequenceCounter::increment_and_read`] and are
/// never handed out twice, even when the request that took one later fails.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    value: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter and returns the new value
    pub fn increment_and_read(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current value without incrementing
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}
