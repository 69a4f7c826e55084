use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// A shared request counter used to invalidate in-flight work.
///
/// Both ends of a request/response pair hold the same `Epoch`. The sender
/// advances it for every new request; the receiving side compares the stamp of
/// each request against `current()` and skips anything that is no longer
/// current.
#[derive(Clone, Debug)]
pub struct Epoch {
    value: Arc<AtomicU64>,
}

impl Default for Epoch {
    fn default() -> Self {
        Self::new()
    }
}

impl Epoch {
    pub fn new() -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the current epoch value.
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Advance to the next epoch. Returns the new epoch value.
    pub fn advance(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Check if the given epoch is still current.
    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.current()
    }

    /// True if a newer epoch has been issued since `epoch`.
    pub fn is_superseded(&self, epoch: u64) -> bool {
        epoch < self.current()
    }
}
