//! One-shot buy trigger
//!
//! The sniper acts on a single opportunity per process. Concurrent filter
//! passes may all find a match; only the first one to claim the guard hands
//! its opportunity to the executor.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct TriggerGuard {
    fired: AtomicBool,
}

impl TriggerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the trigger. Returns true exactly once over the guard's lifetime.
    pub fn try_fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
