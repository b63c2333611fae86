//! Discard Statistics
//!
//! Thread-safe per-reason counters for filter passes, using DashMap.
//! Lets the operator see mempool churn (not found, wrong router, ...)
//! without logging every discarded transaction.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::DiscardReason;

#[derive(Debug, Default)]
pub struct FilterStats {
    passes: AtomicU64,
    discards: DashMap<DiscardReason, u64>,
}

impl FilterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one filter pass. Returns the running total.
    pub fn record_pass(&self) -> u64 {
        self.passes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_discard(&self, reason: DiscardReason) {
        *self.discards.entry(reason).or_insert(0) += 1;
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn discards(&self, reason: DiscardReason) -> u64 {
        self.discards.get(&reason).map(|v| *v).unwrap_or(0)
    }

    /// One-line summary for periodic logging
    pub fn summary(&self) -> String {
        let counts = DiscardReason::ALL
            .iter()
            .map(|r| format!("{}={}", r, self.discards(*r)))
            .collect::<Vec<_>>()
            .join(" ");
        format!("passes={} | {}", self.passes(), counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let stats = FilterStats::new();
        assert_eq!(stats.record_pass(), 1);
        assert_eq!(stats.record_pass(), 2);
        stats.record_discard(DiscardReason::NotFound);
        stats.record_discard(DiscardReason::NotFound);
        stats.record_discard(DiscardReason::WrongDestination);

        assert_eq!(stats.passes(), 2);
        assert_eq!(stats.discards(DiscardReason::NotFound), 2);
        assert_eq!(stats.discards(DiscardReason::WrongDestination), 1);
        assert_eq!(stats.discards(DiscardReason::DecodeFailed), 0);
    }

    #[test]
    fn test_summary_lists_every_reason() {
        let stats = FilterStats::new();
        stats.record_pass();
        stats.record_discard(DiscardReason::ShapeMismatch);
        let summary = stats.summary();
        assert!(summary.starts_with("passes=1 |"));
        assert!(summary.contains("shape_mismatch=1"));
        assert!(summary.contains("already_triggered=0"));
    }
}
