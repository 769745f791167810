//! Dedup Ledger
//!
//! Call identifiers already consumed from one thread's transcript. Call ids
//! are only unique within a thread, so the ledger is reset whenever that
//! thread's message list is seen empty.

use std::collections::HashSet;

/// Set of consumed call identifiers
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `call_id` was already consumed
    #[must_use]
    pub fn has_seen(&self, call_id: &str) -> bool {
        self.seen.contains(call_id)
    }

    /// Record `call_id` as consumed. Returns false if it was already recorded.
    pub fn mark_seen(&mut self, call_id: impl Into<String>) -> bool {
        self.seen.insert(call_id.into())
    }

    /// Forget every recorded call id
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// Number of recorded call ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_then_mark() {
        let mut ledger = DedupLedger::new();
        assert!(!ledger.has_seen("call_1"));
        assert!(ledger.mark_seen("call_1"));
        assert!(ledger.has_seen("call_1"));
        assert!(!ledger.mark_seen("call_1"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut ledger = DedupLedger::new();
        ledger.mark_seen("a");
        ledger.mark_seen("b");
        ledger.reset();
        assert!(ledger.is_empty());
        assert!(!ledger.has_seen("a"));
    }
}
