//! Bounded, time-ordered signal log
//!
//! Append-only buffer of behavioral signals with strict FIFO eviction.
//! Count-based eviction happens inline on insert (O(1) amortized on the
//! ring buffer); age-based pruning is a separate maintenance path so the
//! hot ingestion path never scans the log.

use chrono::{DateTime, Utc};

use crate::types::AdaptationSignal;
use std::collections::VecDeque;

/// Bounded FIFO log of behavioral signals
///
/// The log itself is not synchronized; the engine wraps it in an RwLock
/// and hands out snapshots, so concurrent aggregation never observes a
/// log mid-mutation.
#[derive(Debug)]
pub struct SignalLog {
    entries: VecDeque<AdaptationSignal>,
    max_entries: usize,
}

impl SignalLog {
    /// Create an empty log holding at most `max_entries` signals
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Append a signal, evicting the oldest entry first when full
    pub fn record(&mut self, signal: AdaptationSignal) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(signal);
    }

    /// Number of signals currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Defensive copy of the full log, oldest first
    pub fn snapshot(&self) -> Vec<AdaptationSignal> {
        self.entries.iter().cloned().collect()
    }

    /// Defensive copy of the signals at or after `since`, oldest first
    pub fn window(&self, since: DateTime<Utc>) -> Vec<AdaptationSignal> {
        self.entries
            .iter()
            .filter(|s| s.timestamp >= since)
            .cloned()
            .collect()
    }

    /// Drop signals older than `cutoff`, returning how many were removed
    ///
    /// Maintenance path only. Entries are time-ordered, so pruning pops
    /// from the front until the first young-enough entry.
    pub fn prune_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while let Some(front) = self.entries.front() {
            if front.timestamp < cutoff {
                self.entries.pop_front();
                removed += 1;
            } else {
                break;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignalContext, SignalKind};
    use chrono::Duration;

    fn signal_at(offset_days: i64) -> AdaptationSignal {
        AdaptationSignal {
            user_id: "user-1".to_string(),
            kind: SignalKind::ForcedTask,
            context: SignalContext::default(),
            timestamp: Utc::now() - Duration::days(offset_days),
        }
    }

    fn signal_tagged(task_type: &str) -> AdaptationSignal {
        AdaptationSignal {
            user_id: "user-1".to_string(),
            kind: SignalKind::ForcedTask,
            context: SignalContext {
                task_type: Some(task_type.to_string()),
                ..Default::default()
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_snapshot() {
        let mut log = SignalLog::new(500);
        log.record(signal_at(0));
        log.record(signal_at(0));

        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot().len(), 2);
    }

    #[test]
    fn test_fifo_eviction_keeps_most_recent_in_order() {
        let mut log = SignalLog::new(500);
        for i in 0..520 {
            log.record(signal_tagged(&format!("task-{}", i)));
        }

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 500);

        // The 20 oldest were evicted; relative order of the rest is intact
        assert_eq!(snapshot[0].context.task_type.as_deref(), Some("task-20"));
        assert_eq!(
            snapshot[499].context.task_type.as_deref(),
            Some("task-519")
        );
    }

    #[test]
    fn test_window_filters_by_timestamp() {
        let mut log = SignalLog::new(500);
        log.record(signal_at(40));
        log.record(signal_at(10));
        log.record(signal_at(1));

        let window = log.window(Utc::now() - Duration::days(30));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_prune_removes_only_old_entries() {
        let mut log = SignalLog::new(500);
        log.record(signal_at(120));
        log.record(signal_at(100));
        log.record(signal_at(5));

        let removed = log.prune_older_than(Utc::now() - Duration::days(90));
        assert_eq!(removed, 2);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_prune_on_empty_log() {
        let mut log = SignalLog::new(500);
        assert_eq!(log.prune_older_than(Utc::now()), 0);
    }

    #[test]
    fn test_snapshot_is_defensive() {
        let mut log = SignalLog::new(500);
        log.record(signal_at(0));

        let snapshot = log.snapshot();
        log.record(signal_at(0));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }
}
