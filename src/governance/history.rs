//! Append-only audit trail of applied adaptations
//!
//! Every applied change, including reversals, lands here. Entries are
//! never deleted except by the size cap (oldest first); the only
//! in-place mutation ever made is flipping a record's `reverted` flag.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

use crate::error::{MetisError, Result};
use crate::types::{AdaptationId, AdaptationRecord};

/// Append-only, size-capped log of adaptation records
#[derive(Debug)]
pub struct AdaptationLog {
    entries: VecDeque<AdaptationRecord>,
    cap: usize,
}

impl AdaptationLog {
    /// Create an empty log holding at most `cap` records
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(64)),
            cap,
        }
    }

    /// Append a record, evicting the oldest past the cap
    pub fn record(&mut self, record: AdaptationRecord) {
        if self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a record by id
    pub fn find(&self, id: AdaptationId) -> Option<&AdaptationRecord> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Most recently appended record
    pub fn latest(&self) -> Option<&AdaptationRecord> {
        self.entries.back()
    }

    /// Defensive copy of all records, oldest first
    pub fn snapshot(&self) -> Vec<AdaptationRecord> {
        self.entries.iter().cloned().collect()
    }

    /// Flip a record's `reverted` flag
    ///
    /// The record is otherwise immutable; this is the audit trail's one
    /// permitted in-place mutation.
    pub fn mark_reverted(&mut self, id: AdaptationId) -> Result<()> {
        match self.entries.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.reverted = true;
                Ok(())
            }
            None => Err(MetisError::AdaptationNotFound(id.to_string())),
        }
    }

    /// Adaptations applied within the trailing `days`-day window
    pub fn applied_within(&self, now: DateTime<Utc>, days: i64) -> usize {
        let window_start = now - Duration::days(days);
        self.entries
            .iter()
            .filter(|r| r.timestamp >= window_start)
            .count()
    }

    /// Export the full audit trail as pretty-printed JSON
    pub fn export_json(&self) -> Result<String> {
        let records: Vec<&AdaptationRecord> = self.entries.iter().collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Transparency self-check: the trail is well-formed
    ///
    /// Verifies the cap is respected and entries are time-ordered
    /// (reversals stamp after the originals they undo).
    pub fn self_check(&self) -> bool {
        if self.entries.len() > self.cap {
            return false;
        }
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp)
    }
}
