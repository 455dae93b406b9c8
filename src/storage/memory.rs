//! In-memory storage backend
//!
//! Backs the engine in tests and in embedding applications that have not
//! wired a real store yet. All state lives in a single mutex-guarded
//! struct; clones share the same underlying store.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{MetisError, Result};
use crate::storage::AdaptationStore;
use crate::types::{AdaptationId, AdaptationRecord, AdaptationSignal};

#[derive(Debug, Default)]
struct Inner {
    settings: HashMap<String, serde_json::Value>,
    signals: Vec<AdaptationSignal>,
    history: Vec<AdaptationRecord>,
}

/// Mutex-guarded in-memory implementation of [`AdaptationStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted signals (test inspection)
    pub fn signal_count(&self) -> usize {
        self.lock().signals.len()
    }

    /// Number of persisted audit records (test inspection)
    pub fn history_count(&self) -> usize {
        self.lock().history.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Mutex poisoning only happens if a holder panicked; the store's
        // plain data is still usable
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AdaptationStore for InMemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.lock().settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.lock().settings.insert(key.to_string(), value);
        Ok(())
    }

    async fn add_adaptation_signal(&self, signal: &AdaptationSignal) -> Result<()> {
        self.lock().signals.push(signal.clone());
        Ok(())
    }

    async fn record_adaptation_history(&self, record: &AdaptationRecord) -> Result<()> {
        self.lock().history.push(record.clone());
        Ok(())
    }

    async fn latest_adaptation_history(&self) -> Result<Option<AdaptationRecord>> {
        Ok(self.lock().history.last().cloned())
    }

    async fn mark_adaptation_reverted(&self, id: AdaptationId) -> Result<()> {
        let mut inner = self.lock();
        match inner.history.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.reverted = true;
                Ok(())
            }
            None => Err(MetisError::AdaptationNotFound(id.to_string())),
        }
    }

    async fn prune_adaptation_signals(
        &self,
        max_age: Duration,
        max_count: usize,
    ) -> Result<usize> {
        let mut inner = self.lock();
        let before = inner.signals.len();

        let cutoff = Utc::now()
            - ChronoDuration::from_std(max_age)
                .map_err(|e| MetisError::InvalidOperation(e.to_string()))?;
        inner.signals.retain(|s| s.timestamp >= cutoff);

        // Keep only the most recent max_count entries
        let len = inner.signals.len();
        if len > max_count {
            inner.signals.drain(0..len - max_count);
        }

        Ok(before - inner.signals.len())
    }
}
