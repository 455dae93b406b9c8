//! Storage layer for the Metis governance engine
//!
//! Provides the abstraction over the host application's key-value store.
//! The engine holds authoritative state in memory and writes through this
//! trait; a failed write is logged and retried on the next change, so
//! persisted state may briefly trail in-memory state (at-least-once, not
//! exactly-once).

pub mod memory;

use crate::error::Result;
use crate::types::{AdaptationId, AdaptationRecord, AdaptationSignal};
use async_trait::async_trait;
use std::time::Duration;

pub use memory::InMemoryStore;

/// Persistence backend trait defining all required operations
#[async_trait]
pub trait AdaptationStore: Send + Sync {
    /// Read a JSON setting value by key
    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Write a JSON setting value by key
    async fn set_setting(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Persist a behavioral signal
    async fn add_adaptation_signal(&self, signal: &AdaptationSignal) -> Result<()>;

    /// Persist an applied-adaptation audit record
    async fn record_adaptation_history(&self, record: &AdaptationRecord) -> Result<()>;

    /// Most recently persisted audit record, if any
    async fn latest_adaptation_history(&self) -> Result<Option<AdaptationRecord>>;

    /// Flip a persisted record's `reverted` flag
    async fn mark_adaptation_reverted(&self, id: AdaptationId) -> Result<()>;

    /// Prune persisted signals past `max_age` or beyond `max_count`,
    /// returning how many were deleted
    async fn prune_adaptation_signals(&self, max_age: Duration, max_count: usize)
        -> Result<usize>;
}
