//! Metis - Adaptive Behavior Governance Engine
//!
//! The self-adjustment core of a personal task assistant. Metis observes
//! behavioral signals (forced tasks, rejected suggestions, overrun
//! sessions, mode overrides, energy mis-estimates), periodically derives
//! bounded parameter adjustments from deterministic threshold rules, and
//! applies them only behind safety gates:
//! - parameter ranges enforced by a total, idempotent clamp
//! - a minimum observation window before anything adapts
//! - an abuse freeze when override rates look like gaming
//! - a weekly budget on visible changes
//! - consent gating for changes that reshape the day
//! - drift monitoring and audited, invertible rollback
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types / Params**: signals, proposals, audit records, and the
//!   governed parameter set with its bounds
//! - **Signals / Aggregate**: bounded FIFO signal log and the weekly
//!   reduction the rules consume
//! - **Rules**: five deterministic threshold rules
//! - **Governance**: gates, consent validation, drift, rollback, audit log
//! - **Engine**: the per-user facade running the cycle state machine
//! - **Storage**: async persistence trait with an in-memory backend
//!
//! # Example
//!
//! ```ignore
//! use metis::{AdaptationEngine, AdaptationSignal, GovernanceConfig, SignalKind};
//! use metis::storage::InMemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = AdaptationEngine::new(
//!         GovernanceConfig::default(),
//!         Arc::new(InMemoryStore::new()),
//!     );
//!
//!     engine.record_signal(AdaptationSignal::new(
//!         "user-1",
//!         SignalKind::ForcedTask,
//!         Default::default(),
//!     )).await;
//!
//!     if let Some(proposal) = engine.run_weekly_adaptation().await? {
//!         println!("proposed: {}", proposal.reason);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod governance;
pub mod params;
pub mod rules;
pub mod scheduler;
pub mod signals;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use aggregate::{aggregate_week, iso_week_number, AdaptationAggregate};
pub use config::GovernanceConfig;
pub use engine::AdaptationEngine;
pub use error::{MetisError, Result};
pub use governance::{AdaptationLog, DriftDirection, DriftMonitor, DriftReport};
pub use params::{ParameterDelta, Parameters};
pub use rules::apply_adjustment_rules;
pub use scheduler::GovernanceScheduler;
pub use signals::SignalLog;
pub use storage::{AdaptationStore, InMemoryStore};
pub use types::{
    AdaptationId, AdaptationProposal, AdaptationRecord, AdaptationSignal, ConsentDecision,
    ConsentState, EnergyForecastMode, EnergyLevel, EstimatedEffect, ImpactEstimate, Mode,
    ProposalId, SignalContext, SignalKind, TimeOfDay,
};
