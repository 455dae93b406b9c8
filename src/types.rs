//! Core data types for the Metis governance engine
//!
//! This module defines the fundamental data structures used throughout
//! metis: behavioral signals, adaptation proposals, audit records, and the
//! consent machinery connecting them. The governed parameter set itself
//! lives in [`crate::params`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::params::ParameterDelta;

/// Unique identifier for adaptation proposals
///
/// Wraps a UUID to provide type safety and prevent mixing proposal IDs
/// with other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    /// Create a new random proposal ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for applied adaptations (audit records)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdaptationId(pub Uuid);

impl AdaptationId {
    /// Create a new random adaptation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AdaptationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AdaptationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of behavioral signal driving adaptation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// User forced a task the selector had not offered
    ForcedTask,

    /// User dismissed a coaching suggestion
    RejectedSuggestion,

    /// A work session ran past its planned end
    SessionOverrun,

    /// User manually switched away from the active mode
    ModeOverride,

    /// Actual energy diverged from the forecast
    EnergyMismatch,
}

/// Self-reported or inferred energy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

/// Assistant operating modes
///
/// A mode shapes how the task selector paces the day: `Focus` front-loads
/// deep work, `Sprint` compresses, `Recovery` backs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Focus,
    Balanced,
    Sprint,
    Recovery,
}

/// How the energy forecaster weighs its own estimates
///
/// `Conservative` assumes less energy than forecast, trading throughput
/// for fewer mis-scheduled heavy tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyForecastMode {
    Accurate,
    Conservative,
}

/// Coarse time-of-day bucket for overrun analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Bucket an hour-of-day (0-23) into a time-of-day period
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Situational context captured with a signal
///
/// All fields are optional: callers record whatever the interaction
/// actually carried. Missing context is tolerated everywhere downstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalContext {
    /// Energy level at the time of the interaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyLevel>,

    /// Task type involved, if any (free-form category)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    /// Active mode at the time of the interaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Duration in minutes (overrun length for session overruns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,

    /// Time-of-day bucket, when the caller already classified it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeOfDay>,

    /// Mode the user switched away from (mode overrides)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_mode: Option<Mode>,
}

/// A discrete observed user-interaction event
///
/// Signals are immutable once created. The signal log evicts them FIFO
/// past its capacity; the maintenance path prunes them past their maximum
/// age. They are never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationSignal {
    /// Owning user (the engine itself is single-tenant per user)
    pub user_id: String,

    /// What happened
    pub kind: SignalKind,

    /// Situational context, as much as the interaction carried
    #[serde(default)]
    pub context: SignalContext,

    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl AdaptationSignal {
    /// Convenience constructor stamping the current time
    pub fn new(user_id: impl Into<String>, kind: SignalKind, context: SignalContext) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            context,
            timestamp: Utc::now(),
        }
    }
}

/// External decision on a pending proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentDecision {
    /// Apply the proposed changes
    Accept,

    /// Discard the proposal
    Reject,

    /// Leave the proposal pending for a later decision
    Postpone,
}

/// Consent state carried by a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentState {
    Pending,
    Accepted,
    Rejected,
}

/// Qualitative direction of a proposal's expected effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedEffect {
    Positive,
    Neutral,
    Negative,
}

/// Qualitative impact estimate attached to a proposal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    /// Majority direction across the changed fields
    pub effect: EstimatedEffect,

    /// Confidence in the estimate, always within [0.5, 0.8]
    pub confidence: f64,
}

/// A proposed parameter adjustment awaiting (or past) consent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationProposal {
    pub id: ProposalId,

    /// Per-field changes, old and new values paired by type
    pub proposed_changes: Vec<ParameterDelta>,

    /// Human-readable derivation reason (which rules fired and why)
    pub reason: String,

    /// Whether the change crosses a consent threshold
    pub consent_required: bool,

    /// Current consent state; auto-applied proposals are `Accepted`
    pub consent: ConsentState,

    pub created_at: DateTime<Utc>,

    /// Qualitative impact estimate
    pub impact: ImpactEstimate,
}

/// Audit-grade record of an applied adaptation
///
/// Created on every applied change, including reversals. Records are
/// append-only: `reverted` flips to true on rollback but the record itself
/// is never deleted (the audit log caps at the most recent entries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationRecord {
    pub id: AdaptationId,

    pub timestamp: DateTime<Utc>,

    /// The deltas that were applied
    pub changes: Vec<ParameterDelta>,

    /// Quality metric before the change, when the scoring collaborator
    /// supplied one
    pub quality_before: Option<f64>,

    /// Quality metric after the change, when available
    pub quality_after: Option<f64>,

    /// True only when an explicit consent acceptance applied this change
    pub user_consented: bool,

    /// Flipped to true when this change is rolled back
    pub reverted: bool,
}
