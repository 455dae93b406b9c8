// Governance Module - Safety gates around parameter adaptation
//
// Everything that stands between a derived adjustment and the live
// parameter set lives here:
// - gates: observation-window, abuse-freeze, and transparency-budget checks
// - validation: consent gating and qualitative impact estimation
// - drift: short-term deviation and multi-week trend detection
// - rollback: delta inversion with per-field validation
// - history: append-only, size-capped audit trail

pub mod drift;
pub mod gates;
pub mod history;
pub mod rollback;
pub mod validation;

pub use drift::{DriftDirection, DriftMonitor, DriftReport, ProgressiveDriftReport, WatchedParameter};
pub use gates::{GateDecision, SkipReason};
pub use history::AdaptationLog;
pub use validation::{build_proposal, consent_required, estimate_impact};
