//! Cycle gates: observation window, abuse protection, transparency budget
//!
//! Three independent checks evaluated in order before any rule derivation.
//! A tripped gate terminates the cycle with no proposal and no side
//! effect; gates are policy outcomes, not errors.

use chrono::{DateTime, Duration, Utc};

use crate::types::{AdaptationSignal, SignalKind};

/// Minimum signals on record before any adaptation is considered
///
/// A count-based stand-in for a 30-day observation minimum: the engine
/// adapts nothing until it has seen enough behavior to reason about.
pub const MIN_OBSERVATION_SIGNALS: usize = 50;

/// Trailing window over which the abuse check looks at signals
pub const ABUSE_WINDOW_DAYS: i64 = 30;

/// Forced-task share above which adaptation freezes
pub const ABUSE_OVERRIDE_RATE: f64 = 0.8;

/// The abuse check needs more than this many signals to trip
pub const ABUSE_MIN_SIGNALS: usize = 20;

/// Trailing window for the visible-change budget
pub const TRANSPARENCY_WINDOW_DAYS: i64 = 7;

/// Maximum adaptations allowed to land within the trailing window
pub const TRANSPARENCY_MAX_CHANGES: usize = 3;

/// Outcome of a single gate check
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Continue the cycle
    Proceed,

    /// Terminate the cycle with no proposal and no side effect
    Skip(SkipReason),
}

/// Why a cycle was skipped
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Too few signals recorded to reason about behavior
    ObservationWindow { observed: usize },

    /// Override rate looks like the user is fighting the system wholesale;
    /// adapting on that signal would chase abuse, so adaptation freezes
    AbuseFreeze { override_rate: f64, total: usize },

    /// Too many visible changes already landed this week
    TransparencyBudget { recent_changes: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ObservationWindow { observed } => write!(
                f,
                "observation window: {} of {} required signals",
                observed, MIN_OBSERVATION_SIGNALS
            ),
            SkipReason::AbuseFreeze {
                override_rate,
                total,
            } => write!(
                f,
                "abuse freeze: override rate {:.2} across {} signals",
                override_rate, total
            ),
            SkipReason::TransparencyBudget { recent_changes } => write!(
                f,
                "transparency budget: {} adaptations in the last {} days",
                recent_changes, TRANSPARENCY_WINDOW_DAYS
            ),
        }
    }
}

/// Gate 1: require a minimum number of recorded signals
pub fn observation_window(observed: usize) -> GateDecision {
    if observed < MIN_OBSERVATION_SIGNALS {
        GateDecision::Skip(SkipReason::ObservationWindow { observed })
    } else {
        GateDecision::Proceed
    }
}

/// Gate 2: freeze adaptation when the trailing month is dominated by
/// forced tasks
pub fn abuse_freeze(signals: &[AdaptationSignal], now: DateTime<Utc>) -> GateDecision {
    let window_start = now - Duration::days(ABUSE_WINDOW_DAYS);
    let recent: Vec<_> = signals
        .iter()
        .filter(|s| s.timestamp >= window_start)
        .collect();

    let total = recent.len();
    let forced = recent
        .iter()
        .filter(|s| s.kind == SignalKind::ForcedTask)
        .count();
    let override_rate = forced as f64 / total.max(1) as f64;

    if override_rate > ABUSE_OVERRIDE_RATE && total > ABUSE_MIN_SIGNALS {
        tracing::warn!(
            override_rate,
            total,
            "freezing adaptation: override rate suggests gaming, not preference"
        );
        GateDecision::Skip(SkipReason::AbuseFreeze {
            override_rate,
            total,
        })
    } else {
        GateDecision::Proceed
    }
}

/// Gate 3: cap how many adaptations may become visible per trailing week
pub fn transparency_budget(recent_changes: usize) -> GateDecision {
    if recent_changes >= TRANSPARENCY_MAX_CHANGES {
        GateDecision::Skip(SkipReason::TransparencyBudget { recent_changes })
    } else {
        GateDecision::Proceed
    }
}
