//! Threshold rules deriving parameter adjustments
//!
//! Five independent rules, each keyed to one behavioral pattern in the
//! weekly aggregate, applied sequentially against a working copy of the
//! current parameters. No rule in the set touches another rule's fields;
//! the single final clamp is the sole authority on bounds, not the
//! individual rule bodies.

use crate::aggregate::AdaptationAggregate;
use crate::params::{ParameterDelta, Parameters};
use crate::types::EnergyForecastMode;

/// Forced-task ratio above which the plan loosens (rule 1)
pub const FORCED_RATIO_THRESHOLD: f64 = 0.6;

/// Rejected-suggestion ratio above which coaching backs off (rule 2)
pub const REJECTED_RATIO_THRESHOLD: f64 = 0.7;

/// Multiplier applied to the coaching rate when backing off
pub const COACH_BACKOFF: f64 = 0.8;

/// Coaching never drops below roughly one nudge per year
pub const COACH_FREQUENCY_FLOOR: f64 = 1.0 / 365.0;

/// Average overrun minutes above which sessions get more slack (rule 3)
pub const OVERRUN_AVG_THRESHOLD: f64 = 30.0;

/// Buffer minutes added per adjustment
pub const SESSION_BUFFER_STEP: u32 = 15;

/// Stretch applied to the estimation factor per adjustment
pub const ESTIMATION_STRETCH: f64 = 1.2;

/// Step applied to `strictness` when loosening
pub const STRICTNESS_STEP: f64 = 0.1;

/// Result of one rule-derivation pass
#[derive(Debug, Clone)]
pub struct AdjustmentOutcome {
    /// New parameter set, already clamped
    pub params: Parameters,

    /// Fields that actually changed value, in declaration order
    pub deltas: Vec<ParameterDelta>,

    /// One entry per fired rule, for the proposal's reason string
    pub reasons: Vec<String>,
}

impl AdjustmentOutcome {
    /// Joined reason string for the proposal
    pub fn reason(&self) -> String {
        self.reasons.join("; ")
    }
}

/// Apply the five adjustment rules to a working copy of `current`
///
/// The returned value is re-clamped as a whole; rule output is therefore
/// always a clamp fixed point.
pub fn apply_adjustment_rules(
    aggregate: &AdaptationAggregate,
    current: Parameters,
) -> Parameters {
    derive_adjustments(aggregate, current).params
}

/// Run the rules and pair the result with the changed-field deltas
pub fn derive_adjustments(
    aggregate: &AdaptationAggregate,
    current: Parameters,
) -> AdjustmentOutcome {
    let mut working = current;
    let mut reasons = Vec::new();

    // Rule 1: user keeps forcing tasks the selector withheld; offer more
    // room and hold the plan less firmly
    if aggregate.forced_tasks.ratio > FORCED_RATIO_THRESHOLD {
        working.max_tasks = working.max_tasks.saturating_add(1);
        working.strictness -= STRICTNESS_STEP;
        tracing::debug!(
            ratio = aggregate.forced_tasks.ratio,
            "rule fired: loosen plan for high forced-task ratio"
        );
        reasons.push(format!(
            "forced-task ratio {:.2} above {}",
            aggregate.forced_tasks.ratio, FORCED_RATIO_THRESHOLD
        ));
    }

    // Rule 2: coaching is being dismissed wholesale; slow it down and stop
    // delivering until re-enabled elsewhere
    if aggregate.rejected_suggestions.ratio > REJECTED_RATIO_THRESHOLD {
        working.coach_frequency = (working.coach_frequency * COACH_BACKOFF).max(COACH_FREQUENCY_FLOOR);
        working.coach_enabled = false;
        tracing::debug!(
            ratio = aggregate.rejected_suggestions.ratio,
            "rule fired: back off coaching for high rejection ratio"
        );
        reasons.push(format!(
            "rejected-suggestion ratio {:.2} above {}",
            aggregate.rejected_suggestions.ratio, REJECTED_RATIO_THRESHOLD
        ));
    }

    // Rule 3: sessions run long; pad the schedule and stretch estimates
    if aggregate.overrun_sessions.count > 0
        && aggregate.avg_overrun_minutes > OVERRUN_AVG_THRESHOLD
    {
        working.session_buffer_minutes = working
            .session_buffer_minutes
            .saturating_add(SESSION_BUFFER_STEP);
        working.estimation_factor *= ESTIMATION_STRETCH;
        tracing::debug!(
            avg_minutes = aggregate.avg_overrun_minutes,
            "rule fired: pad sessions for chronic overruns"
        );
        reasons.push(format!(
            "sessions overran by {:.0} min on average",
            aggregate.avg_overrun_minutes
        ));
    }

    // Rule 4: the user keeps switching modes; follow them to where they go
    if aggregate.mode_mismatch {
        if let Some(destination) = aggregate.most_frequent_destination() {
            working.default_mode = destination;
            tracing::debug!(?destination, "rule fired: adopt most frequent mode");
            reasons.push(format!(
                "mode overridden in {:.0}% of signals, most often to {:?}",
                aggregate.mode_overrides.ratio * 100.0,
                destination
            ));
        }
    }

    // Rule 5: energy forecasts miss too often; forecast conservatively
    if aggregate.energy_estimates_off {
        working.energy_forecast_mode = EnergyForecastMode::Conservative;
        tracing::debug!(
            ratio = aggregate.energy_mismatches.ratio,
            "rule fired: conservative energy forecasting"
        );
        reasons.push(format!(
            "energy mismatched in {:.0}% of signals",
            aggregate.energy_mismatches.ratio * 100.0
        ));
    }

    let params = working.clamped();
    let deltas = Parameters::diff(&current, &params);

    AdjustmentOutcome {
        params,
        deltas,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_week;
    use crate::types::{AdaptationSignal, Mode, SignalContext, SignalKind};
    use chrono::Utc;

    fn signal(kind: SignalKind) -> AdaptationSignal {
        AdaptationSignal {
            user_id: "user-1".to_string(),
            kind,
            context: SignalContext::default(),
            timestamp: Utc::now(),
        }
    }

    fn aggregate_of(signals: Vec<AdaptationSignal>) -> crate::aggregate::AdaptationAggregate {
        aggregate_week(&signals)
    }

    #[test]
    fn test_high_forced_ratio_loosens_plan() {
        // 7 of 10 forced: ratio 0.7
        let mut signals = vec![signal(SignalKind::ForcedTask); 7];
        signals.extend(vec![signal(SignalKind::SessionOverrun); 3]);
        let agg = aggregate_of(signals);

        let before = Parameters::default();
        let after = apply_adjustment_rules(&agg, before);

        assert!(after.max_tasks > before.max_tasks);
        assert!(after.strictness < before.strictness);
    }

    #[test]
    fn test_rule_output_is_clamp_fixed_point() {
        let mut signals = vec![signal(SignalKind::ForcedTask); 8];
        signals.extend(vec![signal(SignalKind::RejectedSuggestion); 2]);
        let agg = aggregate_of(signals);

        let after = apply_adjustment_rules(&agg, Parameters::default());
        assert_eq!(after, after.clamped());
    }

    #[test]
    fn test_forced_ratio_at_max_tasks_ceiling() {
        let signals = vec![signal(SignalKind::ForcedTask); 10];
        let agg = aggregate_of(signals);

        let mut params = Parameters::default();
        params.max_tasks = 7;
        let after = apply_adjustment_rules(&agg, params);

        // Already at the ceiling: the clamp holds the line
        assert_eq!(after.max_tasks, 7);
    }

    #[test]
    fn test_rejection_backs_off_coaching() {
        let mut signals = vec![signal(SignalKind::RejectedSuggestion); 8];
        signals.extend(vec![signal(SignalKind::SessionOverrun); 2]);
        let agg = aggregate_of(signals);

        let before = Parameters::default();
        let after = apply_adjustment_rules(&agg, before);

        assert!(!after.coach_enabled);
        assert!(after.coach_frequency < before.coach_frequency);
        assert!(after.coach_frequency >= COACH_FREQUENCY_FLOOR);
    }

    #[test]
    fn test_coach_frequency_floor_holds_under_repetition() {
        let mut signals = vec![signal(SignalKind::RejectedSuggestion); 9];
        signals.push(signal(SignalKind::ForcedTask));
        let agg = aggregate_of(signals);

        let mut params = Parameters::default();
        for _ in 0..100 {
            params = apply_adjustment_rules(&agg, params);
        }
        assert!(params.coach_frequency >= COACH_FREQUENCY_FLOOR);
    }

    #[test]
    fn test_chronic_overruns_pad_sessions() {
        let overrun = AdaptationSignal {
            user_id: "user-1".to_string(),
            kind: SignalKind::SessionOverrun,
            context: SignalContext {
                duration_minutes: Some(45.0),
                ..Default::default()
            },
            timestamp: Utc::now(),
        };
        let agg = aggregate_of(vec![overrun.clone(), overrun]);

        let before = Parameters::default();
        let after = apply_adjustment_rules(&agg, before);

        assert_eq!(
            after.session_buffer_minutes,
            before.session_buffer_minutes + SESSION_BUFFER_STEP
        );
        assert!(after.estimation_factor > before.estimation_factor);
    }

    #[test]
    fn test_mild_overruns_do_not_fire() {
        let overrun = AdaptationSignal {
            user_id: "user-1".to_string(),
            kind: SignalKind::SessionOverrun,
            context: SignalContext {
                duration_minutes: Some(20.0),
                ..Default::default()
            },
            timestamp: Utc::now(),
        };
        let agg = aggregate_of(vec![overrun]);

        let before = Parameters::default();
        let outcome = derive_adjustments(&agg, before);
        assert!(outcome.deltas.is_empty());
    }

    #[test]
    fn test_mode_mismatch_follows_destination() {
        let transition = AdaptationSignal {
            user_id: "user-1".to_string(),
            kind: SignalKind::ModeOverride,
            context: SignalContext {
                previous_mode: Some(Mode::Balanced),
                mode: Some(Mode::Recovery),
                ..Default::default()
            },
            timestamp: Utc::now(),
        };
        let agg = aggregate_of(vec![transition.clone(), transition]);

        let after = apply_adjustment_rules(&agg, Parameters::default());
        assert_eq!(after.default_mode, Mode::Recovery);
    }

    #[test]
    fn test_mode_mismatch_without_destination_is_inert() {
        // Overrides recorded without a target mode: flag trips but there is
        // no destination to adopt
        let blind_override = AdaptationSignal {
            user_id: "user-1".to_string(),
            kind: SignalKind::ModeOverride,
            context: SignalContext::default(),
            timestamp: Utc::now(),
        };
        let agg = aggregate_of(vec![blind_override.clone(), blind_override]);
        assert!(agg.mode_mismatch);

        let outcome = derive_adjustments(&agg, Parameters::default());
        assert!(outcome
            .deltas
            .iter()
            .all(|d| d.parameter_name() != "default_mode"));
    }

    #[test]
    fn test_energy_mismatch_turns_conservative() {
        let mut signals = vec![signal(SignalKind::EnergyMismatch); 4];
        signals.extend(vec![signal(SignalKind::SessionOverrun); 6]);
        let agg = aggregate_of(signals);

        let after = apply_adjustment_rules(&agg, Parameters::default());
        assert_eq!(after.energy_forecast_mode, EnergyForecastMode::Conservative);
    }

    #[test]
    fn test_quiet_week_changes_nothing() {
        let mut signals = vec![signal(SignalKind::ForcedTask); 2];
        signals.extend(vec![signal(SignalKind::RejectedSuggestion); 2]);
        signals.extend(vec![signal(SignalKind::EnergyMismatch); 2]);
        signals.extend(vec![signal(SignalKind::ModeOverride); 2]);
        signals.extend(vec![signal(SignalKind::SessionOverrun); 2]);
        let agg = aggregate_of(signals);

        let outcome = derive_adjustments(&agg, Parameters::default());
        assert!(outcome.deltas.is_empty());
        assert!(outcome.reasons.is_empty());
    }

    #[test]
    fn test_reasons_name_fired_rules() {
        let mut signals = vec![signal(SignalKind::ForcedTask); 7];
        signals.extend(vec![signal(SignalKind::EnergyMismatch); 3]);
        let agg = aggregate_of(signals);

        let outcome = derive_adjustments(&agg, Parameters::default());
        assert_eq!(outcome.reasons.len(), 2);
        assert!(outcome.reason().contains("forced-task ratio"));
        assert!(outcome.reason().contains("energy mismatched"));
    }
}
