//! Consent gating and impact estimation for proposed changes
//!
//! Decides whether a set of deltas needs explicit user approval before it
//! takes effect, attaches a qualitative impact estimate, and assembles the
//! resulting proposal. Application itself is the engine's job.

use chrono::{DateTime, Utc};

use crate::params::ParameterDelta;
use crate::types::{
    AdaptationProposal, ConsentState, EstimatedEffect, ImpactEstimate, ProposalId,
};

/// Raising `max_tasks` beyond this requires explicit consent
pub const CONSENT_MAX_TASKS_LIMIT: u32 = 5;

/// Lowering `strictness` below this requires explicit consent
pub const CONSENT_STRICTNESS_FLOOR: f64 = 0.4;

/// Confidence bounds for the qualitative impact estimate
const CONFIDENCE_RANGE: (f64, f64) = (0.5, 0.8);

/// Does any delta cross a consent threshold?
///
/// Only changes that visibly alter the day's shape are consent-gated:
/// a task load above 5, or a plan held more loosely than 0.4.
pub fn consent_required(deltas: &[ParameterDelta]) -> bool {
    deltas.iter().any(|delta| match *delta {
        ParameterDelta::MaxTasks { new, .. } => new > CONSENT_MAX_TASKS_LIMIT,
        ParameterDelta::Strictness { new, .. } => new < CONSENT_STRICTNESS_FLOOR,
        _ => false,
    })
}

/// Estimate the qualitative impact of a set of deltas
///
/// Counts positive vs negative factors per changed field and derives the
/// majority direction, with confidence growing in the size of the
/// majority but always within [0.5, 0.8].
pub fn estimate_impact(deltas: &[ParameterDelta]) -> ImpactEstimate {
    let mut positive = 0usize;
    let mut negative = 0usize;

    for delta in deltas {
        match *delta {
            ParameterDelta::MaxTasks { old, new } => {
                if new > old {
                    positive += 1;
                } else {
                    negative += 1;
                }
            }
            ParameterDelta::Strictness { old, new } => {
                if new > old {
                    negative += 1;
                } else {
                    positive += 1;
                }
            }
            ParameterDelta::CoachFrequency { old, new } => {
                if new < old {
                    positive += 1;
                } else {
                    negative += 1;
                }
            }
            ParameterDelta::CoachEnabled { new, .. } => {
                if new {
                    positive += 1;
                } else {
                    negative += 1;
                }
            }
            ParameterDelta::SessionBuffer { old, new } => {
                if new > old {
                    positive += 1;
                } else {
                    negative += 1;
                }
            }
            ParameterDelta::EstimationFactor { old, new } => {
                if new > old {
                    positive += 1;
                } else {
                    negative += 1;
                }
            }
            ParameterDelta::EnergyForecastMode { .. } => {
                positive += 1;
            }
            // A mode change is directionless on its own
            ParameterDelta::DefaultMode { .. } => {}
        }
    }

    let effect = if positive > negative {
        EstimatedEffect::Positive
    } else if negative > positive {
        EstimatedEffect::Negative
    } else {
        EstimatedEffect::Neutral
    };

    let changed = deltas.len().max(1) as f64;
    let majority = positive.abs_diff(negative) as f64;
    let confidence =
        (CONFIDENCE_RANGE.0 + 0.3 * (majority / changed)).clamp(CONFIDENCE_RANGE.0, CONFIDENCE_RANGE.1);

    ImpactEstimate { effect, confidence }
}

/// Assemble a proposal from non-empty deltas
pub fn build_proposal(
    deltas: Vec<ParameterDelta>,
    reason: String,
    now: DateTime<Utc>,
) -> AdaptationProposal {
    let consent = consent_required(&deltas);
    let impact = estimate_impact(&deltas);

    AdaptationProposal {
        id: ProposalId::new(),
        proposed_changes: deltas,
        reason,
        consent_required: consent,
        consent: ConsentState::Pending,
        created_at: now,
        impact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnergyForecastMode, Mode};

    #[test]
    fn test_consent_for_high_task_load() {
        let deltas = vec![ParameterDelta::MaxTasks { old: 5, new: 6 }];
        assert!(consent_required(&deltas));

        let deltas = vec![ParameterDelta::MaxTasks { old: 4, new: 5 }];
        assert!(!consent_required(&deltas));
    }

    #[test]
    fn test_consent_for_loose_strictness() {
        let deltas = vec![ParameterDelta::Strictness { old: 0.45, new: 0.35 }];
        assert!(consent_required(&deltas));

        let deltas = vec![ParameterDelta::Strictness { old: 0.5, new: 0.4 }];
        assert!(!consent_required(&deltas));
    }

    #[test]
    fn test_no_consent_for_quiet_changes() {
        let deltas = vec![
            ParameterDelta::CoachEnabled {
                old: true,
                new: false,
            },
            ParameterDelta::SessionBuffer { old: 10, new: 25 },
            ParameterDelta::EnergyForecastMode {
                old: EnergyForecastMode::Accurate,
                new: EnergyForecastMode::Conservative,
            },
        ];
        assert!(!consent_required(&deltas));
    }

    #[test]
    fn test_impact_majority_positive() {
        let deltas = vec![
            ParameterDelta::MaxTasks { old: 4, new: 5 },
            ParameterDelta::Strictness { old: 0.5, new: 0.4 },
        ];
        let impact = estimate_impact(&deltas);
        assert_eq!(impact.effect, EstimatedEffect::Positive);
    }

    #[test]
    fn test_impact_majority_negative() {
        let deltas = vec![ParameterDelta::CoachEnabled {
            old: true,
            new: false,
        }];
        let impact = estimate_impact(&deltas);
        assert_eq!(impact.effect, EstimatedEffect::Negative);
    }

    #[test]
    fn test_impact_balanced_is_neutral() {
        let deltas = vec![
            ParameterDelta::MaxTasks { old: 4, new: 5 },
            ParameterDelta::CoachEnabled {
                old: true,
                new: false,
            },
        ];
        let impact = estimate_impact(&deltas);
        assert_eq!(impact.effect, EstimatedEffect::Neutral);
    }

    #[test]
    fn test_mode_change_alone_is_neutral() {
        let deltas = vec![ParameterDelta::DefaultMode {
            old: Mode::Balanced,
            new: Mode::Recovery,
        }];
        let impact = estimate_impact(&deltas);
        assert_eq!(impact.effect, EstimatedEffect::Neutral);
    }

    #[test]
    fn test_confidence_stays_in_range() {
        let unanimous = vec![
            ParameterDelta::MaxTasks { old: 4, new: 5 },
            ParameterDelta::SessionBuffer { old: 10, new: 25 },
            ParameterDelta::Strictness { old: 0.6, new: 0.5 },
        ];
        let impact = estimate_impact(&unanimous);
        assert!(impact.confidence >= 0.5 && impact.confidence <= 0.8);
        assert_eq!(impact.confidence, 0.8);

        let split = vec![
            ParameterDelta::MaxTasks { old: 4, new: 5 },
            ParameterDelta::CoachEnabled {
                old: true,
                new: false,
            },
        ];
        let impact = estimate_impact(&split);
        assert_eq!(impact.confidence, 0.5);
    }

    #[test]
    fn test_build_proposal_wires_consent_and_impact() {
        let deltas = vec![ParameterDelta::MaxTasks { old: 5, new: 6 }];
        let proposal = build_proposal(deltas.clone(), "test".to_string(), Utc::now());

        assert!(proposal.consent_required);
        assert_eq!(proposal.consent, ConsentState::Pending);
        assert_eq!(proposal.proposed_changes, deltas);
        assert_eq!(proposal.impact.effect, EstimatedEffect::Positive);
    }
}
