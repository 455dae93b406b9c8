//! Governed parameter set and its range invariants
//!
//! The [`Parameters`] struct is the single piece of state the whole engine
//! exists to adjust. Every code path that produces a new value must pass
//! through [`Parameters::clamped`] before the result is observed or
//! persisted; the per-rule arithmetic never enforces bounds itself.
//!
//! [`ParameterDelta`] is a tagged sum type with one variant per field, so
//! an old/new pair can never mix value types across fields.

use serde::{Deserialize, Serialize};

use crate::error::{MetisError, Result};
use crate::types::{EnergyForecastMode, Mode};

/// Bounds for `max_tasks` (inclusive)
pub const MAX_TASKS_BOUNDS: (u32, u32) = (3, 7);

/// Bounds for `strictness` (inclusive)
pub const STRICTNESS_BOUNDS: (f64, f64) = (0.3, 0.8);

/// Upper bound for `coach_frequency`: at most one nudge per 15 minutes
pub const COACH_FREQUENCY_MAX: f64 = 1.0 / 15.0;

/// Bounds for `session_buffer_minutes` (inclusive)
pub const SESSION_BUFFER_BOUNDS: (u32, u32) = (0, 120);

/// Bounds for `estimation_factor` (inclusive)
pub const ESTIMATION_FACTOR_BOUNDS: (f64, f64) = (0.5, 3.0);

/// The bounded behavioral parameter set
///
/// All consumers (task selector, coach, forecaster) read these through the
/// engine's defensive copy; only the weekly cycle and rollback mutate them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Maximum tasks offered per day
    pub max_tasks: u32,

    /// How firmly the selector resists user overrides (0.3 lenient, 0.8 firm)
    pub strictness: f64,

    /// Coaching nudge rate, per minute
    pub coach_frequency: f64,

    /// Whether coaching nudges are delivered at all
    pub coach_enabled: bool,

    /// How the energy forecaster weighs its own estimates
    pub energy_forecast_mode: EnergyForecastMode,

    /// Mode the assistant starts the day in
    pub default_mode: Mode,

    /// Slack added after each planned session, in minutes
    pub session_buffer_minutes: u32,

    /// Multiplier applied to user time estimates
    pub estimation_factor: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_tasks: 5,
            strictness: 0.5,
            coach_frequency: 1.0 / 30.0,
            coach_enabled: true,
            energy_forecast_mode: EnergyForecastMode::Accurate,
            default_mode: Mode::Balanced,
            session_buffer_minutes: 10,
            estimation_factor: 1.0,
        }
    }
}

impl Parameters {
    /// Clamp every field to its configured bounds
    ///
    /// Pure, total, and idempotent: out-of-range numeric input, including
    /// non-finite values, still resolves to an in-bounds value (NaN and
    /// negative infinity land on the lower bound, positive infinity on the
    /// upper). No side effects, no error path.
    pub fn clamped(self) -> Self {
        Self {
            max_tasks: self.max_tasks.clamp(MAX_TASKS_BOUNDS.0, MAX_TASKS_BOUNDS.1),
            strictness: clamp_f64(self.strictness, STRICTNESS_BOUNDS.0, STRICTNESS_BOUNDS.1),
            coach_frequency: clamp_f64(self.coach_frequency, 0.0, COACH_FREQUENCY_MAX),
            coach_enabled: self.coach_enabled,
            energy_forecast_mode: self.energy_forecast_mode,
            default_mode: self.default_mode,
            session_buffer_minutes: self
                .session_buffer_minutes
                .clamp(SESSION_BUFFER_BOUNDS.0, SESSION_BUFFER_BOUNDS.1),
            estimation_factor: clamp_f64(
                self.estimation_factor,
                ESTIMATION_FACTOR_BOUNDS.0,
                ESTIMATION_FACTOR_BOUNDS.1,
            ),
        }
    }

    /// Compute the per-field deltas between two parameter values
    ///
    /// Returns one delta per field whose value actually changed, in
    /// declaration order. Float comparison is exact: all mutations are
    /// deterministic arithmetic, so equal means untouched.
    pub fn diff(old: &Parameters, new: &Parameters) -> Vec<ParameterDelta> {
        let mut deltas = Vec::new();

        if old.max_tasks != new.max_tasks {
            deltas.push(ParameterDelta::MaxTasks {
                old: old.max_tasks,
                new: new.max_tasks,
            });
        }
        if old.strictness != new.strictness {
            deltas.push(ParameterDelta::Strictness {
                old: old.strictness,
                new: new.strictness,
            });
        }
        if old.coach_frequency != new.coach_frequency {
            deltas.push(ParameterDelta::CoachFrequency {
                old: old.coach_frequency,
                new: new.coach_frequency,
            });
        }
        if old.coach_enabled != new.coach_enabled {
            deltas.push(ParameterDelta::CoachEnabled {
                old: old.coach_enabled,
                new: new.coach_enabled,
            });
        }
        if old.energy_forecast_mode != new.energy_forecast_mode {
            deltas.push(ParameterDelta::EnergyForecastMode {
                old: old.energy_forecast_mode,
                new: new.energy_forecast_mode,
            });
        }
        if old.default_mode != new.default_mode {
            deltas.push(ParameterDelta::DefaultMode {
                old: old.default_mode,
                new: new.default_mode,
            });
        }
        if old.session_buffer_minutes != new.session_buffer_minutes {
            deltas.push(ParameterDelta::SessionBuffer {
                old: old.session_buffer_minutes,
                new: new.session_buffer_minutes,
            });
        }
        if old.estimation_factor != new.estimation_factor {
            deltas.push(ParameterDelta::EstimationFactor {
                old: old.estimation_factor,
                new: new.estimation_factor,
            });
        }

        deltas
    }
}

/// Clamp a float, resolving non-finite input to an in-bounds value
fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// A single-field parameter change, old and new values paired by type
///
/// One variant per governed field: the value types of `old`/`new` are tied
/// to the field itself, so a strictness delta cannot carry a task count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "parameter", rename_all = "snake_case")]
pub enum ParameterDelta {
    MaxTasks { old: u32, new: u32 },
    Strictness { old: f64, new: f64 },
    CoachFrequency { old: f64, new: f64 },
    CoachEnabled { old: bool, new: bool },
    EnergyForecastMode {
        old: EnergyForecastMode,
        new: EnergyForecastMode,
    },
    DefaultMode { old: Mode, new: Mode },
    SessionBuffer { old: u32, new: u32 },
    EstimationFactor { old: f64, new: f64 },
}

impl ParameterDelta {
    /// Name of the governed field this delta touches
    pub fn parameter_name(&self) -> &'static str {
        match self {
            ParameterDelta::MaxTasks { .. } => "max_tasks",
            ParameterDelta::Strictness { .. } => "strictness",
            ParameterDelta::CoachFrequency { .. } => "coach_frequency",
            ParameterDelta::CoachEnabled { .. } => "coach_enabled",
            ParameterDelta::EnergyForecastMode { .. } => "energy_forecast_mode",
            ParameterDelta::DefaultMode { .. } => "default_mode",
            ParameterDelta::SessionBuffer { .. } => "session_buffer_minutes",
            ParameterDelta::EstimationFactor { .. } => "estimation_factor",
        }
    }

    /// Swap old and new values, preserving the field's type pairing
    ///
    /// A structural swap per variant: `invert` is an involution.
    pub fn invert(&self) -> Self {
        match *self {
            ParameterDelta::MaxTasks { old, new } => ParameterDelta::MaxTasks { old: new, new: old },
            ParameterDelta::Strictness { old, new } => {
                ParameterDelta::Strictness { old: new, new: old }
            }
            ParameterDelta::CoachFrequency { old, new } => {
                ParameterDelta::CoachFrequency { old: new, new: old }
            }
            ParameterDelta::CoachEnabled { old, new } => {
                ParameterDelta::CoachEnabled { old: new, new: old }
            }
            ParameterDelta::EnergyForecastMode { old, new } => {
                ParameterDelta::EnergyForecastMode { old: new, new: old }
            }
            ParameterDelta::DefaultMode { old, new } => {
                ParameterDelta::DefaultMode { old: new, new: old }
            }
            ParameterDelta::SessionBuffer { old, new } => {
                ParameterDelta::SessionBuffer { old: new, new: old }
            }
            ParameterDelta::EstimationFactor { old, new } => {
                ParameterDelta::EstimationFactor { old: new, new: old }
            }
        }
    }

    /// Validate the target value against the field's own constraints
    ///
    /// Used before reapplying deltas (rollback, consent-gated application):
    /// a value outside the field's bounds, or non-finite, fails closed.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ParameterDelta::MaxTasks { new, .. } => {
                if !(MAX_TASKS_BOUNDS.0..=MAX_TASKS_BOUNDS.1).contains(&new) {
                    return Err(self.out_of_range(new as f64, MAX_TASKS_BOUNDS.0 as f64, MAX_TASKS_BOUNDS.1 as f64));
                }
            }
            ParameterDelta::Strictness { new, .. } => {
                if !new.is_finite() || !(STRICTNESS_BOUNDS.0..=STRICTNESS_BOUNDS.1).contains(&new) {
                    return Err(self.out_of_range(new, STRICTNESS_BOUNDS.0, STRICTNESS_BOUNDS.1));
                }
            }
            ParameterDelta::CoachFrequency { new, .. } => {
                if !new.is_finite() || !(0.0..=COACH_FREQUENCY_MAX).contains(&new) {
                    return Err(self.out_of_range(new, 0.0, COACH_FREQUENCY_MAX));
                }
            }
            ParameterDelta::SessionBuffer { new, .. } => {
                if !(SESSION_BUFFER_BOUNDS.0..=SESSION_BUFFER_BOUNDS.1).contains(&new) {
                    return Err(self.out_of_range(
                        new as f64,
                        SESSION_BUFFER_BOUNDS.0 as f64,
                        SESSION_BUFFER_BOUNDS.1 as f64,
                    ));
                }
            }
            ParameterDelta::EstimationFactor { new, .. } => {
                if !new.is_finite()
                    || !(ESTIMATION_FACTOR_BOUNDS.0..=ESTIMATION_FACTOR_BOUNDS.1).contains(&new)
                {
                    return Err(self.out_of_range(
                        new,
                        ESTIMATION_FACTOR_BOUNDS.0,
                        ESTIMATION_FACTOR_BOUNDS.1,
                    ));
                }
            }
            // Booleans and enums carry no range to violate
            ParameterDelta::CoachEnabled { .. }
            | ParameterDelta::EnergyForecastMode { .. }
            | ParameterDelta::DefaultMode { .. } => {}
        }
        Ok(())
    }

    /// Write this delta's target value into a parameter set
    pub fn apply_to(&self, params: Parameters) -> Parameters {
        let mut params = params;
        match *self {
            ParameterDelta::MaxTasks { new, .. } => params.max_tasks = new,
            ParameterDelta::Strictness { new, .. } => params.strictness = new,
            ParameterDelta::CoachFrequency { new, .. } => params.coach_frequency = new,
            ParameterDelta::CoachEnabled { new, .. } => params.coach_enabled = new,
            ParameterDelta::EnergyForecastMode { new, .. } => params.energy_forecast_mode = new,
            ParameterDelta::DefaultMode { new, .. } => params.default_mode = new,
            ParameterDelta::SessionBuffer { new, .. } => params.session_buffer_minutes = new,
            ParameterDelta::EstimationFactor { new, .. } => params.estimation_factor = new,
        }
        params
    }

    fn out_of_range(&self, value: f64, min: f64, max: f64) -> MetisError {
        MetisError::InvalidParameterValue {
            parameter: self.parameter_name(),
            reason: format!("{} outside [{}, {}]", value, min, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn in_bounds(params: &Parameters) -> bool {
        (MAX_TASKS_BOUNDS.0..=MAX_TASKS_BOUNDS.1).contains(&params.max_tasks)
            && (STRICTNESS_BOUNDS.0..=STRICTNESS_BOUNDS.1).contains(&params.strictness)
            && (0.0..=COACH_FREQUENCY_MAX).contains(&params.coach_frequency)
            && (SESSION_BUFFER_BOUNDS.0..=SESSION_BUFFER_BOUNDS.1)
                .contains(&params.session_buffer_minutes)
            && (ESTIMATION_FACTOR_BOUNDS.0..=ESTIMATION_FACTOR_BOUNDS.1)
                .contains(&params.estimation_factor)
    }

    #[test]
    fn test_defaults_are_a_clamp_fixed_point() {
        let params = Parameters::default();
        assert_eq!(params, params.clamped());
        assert!(in_bounds(&params));
    }

    #[test]
    fn test_clamp_pulls_fields_into_bounds() {
        let params = Parameters {
            max_tasks: 12,
            strictness: 1.5,
            coach_frequency: 0.5,
            session_buffer_minutes: 500,
            estimation_factor: 10.0,
            ..Default::default()
        };
        let clamped = params.clamped();

        assert_eq!(clamped.max_tasks, 7);
        assert_eq!(clamped.strictness, 0.8);
        assert_eq!(clamped.coach_frequency, COACH_FREQUENCY_MAX);
        assert_eq!(clamped.session_buffer_minutes, 120);
        assert_eq!(clamped.estimation_factor, 3.0);
    }

    #[test]
    fn test_clamp_resolves_non_finite_input() {
        let params = Parameters {
            strictness: f64::NAN,
            coach_frequency: f64::INFINITY,
            estimation_factor: f64::NEG_INFINITY,
            ..Default::default()
        };
        let clamped = params.clamped();

        assert_eq!(clamped.strictness, STRICTNESS_BOUNDS.0);
        assert_eq!(clamped.coach_frequency, COACH_FREQUENCY_MAX);
        assert_eq!(clamped.estimation_factor, ESTIMATION_FACTOR_BOUNDS.0);
        assert!(in_bounds(&clamped));
    }

    #[test]
    fn test_diff_lists_only_changed_fields() {
        let old = Parameters::default();
        let mut new = old;
        new.max_tasks = 6;
        new.coach_enabled = false;

        let deltas = Parameters::diff(&old, &new);
        assert_eq!(deltas.len(), 2);
        assert_eq!(
            deltas[0],
            ParameterDelta::MaxTasks { old: 5, new: 6 }
        );
        assert_eq!(
            deltas[1],
            ParameterDelta::CoachEnabled {
                old: true,
                new: false
            }
        );
    }

    #[test]
    fn test_diff_of_identical_params_is_empty() {
        let params = Parameters::default();
        assert!(Parameters::diff(&params, &params).is_empty());
    }

    #[test]
    fn test_apply_then_invert_restores_original() {
        let original = Parameters::default();
        let mut adjusted = original;
        adjusted.max_tasks = 6;
        adjusted.strictness = 0.4;
        adjusted.coach_enabled = false;

        let deltas = Parameters::diff(&original, &adjusted);
        let mut forward = original;
        for delta in &deltas {
            forward = delta.apply_to(forward);
        }
        assert_eq!(forward, adjusted);

        let mut back = forward;
        for delta in &deltas {
            back = delta.invert().apply_to(back);
        }
        assert_eq!(back, original);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let delta = ParameterDelta::MaxTasks { old: 5, new: 9 };
        assert!(matches!(
            delta.validate(),
            Err(MetisError::InvalidParameterValue {
                parameter: "max_tasks",
                ..
            })
        ));

        let delta = ParameterDelta::Strictness {
            old: 0.5,
            new: f64::NAN,
        };
        assert!(delta.validate().is_err());

        let delta = ParameterDelta::SessionBuffer { old: 10, new: 200 };
        assert!(delta.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_in_range() {
        assert!(ParameterDelta::MaxTasks { old: 5, new: 6 }.validate().is_ok());
        assert!(ParameterDelta::Strictness { old: 0.5, new: 0.3 }
            .validate()
            .is_ok());
        assert!(ParameterDelta::CoachEnabled {
            old: true,
            new: false
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_delta_serialization_carries_field_tag() {
        let delta = ParameterDelta::Strictness { old: 0.5, new: 0.4 };
        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.contains("\"parameter\":\"strictness\""));

        let back: ParameterDelta = serde_json::from_str(&json).unwrap();
        assert_eq!(delta, back);
    }

    proptest! {
        #[test]
        fn prop_clamp_is_total_and_idempotent(
            max_tasks in any::<u32>(),
            strictness in any::<f64>(),
            coach_frequency in any::<f64>(),
            session_buffer in any::<u32>(),
            estimation_factor in any::<f64>(),
        ) {
            let params = Parameters {
                max_tasks,
                strictness,
                coach_frequency,
                session_buffer_minutes: session_buffer,
                estimation_factor,
                ..Default::default()
            };

            let once = params.clamped();
            prop_assert!(in_bounds(&once));
            prop_assert_eq!(once, once.clamped());
        }

        #[test]
        fn prop_invert_is_an_involution(old in -10.0..10.0f64, new in -10.0..10.0f64) {
            let delta = ParameterDelta::Strictness { old, new };
            prop_assert_eq!(delta.invert().invert(), delta);
        }

        #[test]
        fn prop_invert_swaps_max_tasks(old in 0u32..20, new in 0u32..20) {
            let delta = ParameterDelta::MaxTasks { old, new };
            prop_assert_eq!(
                delta.invert(),
                ParameterDelta::MaxTasks { old: new, new: old }
            );
        }
    }
}
