//! Weekly signal aggregation
//!
//! Reduces a window of behavioral signals into per-kind counts and ratios,
//! forced-task breakdowns, overrun statistics, mode-transition tallies, and
//! the derived boolean flags the rule engine consumes. The aggregate is
//! ephemeral: derived fresh each cycle, never persisted.

use chrono::{Datelike, NaiveDate, Timelike};

use crate::types::{AdaptationSignal, EnergyLevel, Mode, SignalKind, TimeOfDay};

/// Overrun length assumed when a session-overrun signal carries no duration
pub const DEFAULT_OVERRUN_MINUTES: f64 = 15.0;

/// Forced-task ratio above which the user is fighting the plan
pub const FLEXIBILITY_RATIO: f64 = 0.6;

/// Forced-task ratio below which (combined with heavy rejection) the user
/// wants firmer structure
pub const STRUCTURE_FORCED_MAX: f64 = 0.1;

/// Rejected-suggestion ratio above which coaching is being tuned out
pub const STRUCTURE_REJECTED_MIN: f64 = 0.7;

/// Energy-mismatch ratio above which forecasts are considered off
pub const ENERGY_OFF_RATIO: f64 = 0.3;

/// Mode-override ratio above which the default mode is considered wrong
pub const MODE_MISMATCH_RATIO: f64 = 0.3;

/// Count and share of one signal kind within the window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KindStats {
    pub count: usize,
    /// count / max(total, 1)
    pub ratio: f64,
}

/// A `from -> to` mode switch observed in a mode-override signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: Mode,
    pub to: Mode,
}

/// Per-cycle reduction of a signal window
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationAggregate {
    /// Total signals in the window
    pub total: usize,

    pub forced_tasks: KindStats,
    pub rejected_suggestions: KindStats,
    pub overrun_sessions: KindStats,
    pub mode_overrides: KindStats,
    pub energy_mismatches: KindStats,

    /// Forced tasks bucketed by energy level, first-seen order
    pub forced_by_energy: Vec<(EnergyLevel, usize)>,

    /// Forced tasks bucketed by active mode, first-seen order
    pub forced_by_mode: Vec<(Mode, usize)>,

    /// Mean overrun length in minutes (0 when no overruns)
    pub avg_overrun_minutes: f64,

    /// Most frequent overrun time-of-day bucket, ties broken by the order
    /// the bucket first entered the tally
    pub peak_overrun_period: Option<TimeOfDay>,

    /// Mode transitions observed, first-seen order
    pub mode_transitions: Vec<(ModeTransition, usize)>,

    /// Derived flags, evaluated on this window's ratios
    pub needs_more_flexibility: bool,
    pub needs_more_structure: bool,
    pub energy_estimates_off: bool,
    pub mode_mismatch: bool,
}

impl AdaptationAggregate {
    /// Most frequent destination mode across the transition tally
    ///
    /// Destinations are counted in first-seen order and ties keep the
    /// earlier destination, matching the tally's own tie-break.
    pub fn most_frequent_destination(&self) -> Option<Mode> {
        let mut destinations: Vec<(Mode, usize)> = Vec::new();
        for (transition, count) in &self.mode_transitions {
            match destinations.iter_mut().find(|(mode, _)| *mode == transition.to) {
                Some((_, n)) => *n += count,
                None => destinations.push((transition.to, *count)),
            }
        }
        max_by_count(&destinations).map(|(mode, _)| *mode)
    }
}

/// Reduce a signal window into an [`AdaptationAggregate`]
pub fn aggregate_week(signals: &[AdaptationSignal]) -> AdaptationAggregate {
    let total = signals.len();
    let denominator = total.max(1) as f64;

    let stats = |kind: SignalKind| {
        let count = signals.iter().filter(|s| s.kind == kind).count();
        KindStats {
            count,
            ratio: count as f64 / denominator,
        }
    };

    let forced_tasks = stats(SignalKind::ForcedTask);
    let rejected_suggestions = stats(SignalKind::RejectedSuggestion);
    let overrun_sessions = stats(SignalKind::SessionOverrun);
    let mode_overrides = stats(SignalKind::ModeOverride);
    let energy_mismatches = stats(SignalKind::EnergyMismatch);

    // Forced-task breakdowns by energy and by mode
    let mut forced_by_energy: Vec<(EnergyLevel, usize)> = Vec::new();
    let mut forced_by_mode: Vec<(Mode, usize)> = Vec::new();
    for signal in signals.iter().filter(|s| s.kind == SignalKind::ForcedTask) {
        if let Some(energy) = signal.context.energy {
            bump(&mut forced_by_energy, energy);
        }
        if let Some(mode) = signal.context.mode {
            bump(&mut forced_by_mode, mode);
        }
    }

    // Overrun statistics
    let mut overrun_sum = 0.0;
    let mut overrun_periods: Vec<(TimeOfDay, usize)> = Vec::new();
    for signal in signals
        .iter()
        .filter(|s| s.kind == SignalKind::SessionOverrun)
    {
        overrun_sum += signal
            .context
            .duration_minutes
            .unwrap_or(DEFAULT_OVERRUN_MINUTES);
        let period = signal
            .context
            .time_of_day
            .unwrap_or_else(|| TimeOfDay::from_hour(signal.timestamp.hour()));
        bump(&mut overrun_periods, period);
    }
    let avg_overrun_minutes = if overrun_sessions.count > 0 {
        overrun_sum / overrun_sessions.count as f64
    } else {
        0.0
    };
    let peak_overrun_period = max_by_count(&overrun_periods).map(|(period, _)| *period);

    // Mode transitions; overrides with no recorded source mode cannot
    // contribute a transition
    let mut mode_transitions: Vec<(ModeTransition, usize)> = Vec::new();
    for signal in signals
        .iter()
        .filter(|s| s.kind == SignalKind::ModeOverride)
    {
        if let (Some(from), Some(to)) = (signal.context.previous_mode, signal.context.mode) {
            bump(&mut mode_transitions, ModeTransition { from, to });
        }
    }

    AdaptationAggregate {
        total,
        needs_more_flexibility: forced_tasks.ratio > FLEXIBILITY_RATIO,
        needs_more_structure: forced_tasks.ratio < STRUCTURE_FORCED_MAX
            && rejected_suggestions.ratio > STRUCTURE_REJECTED_MIN,
        energy_estimates_off: energy_mismatches.ratio > ENERGY_OFF_RATIO,
        mode_mismatch: mode_overrides.ratio > MODE_MISMATCH_RATIO,
        forced_tasks,
        rejected_suggestions,
        overrun_sessions,
        mode_overrides,
        energy_mismatches,
        forced_by_energy,
        forced_by_mode,
        avg_overrun_minutes,
        peak_overrun_period,
        mode_transitions,
    }
}

/// ISO-8601 week number of a date
///
/// Defined by shifting the date to the Thursday of its week and counting
/// weeks from the first Thursday of that Thursday's year; chrono's
/// `iso_week` implements exactly this.
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Increment `key`'s tally, inserting it at the back on first sight
fn bump<K: PartialEq>(tally: &mut Vec<(K, usize)>, key: K) {
    match tally.iter_mut().find(|(k, _)| *k == key) {
        Some((_, count)) => *count += 1,
        None => tally.push((key, 1)),
    }
}

/// Entry with the strictly highest count; ties keep the earliest entry
fn max_by_count<K>(tally: &[(K, usize)]) -> Option<&(K, usize)> {
    let mut best: Option<&(K, usize)> = None;
    for entry in tally {
        match best {
            Some((_, count)) if entry.1 <= *count => {}
            _ => best = Some(entry),
        }
    }
    best
}
