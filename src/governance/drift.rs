//! Parameter drift detection
//!
//! Tracks timestamped parameter snapshots and watches for two patterns:
//! a short-term shift of the recent average away from an older baseline,
//! and a slow multi-week trend in `strictness`. Detection is advisory;
//! absence of drift is `None`, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::params::Parameters;

/// Snapshots compared in the recent window
pub const RECENT_WINDOW: usize = 7;

/// Baseline window: snapshots 14 to 21 entries back
pub const BASELINE_OFFSET: (usize, usize) = (14, 21);

/// Absolute strictness shift that counts as drift
pub const STRICTNESS_DRIFT_THRESHOLD: f64 = 0.2;

/// Absolute task-count shift that counts as drift
pub const MAX_TASKS_DRIFT_THRESHOLD: f64 = 1.0;

/// Snapshots required before progressive-trend detection engages
pub const PROGRESSIVE_MIN_SNAPSHOTS: usize = 28;

/// Summed week-over-week strictness movement that counts as a trend
pub const PROGRESSIVE_TREND_THRESHOLD: f64 = 0.3;

/// Which way a parameter moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftDirection {
    Up,
    Down,
}

/// Parameters the drift monitor watches, in checked order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedParameter {
    Strictness,
    MaxTasks,
}

impl WatchedParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchedParameter::Strictness => "strictness",
            WatchedParameter::MaxTasks => "max_tasks",
        }
    }
}

/// A short-term deviation of the recent average from the baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub parameter: WatchedParameter,
    /// Absolute difference between recent and baseline means
    pub drift: f64,
    pub direction: DriftDirection,
}

/// A multi-week progressive strictness trend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressiveDriftReport {
    /// Summed week-over-week movement across four trailing weeks
    pub trend: f64,
    pub direction: DriftDirection,
}

/// A parameter state captured at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub params: Parameters,
    pub timestamp: DateTime<Utc>,
}

/// Tracks parameter history and detects deviation from baseline
#[derive(Debug)]
pub struct DriftMonitor {
    snapshots: VecDeque<ParameterSnapshot>,
    cap: usize,
}

impl DriftMonitor {
    /// Create a monitor holding at most `cap` snapshots
    pub fn new(cap: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Append a snapshot, evicting the oldest past the cap
    pub fn track(&mut self, params: Parameters, now: DateTime<Utc>) {
        if self.snapshots.len() >= self.cap {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(ParameterSnapshot {
            params,
            timestamp: now,
        });
    }

    /// Number of snapshots currently held
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Compare the recent mean against the baseline mean per watched
    /// parameter; report the first breach in checked order
    ///
    /// Needs at least [`RECENT_WINDOW`] snapshots and a non-empty baseline
    /// window (snapshots 14 to 21 entries back).
    pub fn detect_drift(&self) -> Option<DriftReport> {
        let len = self.snapshots.len();
        if len < RECENT_WINDOW {
            return None;
        }

        let baseline_start = len.saturating_sub(BASELINE_OFFSET.1);
        let baseline_end = len.saturating_sub(BASELINE_OFFSET.0);
        if baseline_start >= baseline_end {
            return None;
        }

        let watched = [
            (WatchedParameter::Strictness, STRICTNESS_DRIFT_THRESHOLD),
            (WatchedParameter::MaxTasks, MAX_TASKS_DRIFT_THRESHOLD),
        ];

        for (parameter, threshold) in watched {
            let recent = self.mean_of(len - RECENT_WINDOW..len, parameter);
            let baseline = self.mean_of(baseline_start..baseline_end, parameter);
            let drift = (recent - baseline).abs();

            if drift > threshold {
                let direction = if recent > baseline {
                    DriftDirection::Up
                } else {
                    DriftDirection::Down
                };
                tracing::debug!(
                    parameter = parameter.as_str(),
                    drift,
                    ?direction,
                    "parameter drift detected"
                );
                return Some(DriftReport {
                    parameter,
                    drift,
                    direction,
                });
            }
        }

        None
    }

    /// Detect a slow strictness trend across four trailing weeks
    ///
    /// Computes four trailing weekly means (most recent week first) and
    /// sums the week-over-week deltas; a total movement beyond the
    /// threshold is a progressive trend.
    pub fn detect_progressive_drift(&self) -> Option<ProgressiveDriftReport> {
        let len = self.snapshots.len();
        if len < PROGRESSIVE_MIN_SNAPSHOTS {
            return None;
        }

        // weeks[0] is the most recent week
        let mut weeks = [0.0f64; 4];
        for (i, week) in weeks.iter_mut().enumerate() {
            let end = len - i * RECENT_WINDOW;
            let start = end - RECENT_WINDOW;
            *week = self.mean_of(start..end, WatchedParameter::Strictness);
        }

        let trend: f64 = weeks.windows(2).map(|pair| pair[0] - pair[1]).sum();

        if trend.abs() > PROGRESSIVE_TREND_THRESHOLD {
            let direction = if trend > 0.0 {
                DriftDirection::Up
            } else {
                DriftDirection::Down
            };
            tracing::debug!(trend, ?direction, "progressive strictness trend detected");
            Some(ProgressiveDriftReport { trend, direction })
        } else {
            None
        }
    }

    fn mean_of(&self, range: std::ops::Range<usize>, parameter: WatchedParameter) -> f64 {
        let count = range.len().max(1) as f64;
        let sum: f64 = range
            .filter_map(|i| self.snapshots.get(i))
            .map(|snapshot| match parameter {
                WatchedParameter::Strictness => snapshot.params.strictness,
                WatchedParameter::MaxTasks => snapshot.params.max_tasks as f64,
            })
            .sum();
        sum / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor_with_strictness(values: &[f64]) -> DriftMonitor {
        let mut monitor = DriftMonitor::new(90);
        for &strictness in values {
            let params = Parameters {
                strictness,
                ..Default::default()
            };
            monitor.track(params, Utc::now());
        }
        monitor
    }

    #[test]
    fn test_too_few_snapshots() {
        let monitor = monitor_with_strictness(&[0.5; 6]);
        assert!(monitor.detect_drift().is_none());
    }

    #[test]
    fn test_no_baseline_window_yet() {
        // 10 snapshots: a recent window exists but nothing sits 14-21 back
        let monitor = monitor_with_strictness(&[0.5; 10]);
        assert!(monitor.detect_drift().is_none());
    }

    #[test]
    fn test_step_change_reports_up() {
        // 20 days at 0.6, then 10 days at 0.8
        let mut values = vec![0.6; 20];
        values.extend(vec![0.8; 10]);
        let monitor = monitor_with_strictness(&values);

        let report = monitor.detect_drift().expect("drift expected");
        assert_eq!(report.parameter, WatchedParameter::Strictness);
        assert_eq!(report.direction, DriftDirection::Up);
        assert!(report.drift > STRICTNESS_DRIFT_THRESHOLD);
    }

    #[test]
    fn test_step_change_down() {
        let mut values = vec![0.8; 20];
        values.extend(vec![0.5; 10]);
        let monitor = monitor_with_strictness(&values);

        let report = monitor.detect_drift().expect("drift expected");
        assert_eq!(report.direction, DriftDirection::Down);
    }

    #[test]
    fn test_oscillation_within_band_is_not_drift() {
        // 30 days oscillating within +/- 0.05 of 0.6
        let values: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 0.55 } else { 0.65 })
            .collect();
        let monitor = monitor_with_strictness(&values);

        assert!(monitor.detect_drift().is_none());
    }

    #[test]
    fn test_max_tasks_drift_checked_second() {
        let mut monitor = DriftMonitor::new(90);
        for i in 0..30 {
            let params = Parameters {
                max_tasks: if i < 20 { 4 } else { 7 },
                ..Default::default()
            };
            monitor.track(params, Utc::now());
        }

        let report = monitor.detect_drift().expect("drift expected");
        assert_eq!(report.parameter, WatchedParameter::MaxTasks);
        assert_eq!(report.direction, DriftDirection::Up);
    }

    #[test]
    fn test_progressive_needs_four_weeks() {
        let monitor = monitor_with_strictness(&[0.5; 27]);
        assert!(monitor.detect_progressive_drift().is_none());
    }

    #[test]
    fn test_progressive_upward_trend() {
        // Four 7-day blocks stepping 0.40 -> 0.55 -> 0.70 -> 0.85
        let mut values = Vec::new();
        for &step in &[0.40, 0.55, 0.70, 0.85] {
            values.extend(vec![step; 7]);
        }
        let monitor = monitor_with_strictness(&values);

        let report = monitor
            .detect_progressive_drift()
            .expect("progressive drift expected");
        assert_eq!(report.direction, DriftDirection::Up);
        assert!(report.trend > PROGRESSIVE_TREND_THRESHOLD);
    }

    #[test]
    fn test_progressive_flat_history_is_quiet() {
        let monitor = monitor_with_strictness(&[0.6; 35]);
        assert!(monitor.detect_progressive_drift().is_none());
    }

    #[test]
    fn test_snapshot_cap_evicts_oldest() {
        let mut monitor = DriftMonitor::new(90);
        for i in 0..100 {
            let params = Parameters {
                max_tasks: 3 + (i % 5),
                ..Default::default()
            };
            monitor.track(params, Utc::now());
        }
        assert_eq!(monitor.len(), 90);
    }
}
