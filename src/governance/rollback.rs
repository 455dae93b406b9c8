//! Delta inversion for rollback
//!
//! A rollback reapplies a recorded change backwards: every delta's
//! old/new pair is swapped structurally, then each inverted target value
//! is validated against its field's own constraints before anything is
//! applied. Validation failure on any single field aborts the whole
//! rollback; partial reversals never happen.

use crate::error::Result;
use crate::params::ParameterDelta;

/// Invert a list of deltas, preserving per-field type pairings
pub fn invert_deltas(deltas: &[ParameterDelta]) -> Vec<ParameterDelta> {
    deltas.iter().map(ParameterDelta::invert).collect()
}

/// Validate every delta's target value, all-or-nothing
///
/// Returns the first failure; callers must not apply any of the deltas
/// when this errs.
pub fn validate_deltas(deltas: &[ParameterDelta]) -> Result<()> {
    for delta in deltas {
        delta.validate()?;
    }
    Ok(())
}
