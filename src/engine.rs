//! Adaptation engine: signal ingestion, the weekly cycle, consent, rollback
//!
//! [`AdaptationEngine`] is an explicit instance owning its parameters,
//! signal log, audit trail, drift history, and pending proposals; there is
//! no global state. One engine serves one user.
//!
//! The weekly cycle runs as an explicit state machine:
//!
//! ```text
//! Idle -> CheckObservationWindow -> CheckAbuse -> CheckTransparencyBudget
//!      -> Aggregate -> DeriveRules -> ComputeDelta -> (no delta: Idle)
//!      -> Validate -> (consent required: PendingConsent, else)
//!      -> Apply -> RecordHistory -> TrackDrift -> Idle
//! ```
//!
//! `PendingConsent` resolves externally through [`AdaptationEngine::resolve_consent`];
//! the cycle itself never blocks on the user.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::aggregate::{aggregate_week, AdaptationAggregate};
use crate::config::GovernanceConfig;
use crate::error::{MetisError, Result};
use crate::governance::drift::{DriftMonitor, DriftReport, ProgressiveDriftReport};
use crate::governance::gates::{self, GateDecision};
use crate::governance::history::AdaptationLog;
use crate::governance::rollback::{invert_deltas, validate_deltas};
use crate::governance::validation::build_proposal;
use crate::params::{ParameterDelta, Parameters};
use crate::rules::{derive_adjustments, AdjustmentOutcome};
use crate::signals::SignalLog;
use crate::storage::AdaptationStore;
use crate::types::{
    AdaptationId, AdaptationProposal, AdaptationRecord, AdaptationSignal, ConsentDecision,
    ConsentState, ProposalId,
};

/// Setting key under which current parameters are persisted
pub const PARAMS_SETTING_KEY: &str = "adaptation.params";

/// Cycle-critical state guarded by the per-user cycle mutex
struct CycleCore {
    params: Parameters,
    history: AdaptationLog,
    drift: DriftMonitor,
    pending: Vec<AdaptationProposal>,
    applied: HashSet<ProposalId>,
}

/// Weekly cycle states; gates and terminal outcomes exit the loop
enum CycleState {
    CheckObservationWindow,
    CheckAbuse,
    CheckTransparencyBudget,
    Aggregate,
    DeriveRules(AdaptationAggregate),
    ComputeDelta(AdjustmentOutcome),
    Validate(AdjustmentOutcome),
    Apply(AdaptationProposal),
    RecordHistory(AdaptationProposal),
    TrackDrift(AdaptationProposal),
}

/// The adaptive parameter governance engine
///
/// Signal recording interleaves freely with everything else; the weekly
/// cycle, maintenance, consent application, and rollback all serialize on
/// one internal mutex so no two of them observe intermediate state.
pub struct AdaptationEngine {
    config: GovernanceConfig,
    store: Arc<dyn AdaptationStore>,
    signals: RwLock<SignalLog>,
    cycle: Mutex<CycleCore>,
}

impl AdaptationEngine {
    /// Create an engine with default parameters
    pub fn new(config: GovernanceConfig, store: Arc<dyn AdaptationStore>) -> Self {
        let signals = SignalLog::new(config.signals.max_entries);
        let core = CycleCore {
            params: Parameters::default().clamped(),
            history: AdaptationLog::new(config.history_cap),
            drift: DriftMonitor::new(config.drift_cap),
            pending: Vec::new(),
            applied: HashSet::new(),
        };
        Self {
            config,
            store,
            signals: RwLock::new(signals),
            cycle: Mutex::new(core),
        }
    }

    /// Create an engine, restoring persisted parameters when present
    pub async fn restore(
        config: GovernanceConfig,
        store: Arc<dyn AdaptationStore>,
    ) -> Result<Self> {
        let engine = Self::new(config, store);
        if let Some(value) = engine.store.get_setting(PARAMS_SETTING_KEY).await? {
            let params: Parameters = serde_json::from_value(value)?;
            engine.cycle.lock().await.params = params.clamped();
            tracing::info!("restored persisted parameters");
        }
        Ok(engine)
    }

    /// Engine configuration
    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Record a behavioral signal (fire-and-forget ingestion)
    ///
    /// The in-memory log always advances; a failed persistence write is
    /// logged and the engine carries on (at-least-once, not exactly-once).
    pub async fn record_signal(&self, signal: AdaptationSignal) {
        self.signals.write().await.record(signal.clone());
        if let Err(e) = self.store.add_adaptation_signal(&signal).await {
            tracing::warn!(error = %e, "failed to persist signal; in-memory log continues");
        }
    }

    /// Number of signals currently held in the log
    pub async fn signal_count(&self) -> usize {
        self.signals.read().await.len()
    }

    /// Execute one adaptation cycle
    ///
    /// Returns `None` when a gate tripped or no parameter changed, an
    /// applied proposal when changes landed without consent, or a pending
    /// proposal awaiting [`AdaptationEngine::resolve_consent`].
    pub async fn run_weekly_adaptation(&self) -> Result<Option<AdaptationProposal>> {
        let mut core = self.cycle.lock().await;
        let now = Utc::now();
        let signals = self.signals.read().await.snapshot();

        tracing::info!(signals = signals.len(), "starting adaptation cycle");

        let mut state = CycleState::CheckObservationWindow;
        loop {
            state = match state {
                CycleState::CheckObservationWindow => {
                    match gates::observation_window(signals.len()) {
                        GateDecision::Proceed => CycleState::CheckAbuse,
                        GateDecision::Skip(reason) => {
                            tracing::info!(%reason, "adaptation cycle skipped");
                            return Ok(None);
                        }
                    }
                }
                CycleState::CheckAbuse => match gates::abuse_freeze(&signals, now) {
                    GateDecision::Proceed => CycleState::CheckTransparencyBudget,
                    GateDecision::Skip(reason) => {
                        tracing::info!(%reason, "adaptation cycle skipped");
                        return Ok(None);
                    }
                },
                CycleState::CheckTransparencyBudget => {
                    let recent = core
                        .history
                        .applied_within(now, gates::TRANSPARENCY_WINDOW_DAYS);
                    match gates::transparency_budget(recent) {
                        GateDecision::Proceed => CycleState::Aggregate,
                        GateDecision::Skip(reason) => {
                            tracing::info!(%reason, "adaptation cycle skipped");
                            return Ok(None);
                        }
                    }
                }
                CycleState::Aggregate => CycleState::DeriveRules(aggregate_week(&signals)),
                CycleState::DeriveRules(aggregate) => {
                    CycleState::ComputeDelta(derive_adjustments(&aggregate, core.params))
                }
                CycleState::ComputeDelta(outcome) => {
                    if outcome.deltas.is_empty() {
                        tracing::debug!("no parameter changes derived this cycle");
                        let params = core.params;
                        core.drift.track(params, now);
                        return Ok(None);
                    }
                    CycleState::Validate(outcome)
                }
                CycleState::Validate(outcome) => {
                    let reason = outcome.reason();
                    let proposal = build_proposal(outcome.deltas, reason, now);
                    if proposal.consent_required {
                        tracing::info!(
                            proposal = %proposal.id,
                            changes = proposal.proposed_changes.len(),
                            "proposal held pending consent"
                        );
                        core.pending.push(proposal.clone());
                        let params = core.params;
                        core.drift.track(params, now);
                        return Ok(Some(proposal));
                    }
                    CycleState::Apply(proposal)
                }
                CycleState::Apply(mut proposal) => {
                    proposal.consent = ConsentState::Accepted;
                    validate_deltas(&proposal.proposed_changes)?;
                    core.params = apply_deltas(core.params, &proposal.proposed_changes);
                    self.persist_params(core.params).await;
                    CycleState::RecordHistory(proposal)
                }
                CycleState::RecordHistory(proposal) => {
                    self.record_applied(&mut core, &proposal, false, now).await;
                    CycleState::TrackDrift(proposal)
                }
                CycleState::TrackDrift(proposal) => {
                    let params = core.params;
                    core.drift.track(params, now);
                    tracing::info!(
                        proposal = %proposal.id,
                        reason = %proposal.reason,
                        "adaptation applied"
                    );
                    return Ok(Some(proposal));
                }
            };
        }
    }

    /// Idempotently commit an already-validated proposal
    ///
    /// Re-applying a proposal that has already landed is a no-op. A delta
    /// failing per-field validation aborts the whole commit (fail-closed).
    pub async fn apply_proposal(&self, proposal: &AdaptationProposal) -> Result<()> {
        let mut core = self.cycle.lock().await;
        if core.applied.contains(&proposal.id) {
            tracing::debug!(proposal = %proposal.id, "proposal already applied");
            return Ok(());
        }

        let user_consented =
            proposal.consent_required && proposal.consent == ConsentState::Accepted;
        self.commit(&mut core, proposal, user_consented, Utc::now())
            .await?;
        Ok(())
    }

    /// Resolve a pending proposal with an external consent decision
    ///
    /// Accept applies it in full, reject discards it, postpone leaves it
    /// pending and retrievable for a later decision.
    pub async fn resolve_consent(
        &self,
        proposal_id: ProposalId,
        decision: ConsentDecision,
    ) -> Result<AdaptationProposal> {
        let mut core = self.cycle.lock().await;
        let index = core
            .pending
            .iter()
            .position(|p| p.id == proposal_id)
            .ok_or_else(|| MetisError::ProposalNotFound(proposal_id.to_string()))?;

        match decision {
            ConsentDecision::Accept => {
                let mut proposal = core.pending[index].clone();
                proposal.consent = ConsentState::Accepted;
                self.commit(&mut core, &proposal, true, Utc::now()).await?;
                tracing::info!(proposal = %proposal.id, "consent accepted, changes applied");
                Ok(proposal)
            }
            ConsentDecision::Reject => {
                let mut proposal = core.pending.remove(index);
                proposal.consent = ConsentState::Rejected;
                tracing::info!(proposal = %proposal.id, "consent rejected, proposal discarded");
                Ok(proposal)
            }
            ConsentDecision::Postpone => {
                tracing::debug!(proposal = %proposal_id, "consent postponed");
                Ok(core.pending[index].clone())
            }
        }
    }

    /// Roll back a previously applied adaptation by inverting its deltas
    ///
    /// All-or-nothing: any inverted value failing its field's validation
    /// aborts the rollback with prior state untouched. The reversal is
    /// recorded as a new audit entry and the original record's `reverted`
    /// flag flips.
    pub async fn rollback(&self, adaptation_id: AdaptationId) -> Result<AdaptationRecord> {
        let mut core = self.cycle.lock().await;
        let record = core
            .history
            .find(adaptation_id)
            .cloned()
            .ok_or_else(|| MetisError::AdaptationNotFound(adaptation_id.to_string()))?;

        if record.reverted {
            return Err(MetisError::InvalidOperation(format!(
                "adaptation {} is already reverted",
                adaptation_id
            )));
        }

        let inverted = invert_deltas(&record.changes);
        validate_deltas(&inverted)?;

        let now = Utc::now();
        core.params = apply_deltas(core.params, &inverted);
        self.persist_params(core.params).await;

        let reversal = AdaptationRecord {
            id: AdaptationId::new(),
            timestamp: now,
            changes: inverted,
            quality_before: None,
            quality_after: None,
            user_consented: true,
            reverted: false,
        };
        core.history.record(reversal.clone());
        if let Err(e) = self.store.record_adaptation_history(&reversal).await {
            tracing::warn!(error = %e, "failed to persist reversal record");
        }

        core.history.mark_reverted(adaptation_id)?;
        if let Err(e) = self.store.mark_adaptation_reverted(adaptation_id).await {
            tracing::warn!(error = %e, "failed to persist reverted flag");
        }

        let params = core.params;
        core.drift.track(params, now);
        tracing::info!(
            adaptation = %adaptation_id,
            reversal = %reversal.id,
            "adaptation rolled back"
        );
        Ok(reversal)
    }

    /// Age-based signal pruning (scheduled maintenance)
    ///
    /// Takes the same exclusion as the weekly cycle so pruning never runs
    /// mid-aggregation. Returns how many in-memory signals were dropped.
    pub async fn run_maintenance(&self) -> Result<usize> {
        let _core = self.cycle.lock().await;

        let max_age_days = self.config.signals.max_age_days;
        let cutoff = Utc::now() - ChronoDuration::days(max_age_days as i64);
        let removed = self.signals.write().await.prune_older_than(cutoff);

        let max_age = Duration::from_secs(u64::from(max_age_days) * 86_400);
        match self
            .store
            .prune_adaptation_signals(max_age, self.config.signals.max_entries)
            .await
        {
            Ok(deleted) => tracing::debug!(deleted, "pruned persisted signals"),
            Err(e) => tracing::warn!(error = %e, "failed to prune persisted signals"),
        }

        if removed > 0 {
            tracing::info!(removed, "pruned aged signals from log");
        }
        Ok(removed)
    }

    /// Defensive copy of the current parameters
    pub async fn current_params(&self) -> Parameters {
        self.cycle.lock().await.params
    }

    /// Pending proposals awaiting consent, newest last
    pub async fn pending_proposals(&self) -> Vec<AdaptationProposal> {
        self.cycle.lock().await.pending.clone()
    }

    /// False iff parameter drift is currently detected
    pub async fn check_invariants(&self) -> bool {
        self.cycle.lock().await.drift.detect_drift().is_none()
    }

    /// Current short-term drift report, if any
    pub async fn drift_report(&self) -> Option<DriftReport> {
        self.cycle.lock().await.drift.detect_drift()
    }

    /// Current multi-week strictness trend, if any
    pub async fn progressive_drift_report(&self) -> Option<ProgressiveDriftReport> {
        self.cycle.lock().await.drift.detect_progressive_drift()
    }

    /// Defensive copy of the audit trail, oldest first
    pub async fn history(&self) -> Vec<AdaptationRecord> {
        self.cycle.lock().await.history.snapshot()
    }

    /// Export the audit trail as JSON
    pub async fn export_history(&self) -> Result<String> {
        self.cycle.lock().await.history.export_json()
    }

    /// Audit-trail transparency self-check
    pub async fn audit_self_check(&self) -> bool {
        self.cycle.lock().await.history.self_check()
    }

    /// Validate, apply, record, and track one proposal
    async fn commit(
        &self,
        core: &mut CycleCore,
        proposal: &AdaptationProposal,
        user_consented: bool,
        now: DateTime<Utc>,
    ) -> Result<AdaptationRecord> {
        validate_deltas(&proposal.proposed_changes)?;

        core.params = apply_deltas(core.params, &proposal.proposed_changes);
        self.persist_params(core.params).await;
        let record = self
            .record_applied(core, proposal, user_consented, now)
            .await;
        core.drift.track(core.params, now);
        Ok(record)
    }

    /// Append and persist the audit record for an applied proposal
    async fn record_applied(
        &self,
        core: &mut CycleCore,
        proposal: &AdaptationProposal,
        user_consented: bool,
        now: DateTime<Utc>,
    ) -> AdaptationRecord {
        let record = AdaptationRecord {
            id: AdaptationId::new(),
            timestamp: now,
            changes: proposal.proposed_changes.clone(),
            quality_before: None,
            quality_after: None,
            user_consented,
            reverted: false,
        };
        core.history.record(record.clone());
        if let Err(e) = self.store.record_adaptation_history(&record).await {
            tracing::warn!(error = %e, "failed to persist audit record; in-memory trail continues");
        }

        core.applied.insert(proposal.id);
        core.pending.retain(|p| p.id != proposal.id);
        record
    }

    /// Best-effort write-through of the current parameters
    async fn persist_params(&self, params: Parameters) {
        match serde_json::to_value(params) {
            Ok(value) => {
                if let Err(e) = self.store.set_setting(PARAMS_SETTING_KEY, value).await {
                    tracing::warn!(error = %e, "failed to persist parameters; retrying on next change");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize parameters"),
        }
    }
}

/// Apply deltas to a working copy and clamp the result as a whole
fn apply_deltas(params: Parameters, deltas: &[ParameterDelta]) -> Parameters {
    let mut working = params;
    for delta in deltas {
        working = delta.apply_to(working);
    }
    working.clamped()
}
