// Cycle Scheduler
//
// Drives the adaptation engine on its configured interval: maintenance
// first, then one weekly cycle, with a per-run timeout and a report per
// run. The scheduler owns no state of its own beyond the running flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::engine::AdaptationEngine;
use crate::error::MetisError;
use crate::types::AdaptationProposal;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Cycle run timed out")]
    Timeout,

    #[error("Cycle run failed: {0}")]
    CycleFailed(#[from] MetisError),
}

/// Report generated after one scheduled run
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Proposal produced by the cycle, if any (applied or pending)
    pub proposal: Option<AdaptationProposal>,

    /// Signals pruned by the maintenance pass
    pub signals_pruned: usize,

    /// Wall-clock duration of the run
    pub duration: std::time::Duration,
}

/// Periodic driver for the adaptation engine
pub struct GovernanceScheduler {
    engine: Arc<AdaptationEngine>,
    running: Arc<AtomicBool>,
}

impl GovernanceScheduler {
    pub fn new(engine: Arc<AdaptationEngine>) -> Self {
        Self {
            engine,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the scheduler (runs until stopped)
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let config = self.engine.config().clone();
        if !config.enabled {
            tracing::info!("adaptation scheduling disabled by configuration");
            self.running.store(false, Ordering::SeqCst);
            return Ok(());
        }

        tracing::info!(interval = ?config.cycle.interval, "starting governance scheduler");

        loop {
            sleep(config.cycle.interval).await;
            if !self.running.load(Ordering::SeqCst) {
                tracing::info!("stopping governance scheduler");
                break;
            }

            match self.run_once().await {
                Ok(report) => {
                    tracing::info!(
                        pruned = report.signals_pruned,
                        produced_proposal = report.proposal.is_some(),
                        duration = ?report.duration,
                        "scheduled cycle complete"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduled cycle failed");
                }
            }
        }

        Ok(())
    }

    /// Stop the scheduler after the current run
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run maintenance plus one cycle, bounded by the configured timeout
    pub async fn run_once(&self) -> Result<CycleReport, SchedulerError> {
        let start = Instant::now();
        let max_duration = self.engine.config().cycle.max_duration;

        let result = timeout(max_duration, async {
            let signals_pruned = self.engine.run_maintenance().await?;
            let proposal = self.engine.run_weekly_adaptation().await?;
            Ok::<_, MetisError>((signals_pruned, proposal))
        })
        .await;

        match result {
            Ok(Ok((signals_pruned, proposal))) => Ok(CycleReport {
                proposal,
                signals_pruned,
                duration: start.elapsed(),
            }),
            Ok(Err(e)) => Err(SchedulerError::CycleFailed(e)),
            Err(_) => Err(SchedulerError::Timeout),
        }
    }
}
