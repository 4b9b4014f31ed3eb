//! Periodic driver shared by the reconciliation loops.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::{ChainQuery, Submitter, TxBuilder};
use crate::observability::metrics;
use crate::reconciler::journal::SubmissionJournal;
use crate::reconciler::pending::{CycleReport, CycleStats, LoopStatus};
use crate::reconciler::ReconcileError;
use crate::requests::{Candidate, RequestService};

/// Everything a loop talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub requests: Arc<dyn RequestService>,
    pub chain: Arc<dyn ChainQuery>,
    pub submitter: Arc<dyn Submitter>,
    pub builder: TxBuilder,
    pub journal: SubmissionJournal,
}

/// One reconciliation loop.
#[async_trait]
pub trait ReconcileLoop: Send {
    /// Loop name for spans, logs and metric labels.
    fn name(&self) -> &'static str;

    /// Run one full pass over the loop's candidates.
    ///
    /// An `Err` means the cycle could not run at all (e.g. the summary
    /// fetch failed). Per-request failures are counted in the stats.
    async fn run_cycle(&mut self) -> Result<CycleStats, ReconcileError>;

    /// Current working set.
    fn pending(&self) -> Vec<Candidate>;
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Run one cycle inside its own span and publish the outcome.
pub async fn run_once<L: ReconcileLoop>(looper: &mut L, status: &watch::Sender<LoopStatus>) -> CycleReport {
    let name = looper.name();
    let cycle_id = Uuid::new_v4();
    let span = tracing::info_span!("cycle", loop_name = name, cycle_id = %cycle_id);

    let result = looper.run_cycle().instrument(span.clone()).await;

    let report = match result {
        Ok(stats) => {
            span.in_scope(|| {
                tracing::info!(
                    candidates = stats.candidates,
                    committed = stats.committed,
                    submitted = stats.submitted,
                    rerouted = stats.rerouted,
                    failed = stats.failed,
                    "Cycle complete"
                )
            });
            CycleReport {
                cycle_id,
                finished_at: now_secs(),
                stats,
                error: None,
            }
        }
        Err(e) => {
            span.in_scope(|| {
                tracing::warn!(error = %e, category = e.category(), "Cycle skipped")
            });
            CycleReport {
                cycle_id,
                finished_at: now_secs(),
                stats: CycleStats::default(),
                error: Some(e.to_string()),
            }
        }
    };

    let pending = looper.pending();
    metrics::record_cycle(name, report.error.is_none());
    metrics::record_pending(name, pending.len());
    status.send_replace(LoopStatus {
        pending,
        last_cycle: Some(report.clone()),
    });

    report
}

/// Run cycles every `period` until shutdown is signalled.
///
/// The first cycle starts immediately. Shutdown is only observed between
/// cycles, so a cycle in progress always finishes.
pub async fn drive<L: ReconcileLoop>(
    mut looper: L,
    period: Duration,
    status: watch::Sender<LoopStatus>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(loop_name = looper.name(), period_secs = period.as_secs(), "Loop started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                run_once(&mut looper, &status).await;
            }
        }
    }

    tracing::info!(loop_name = looper.name(), "Loop stopped");
}
