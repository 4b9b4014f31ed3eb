//! Wiring of the loops and their channels.

use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::LoopConfig;
use crate::lifecycle::Shutdown;
use crate::reconciler::accounts::AccountLoop;
use crate::reconciler::funds::FundsLoop;
use crate::reconciler::journal::SubmissionJournal;
use crate::reconciler::pending::LoopStatus;
use crate::reconciler::reporter::StatusReporter;
use crate::reconciler::runner::{drive, Collaborators};

/// Read-only view of a running reconciler.
#[derive(Clone)]
pub struct ReconcilerHandle {
    pub accounts: watch::Receiver<LoopStatus>,
    pub funds: watch::Receiver<LoopStatus>,
    pub journal: SubmissionJournal,
    pub started_at: Instant,
}

impl ReconcilerHandle {
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Builds and starts the account, funds and status loops.
pub struct Reconciler {
    ctx: Collaborators,
    config: LoopConfig,
}

impl Reconciler {
    pub fn new(ctx: Collaborators, config: LoopConfig) -> Self {
        Self { ctx, config }
    }

    /// Spawn all loops. They stop after `shutdown` is triggered.
    pub fn spawn(self, shutdown: &Shutdown) -> (ReconcilerHandle, Vec<JoinHandle<()>>) {
        let (reroute_tx, reroute_rx) = mpsc::unbounded_channel();
        let (accounts_tx, accounts_rx) = watch::channel(LoopStatus::default());
        let (funds_tx, funds_rx) = watch::channel(LoopStatus::default());

        let handle = ReconcilerHandle {
            accounts: accounts_rx.clone(),
            funds: funds_rx.clone(),
            journal: self.ctx.journal.clone(),
            started_at: Instant::now(),
        };

        let accounts = AccountLoop::new(
            self.ctx.clone(),
            reroute_rx,
            self.config.account_resubmit_after_secs,
        );
        let funds = FundsLoop::new(self.ctx, reroute_tx);
        let reporter = StatusReporter::new(accounts_rx, funds_rx);

        let tasks = vec![
            tokio::spawn(drive(
                accounts,
                Duration::from_secs(self.config.account_interval_secs),
                accounts_tx,
                shutdown.subscribe(),
            )),
            tokio::spawn(drive(
                funds,
                Duration::from_secs(self.config.funds_interval_secs),
                funds_tx,
                shutdown.subscribe(),
            )),
            tokio::spawn(reporter.run(
                Duration::from_secs(self.config.status_interval_secs),
                shutdown.subscribe(),
            )),
        ];

        tracing::info!(
            account_interval_secs = self.config.account_interval_secs,
            funds_interval_secs = self.config.funds_interval_secs,
            status_interval_secs = self.config.status_interval_secs,
            "Reconciler started"
        );

        (handle, tasks)
    }
}
