//! Periodic status report of both working sets.

use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::reconciler::pending::LoopStatus;

pub struct StatusReporter {
    accounts: watch::Receiver<LoopStatus>,
    funds: watch::Receiver<LoopStatus>,
}

impl StatusReporter {
    pub fn new(accounts: watch::Receiver<LoopStatus>, funds: watch::Receiver<LoopStatus>) -> Self {
        Self { accounts, funds }
    }

    /// Log the current snapshots once.
    pub fn report(&self) {
        let accounts = self.accounts.borrow().clone();
        let funds = self.funds.borrow().clone();

        tracing::info!(
            open_accounts = accounts.pending.len(),
            open_funds = funds.pending.len(),
            "Reconciler status"
        );
        for (set, status) in [("accounts", &accounts), ("funds", &funds)] {
            for candidate in &status.pending {
                tracing::info!(
                    set = set,
                    request_id = candidate.id,
                    address = %candidate.address,
                    "Open request"
                );
            }
        }
    }

    pub async fn run(self, period: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = ticker.tick() => self.report(),
            }
        }
    }
}
