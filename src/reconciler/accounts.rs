//! Account-creation loop.
//!
//! Moves `open` requests to `pending` once their account exists on chain or
//! an account-creation transaction for them was accepted.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::blockchain::TxKind;
use crate::observability::metrics;
use crate::reconciler::journal::JournalEntry;
use crate::reconciler::pending::{CycleStats, PendingSet};
use crate::reconciler::runner::{Collaborators, ReconcileLoop};
use crate::reconciler::ReconcileError;
use crate::requests::{Candidate, RequestStatus};

pub struct AccountLoop {
    ctx: Collaborators,
    pending: PendingSet,
    reroutes: mpsc::UnboundedReceiver<Candidate>,
    resubmit_after_secs: u64,
}

impl AccountLoop {
    pub fn new(
        ctx: Collaborators,
        reroutes: mpsc::UnboundedReceiver<Candidate>,
        resubmit_after_secs: u64,
    ) -> Self {
        Self {
            ctx,
            pending: PendingSet::new(),
            reroutes,
            resubmit_after_secs,
        }
    }

    /// Requests handed over by the funds loop since the last cycle.
    fn drain_reroutes(&mut self) -> Vec<Candidate> {
        let mut rerouted = Vec::new();
        while let Ok(candidate) = self.reroutes.try_recv() {
            rerouted.push(candidate);
        }
        rerouted
    }

    /// Returns whether a transaction was submitted on the way to `pending`.
    async fn process(&mut self, candidate: Candidate) -> Result<bool, ReconcileError> {
        let Candidate { id, address } = candidate;

        let mut submitted = false;
        if self.ctx.chain.fetch_account(&address).await?.is_some() {
            tracing::debug!(request_id = id, address = %address, "Account already exists");
        } else if self
            .ctx
            .journal
            .has_recent(id, TxKind::AccountCreate, self.resubmit_after_secs)
        {
            tracing::info!(
                request_id = id,
                address = %address,
                "Account creation already submitted, retrying status update"
            );
        } else {
            let tx = self.ctx.builder.build_account_create(address);
            let result = self.ctx.submitter.submit(&tx).await;
            metrics::record_submission(TxKind::AccountCreate.as_str(), result.is_ok());
            let receipt = result?;

            tracing::info!(
                request_id = id,
                address = %address,
                tx_hash = ?receipt.hash,
                "Account creation submitted"
            );
            self.ctx
                .journal
                .record(id, JournalEntry::from_receipt(&receipt, address, 0));
            submitted = true;
        }

        self.ctx.requests.push_status(id, RequestStatus::Pending).await?;
        self.pending.remove(id);
        self.ctx.journal.remove_kind(id, TxKind::AccountCreate);

        Ok(submitted)
    }
}

#[async_trait]
impl ReconcileLoop for AccountLoop {
    fn name(&self) -> &'static str {
        "accounts"
    }

    async fn run_cycle(&mut self) -> Result<CycleStats, ReconcileError> {
        let rerouted = self.drain_reroutes();
        for candidate in &rerouted {
            self.pending.insert(*candidate);
        }

        let candidates = self.ctx.requests.fetch_summary(RequestStatus::Open).await?;
        self.pending.rebuild(&candidates);
        for candidate in rerouted {
            self.pending.insert(candidate);
        }
        let pending = &self.pending;
        self.ctx
            .journal
            .expire(TxKind::AccountCreate, |id| pending.contains(id));

        let mut stats = CycleStats {
            candidates: self.pending.len(),
            ..CycleStats::default()
        };

        for candidate in self.pending.candidates() {
            match self.process(candidate).await {
                Ok(submitted) => {
                    stats.committed += 1;
                    if submitted {
                        stats.submitted += 1;
                    }
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        request_id = candidate.id,
                        error = %e,
                        category = e.category(),
                        "Account request not processed"
                    );
                }
            }
        }

        Ok(stats)
    }

    fn pending(&self) -> Vec<Candidate> {
        self.pending.candidates()
    }
}
