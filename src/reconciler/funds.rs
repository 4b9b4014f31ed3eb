//! Funds-transfer loop.
//!
//! Pays out `fundprocessed` requests and marks them `processed`. Requests
//! whose account is not on chain yet go back to `open` and are handed to the
//! account loop.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::blockchain::TxKind;
use crate::observability::metrics;
use crate::reconciler::journal::JournalEntry;
use crate::reconciler::pending::{CycleStats, PendingSet};
use crate::reconciler::runner::{Collaborators, ReconcileLoop};
use crate::reconciler::ReconcileError;
use crate::requests::{Candidate, RequestStatus};

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Pushed `processed`.
    Paid { submitted: bool },
    /// Pushed `open` and handed to the account loop.
    Rerouted,
    /// Left alone this cycle.
    Skipped,
}

pub struct FundsLoop {
    ctx: Collaborators,
    pending: PendingSet,
    reroutes: mpsc::UnboundedSender<Candidate>,
}

impl FundsLoop {
    pub fn new(ctx: Collaborators, reroutes: mpsc::UnboundedSender<Candidate>) -> Self {
        Self {
            ctx,
            pending: PendingSet::new(),
            reroutes,
        }
    }

    async fn commit_processed(&mut self, id: u64) -> Result<(), ReconcileError> {
        self.ctx.requests.push_status(id, RequestStatus::Processed).await?;
        self.pending.remove(id);
        self.ctx.journal.remove_kind(id, TxKind::FundsTransfer);
        Ok(())
    }

    async fn reroute(&mut self, candidate: Candidate) -> Result<Outcome, ReconcileError> {
        self.ctx.requests.push_status(candidate.id, RequestStatus::Open).await?;
        self.pending.remove(candidate.id);

        if self.reroutes.send(candidate).is_err() {
            tracing::debug!(request_id = candidate.id, "Account loop gone, re-route dropped");
        }
        metrics::record_reroute();
        tracing::info!(
            request_id = candidate.id,
            address = %candidate.address,
            "Account missing, request re-routed to account creation"
        );
        Ok(Outcome::Rerouted)
    }

    async fn process(&mut self, candidate: Candidate) -> Result<Outcome, ReconcileError> {
        let Candidate { id, address } = candidate;

        if let Some(entry) = self.ctx.journal.get_kind(id, TxKind::FundsTransfer) {
            tracing::info!(
                request_id = id,
                tx_hash = entry.tx_hash.as_deref().unwrap_or("unknown"),
                "Transfer already submitted, retrying status update"
            );
            self.commit_processed(id).await?;
            return Ok(Outcome::Paid { submitted: false });
        }

        if self.ctx.chain.fetch_account(&address).await?.is_none() {
            return self.reroute(candidate).await;
        }

        // Only a known status other than fundprocessed contradicts the summary.
        let request = self.ctx.requests.fetch_status(id).await?;
        if !matches!(request.status, RequestStatus::FundProcessed | RequestStatus::Unknown) {
            tracing::info!(
                request_id = id,
                status = %request.status,
                "Request no longer awaiting funds, skipping"
            );
            self.pending.remove(id);
            return Ok(Outcome::Skipped);
        }
        if request.amount == 0 {
            tracing::warn!(request_id = id, "Request has no amount, skipping");
            return Ok(Outcome::Skipped);
        }

        let issuer = self.ctx.builder.issuer();
        let source = self
            .ctx
            .chain
            .fetch_account(&issuer)
            .await?
            .ok_or(ReconcileError::IssuerMissing(issuer))?;

        let tx = self
            .ctx
            .builder
            .build_funds_transfer(&source, address, request.amount);
        let result = self.ctx.submitter.submit(&tx).await;
        metrics::record_submission(TxKind::FundsTransfer.as_str(), result.is_ok());
        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                self.ctx.builder.release(&tx);
                return Err(e.into());
            }
        };

        tracing::info!(
            request_id = id,
            address = %address,
            amount = request.amount,
            tx_hash = ?receipt.hash,
            "Funds transfer submitted"
        );
        self.ctx
            .journal
            .record(id, JournalEntry::from_receipt(&receipt, address, request.amount));

        self.commit_processed(id).await?;
        Ok(Outcome::Paid { submitted: true })
    }
}

#[async_trait]
impl ReconcileLoop for FundsLoop {
    fn name(&self) -> &'static str {
        "funds"
    }

    async fn run_cycle(&mut self) -> Result<CycleStats, ReconcileError> {
        self.ctx.builder.begin_cycle();

        let candidates = self
            .ctx
            .requests
            .fetch_summary(RequestStatus::FundProcessed)
            .await?;
        self.pending.rebuild(&candidates);
        let pending = &self.pending;
        self.ctx
            .journal
            .expire(TxKind::FundsTransfer, |id| pending.contains(id));

        let mut stats = CycleStats {
            candidates: candidates.len(),
            ..CycleStats::default()
        };

        for candidate in candidates {
            match self.process(candidate).await {
                Ok(Outcome::Paid { submitted }) => {
                    stats.committed += 1;
                    if submitted {
                        stats.submitted += 1;
                    }
                }
                Ok(Outcome::Rerouted) => {
                    stats.committed += 1;
                    stats.rerouted += 1;
                }
                Ok(Outcome::Skipped) => {}
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        request_id = candidate.id,
                        error = %e,
                        category = e.category(),
                        "Funds request not processed"
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
