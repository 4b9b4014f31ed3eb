//! Reconciliation engine.
//!
//! # Data Flow
//! ```text
//! accounts.rs (every account_interval):
//!     summary(open) → chain lookup → [account create] → push pending
//!
//! funds.rs (every funds_interval):
//!     summary(fundprocessed) → chain lookup
//!         present → request_status → issuer lookup → funds transfer → push processed
//!         absent  → push open → re-route to accounts.rs
//!
//! reporter.rs (every status_interval):
//!     log both working sets
//! ```
//!
//! # Design Decisions
//! - Each loop owns its working set; others see published snapshots only
//! - Re-routing goes through a channel, never a shared collection
//! - A transition is committed only when its status push succeeds
//! - Accepted submissions are journaled until then, so a retry only re-pushes

pub mod accounts;
pub mod engine;
pub mod funds;
pub mod journal;
pub mod pending;
pub mod reporter;
pub mod runner;

#[cfg(test)]
pub(crate) mod mock;

use thiserror::Error;

use crate::blockchain::{Address, BlockchainError};
use crate::requests::RequestServiceError;

pub use accounts::AccountLoop;
pub use engine::{Reconciler, ReconcilerHandle};
pub use funds::FundsLoop;
pub use journal::{JournalEntry, SubmissionJournal};
pub use pending::{CycleReport, CycleStats, LoopStatus, PendingSet};
pub use reporter::StatusReporter;
pub use runner::{Collaborators, ReconcileLoop};

/// Errors that abort the processing of one request (or one whole cycle).
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Requests(#[from] RequestServiceError),

    #[error(transparent)]
    Chain(#[from] BlockchainError),

    /// The issuer account could not be found while building a transfer.
    #[error("Issuer account {0} not found on chain")]
    IssuerMissing(Address),
}

impl ReconcileError {
    /// Stable label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            ReconcileError::Requests(RequestServiceError::Unavailable(_)) => "request_service_unavailable",
            ReconcileError::Requests(RequestServiceError::StatusUpdateFailed { .. }) => "status_update_failed",
            ReconcileError::Requests(RequestServiceError::MalformedCandidate { .. }) => "malformed_candidate",
            ReconcileError::Chain(BlockchainError::ChainUnavailable(_))
            | ReconcileError::Chain(BlockchainError::Timeout(_)) => "chain_unavailable",
            ReconcileError::Chain(BlockchainError::SubmissionRejected { .. }) => "submission_rejected",
            ReconcileError::Chain(_) => "submission_failed",
            ReconcileError::IssuerMissing(_) => "chain_unavailable",
        }
    }
}
