//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the issuer key
//! - Build the request-service and chain clients
//! - Pick the submission strategy
//! - Restore the submission journal
//!
//! Subsystems initialize in order, not concurrently. Loops start only after
//! everything here succeeded.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{build_submitter, BlockchainError, HttpChainClient, TxBuilder, Wallet};
use crate::config::{ReconcilerConfig, SubmitterStrategy};
use crate::reconciler::{Collaborators, Reconciler, SubmissionJournal};
use crate::requests::{HttpRequestService, RequestServiceError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error(transparent)]
    Requests(#[from] RequestServiceError),

    #[error("Cannot load submission journal from {path}: {source}")]
    Journal {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build every collaborator and the reconciler from a validated config.
pub fn build_reconciler(config: &ReconcilerConfig, key_file: &Path) -> Result<Reconciler, StartupError> {
    let require_private_key = config.submitter.strategy == SubmitterStrategy::Local;
    let wallet = Arc::new(Wallet::from_key_file(key_file, require_private_key)?);

    let chain = HttpChainClient::new(&config.chain, config.retries.clone())?;
    let requests = HttpRequestService::new(&config.request_service, config.retries.clone())?;
    let submitter = build_submitter(&config.submitter, chain.clone(), wallet.clone())?;

    let journal = match &config.reconciler.journal_path {
        Some(path) => SubmissionJournal::load_from_file(Path::new(path)).map_err(|source| {
            StartupError::Journal {
                path: path.clone(),
                source,
            }
        })?,
        None => SubmissionJournal::new(None),
    }
    .with_retention(config.reconciler.journal_retention_secs);

    let ctx = Collaborators {
        requests: Arc::new(requests),
        chain: Arc::new(chain),
        submitter,
        builder: TxBuilder::new(wallet, &config.chain),
        journal,
    };

    Ok(Reconciler::new(ctx, config.reconciler.clone()))
}
