//! Transaction submission strategies.
//!
//! Both strategies satisfy [`Submitter`], so the reconciler never needs to
//! know whether the issuer key lives in this process or with a separate
//! cosigning tool.
//!
//! ```text
//! local:      createAccTx / createFundsTx → hash → sign → sendAccTx / sendFundsTx
//! delegated:  <program> <expanded args> → exit status + stdout
//! ```

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::blockchain::client::HttpChainClient;
use crate::blockchain::transaction::{SignedTransaction, UnsignedTx};
use crate::blockchain::types::{BlockchainError, BlockchainResult, TxHash, TxKind, TxReceipt};
use crate::blockchain::wallet::Wallet;
use crate::config::{DelegatedConfig, SubmitterConfig, SubmitterStrategy};

/// Signs and delivers a transaction to the chain.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, tx: &UnsignedTx) -> BlockchainResult<TxReceipt>;

    /// Short name for logs.
    fn strategy(&self) -> &'static str;
}

/// Signs with the issuer key held by this process.
pub struct LocalSubmitter {
    client: HttpChainClient,
    wallet: Arc<Wallet>,
}

impl LocalSubmitter {
    pub fn new(client: HttpChainClient, wallet: Arc<Wallet>) -> BlockchainResult<Self> {
        if !wallet.can_sign() {
            return Err(BlockchainError::KeyFile(
                "local submission requires a private key".to_string(),
            ));
        }
        Ok(Self { client, wallet })
    }
}

#[async_trait]
impl Submitter for LocalSubmitter {
    async fn submit(&self, tx: &UnsignedTx) -> BlockchainResult<TxReceipt> {
        let hash = self.client.create_transaction(tx).await?;
        let signature = self.wallet.sign_hash(&hash)?;

        let signed = SignedTransaction {
            hash,
            signature,
            kind: tx.kind(),
        };
        self.client.send_transaction(&signed).await?;

        Ok(TxReceipt {
            kind: signed.kind,
            hash: Some(signed.hash),
        })
    }

    fn strategy(&self) -> &'static str {
        "local"
    }
}

/// Hands transactions to an external signing/submission tool.
#[derive(Debug, Clone)]
pub struct DelegatedSubmitter {
    config: DelegatedConfig,
}

impl DelegatedSubmitter {
    pub fn new(config: DelegatedConfig) -> Self {
        Self { config }
    }

    /// Expand the argument template for `tx`.
    pub fn arguments(&self, tx: &UnsignedTx) -> Vec<String> {
        let (template, values) = match tx {
            UnsignedTx::AccountCreate { target, issuer, header, fee } => (
                &self.config.account_args,
                vec![
                    ("{kind}", TxKind::AccountCreate.to_string()),
                    ("{issuer}", issuer.to_hex()),
                    ("{target}", target.to_hex()),
                    ("{amount}", "0".to_string()),
                    ("{fee}", fee.to_string()),
                    ("{nonce}", "0".to_string()),
                    ("{header}", header.to_string()),
                ],
            ),
            UnsignedTx::FundsTransfer { from, to, amount, fee, nonce, header } => (
                &self.config.funds_args,
                vec![
                    ("{kind}", TxKind::FundsTransfer.to_string()),
                    ("{issuer}", from.to_hex()),
                    ("{target}", to.to_hex()),
                    ("{amount}", amount.to_string()),
                    ("{fee}", fee.to_string()),
                    ("{nonce}", nonce.to_string()),
                    ("{header}", header.to_string()),
                ],
            ),
        };

        template
            .iter()
            .map(|arg| {
                values
                    .iter()
                    .fold(arg.clone(), |acc, (placeholder, value)| acc.replace(placeholder, value))
            })
            .collect()
    }
}

#[async_trait]
impl Submitter for DelegatedSubmitter {
    async fn submit(&self, tx: &UnsignedTx) -> BlockchainResult<TxReceipt> {
        let kind = tx.kind();
        let args = self.arguments(tx);

        tracing::debug!(program = %self.config.program, kind = %kind, "Running submission tool");

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BlockchainError::Tool(format!("cannot run {}: {}", self.config.program, e)))?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                BlockchainError::Tool(format!(
                    "{} did not finish within {} seconds",
                    self.config.program, self.config.timeout_secs
                ))
            })?
            .map_err(|e| BlockchainError::Tool(format!("{} failed: {}", self.config.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BlockchainError::SubmissionRejected {
                kind,
                code: output.status.code().map(i64::from).unwrap_or(-1),
                reason: first_non_empty(&[stderr.trim(), stdout.trim()]).to_string(),
            });
        }

        Ok(TxReceipt {
            kind,
            hash: extract_hash(&stdout),
        })
    }

    fn strategy(&self) -> &'static str {
        "delegated"
    }
}

/// Last stdout line that is exactly a 64-character hex hash.
fn extract_hash(stdout: &str) -> Option<TxHash> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.len() == 64 && line.chars().all(|c| c.is_ascii_hexdigit()))
        .find_map(|line| TxHash::from_hex(line).ok())
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.is_empty())
        .unwrap_or("no output")
}

/// Build the configured submission strategy.
pub fn build_submitter(
    config: &SubmitterConfig,
    client: HttpChainClient,
    wallet: Arc<Wallet>,
) -> BlockchainResult<Arc<dyn Submitter>> {
    let submitter: Arc<dyn Submitter> = match config.strategy {
        SubmitterStrategy::Local => Arc::new(LocalSubmitter::new(client, wallet)?),
        SubmitterStrategy::Delegated => Arc::new(DelegatedSubmitter::new(config.delegated.clone())),
    };

    tracing::info!(strategy = submitter.strategy(), "Submitter initialized");
    Ok(submitter)
}
