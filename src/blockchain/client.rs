//! Light client REST client with timeout and error handling.
//!
//! # Responsibilities
//! - Query account state by address
//! - Ask the node to assemble a transaction and return its hash
//! - Deliver signed transactions
//! - Map transport, decode and rejection failures onto [`BlockchainError`]

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::blockchain::transaction::{SignedTransaction, UnsignedTx};
use crate::blockchain::types::{
    Address, BlockchainError, BlockchainResult, ChainAccount, TxHash, TxKind,
};
use crate::config::{ChainConfig, RetryConfig};
use crate::resilience::retry_idempotent;

/// Read-only view of chain account state.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Fetch the account at `address`; `Ok(None)` means it does not exist yet.
    async fn fetch_account(&self, address: &Address) -> BlockchainResult<Option<ChainAccount>>;
}

/// Response envelope used by every light client endpoint.
#[derive(Debug, Deserialize)]
struct NodeResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    content: Option<Vec<NodeContent>>,
}

#[derive(Debug, Deserialize)]
struct NodeContent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    detail: serde_json::Value,
}

const CODE_OK: i64 = 200;

/// HTTP client for the chain node.
#[derive(Clone)]
pub struct HttpChainClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    retries: RetryConfig,
}

impl HttpChainClient {
    /// Create a new chain client.
    pub fn new(config: &ChainConfig, retries: RetryConfig) -> BlockchainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BlockchainError::ChainUnavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn transport_error(&self, e: reqwest::Error) -> BlockchainError {
        if e.is_timeout() {
            BlockchainError::Timeout(self.timeout_secs)
        } else {
            BlockchainError::ChainUnavailable(format!("HTTP request failed: {}", e))
        }
    }

    async fn fetch_account_once(&self, address: &Address) -> BlockchainResult<Option<ChainAccount>> {
        let response = self
            .http
            .get(self.url(&format!("account/{}", address.to_hex())))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_server_error() {
            return Err(BlockchainError::ChainUnavailable(format!(
                "account query returned HTTP {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let envelope: NodeResponse = serde_json::from_str(&body).map_err(|e| {
            BlockchainError::ChainUnavailable(format!("undecodable account response: {}", e))
        })?;

        if envelope.code != CODE_OK {
            tracing::debug!(address = %address, code = envelope.code, message = %envelope.message, "Account not found");
            return Ok(None);
        }

        let detail = envelope
            .content
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.name == "account" || c.name.is_empty())
            .map(|c| c.detail);

        match detail {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(detail) => {
                let account: ChainAccount = serde_json::from_value(detail).map_err(|e| {
                    BlockchainError::ChainUnavailable(format!("undecodable account: {}", e))
                })?;
                Ok(account.is_created.then_some(account))
            }
        }
    }

    /// Ask the node to assemble `tx` and return the hash the issuer must sign.
    pub async fn create_transaction(&self, tx: &UnsignedTx) -> BlockchainResult<TxHash> {
        let path = match tx {
            UnsignedTx::AccountCreate { target, issuer, header, fee } => format!(
                "createAccTx/{}/{}/{}/{}",
                target.to_hex(),
                header,
                fee,
                issuer.to_hex()
            ),
            UnsignedTx::FundsTransfer { from, to, amount, fee, nonce, header } => format!(
                "createFundsTx/{}/{}/{}/{}/{}/{}",
                header,
                amount,
                fee,
                nonce,
                from.to_hex(),
                to.to_hex()
            ),
        };

        let envelope = self.post(&path, tx.kind()).await?;
        let detail = envelope
            .content
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.detail.as_str().map(str::to_string))
            .ok_or_else(|| {
                BlockchainError::ChainUnavailable("node returned no transaction hash".to_string())
            })?;

        TxHash::from_hex(&detail).map_err(|e| {
            BlockchainError::ChainUnavailable(format!("malformed transaction hash: {}", e))
        })
    }

    /// Deliver a signed transaction.
    pub async fn send_transaction(&self, signed: &SignedTransaction) -> BlockchainResult<()> {
        let endpoint = match signed.kind {
            TxKind::AccountCreate => "sendAccTx",
            TxKind::FundsTransfer => "sendFundsTx",
        };
        let path = format!(
            "{}/{}/{}",
            endpoint,
            signed.hash.to_hex(),
            hex::encode(signed.signature)
        );

        self.post(&path, signed.kind).await.map(|_| ())
    }

    async fn post(&self, path: &str, kind: TxKind) -> BlockchainResult<NodeResponse> {
        let response = self
            .http
            .post(self.url(path))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let envelope: NodeResponse = serde_json::from_str(&body).map_err(|e| {
            BlockchainError::ChainUnavailable(format!("undecodable response (HTTP {}): {}", status, e))
        })?;

        if envelope.code != CODE_OK {
            return Err(BlockchainError::SubmissionRejected {
                kind,
                code: envelope.code,
                reason: envelope.message,
            });
        }

        Ok(envelope)
    }
}

#[async_trait]
impl ChainQuery for HttpChainClient {
    async fn fetch_account(&self, address: &Address) -> BlockchainResult<Option<ChainAccount>> {
        retry_idempotent(&self.retries, "fetch_account", || self.fetch_account_once(address)).await
    }
}

impl std::fmt::Debug for HttpChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChainClient")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> HttpChainClient {
        let config = ChainConfig {
            base_url: base_url.to_string(),
            timeout_secs: 1,
            ..ChainConfig::default()
        };
        let retries = RetryConfig {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
        };
        HttpChainClient::new(&config, retries).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = test_client("http://localhost:8001/");
        assert_eq!(client.url("account/ab"), "http://localhost:8001/account/ab");
    }

    #[test]
    fn test_envelope_decoding_tolerates_null_content() {
        let envelope: NodeResponse =
            serde_json::from_str(r#"{"code":500,"message":"no account","content":null}"#).unwrap();
        assert_eq!(envelope.code, 500);
        assert!(envelope.content.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_unavailable() {
        // Port 9 (discard) is not expected to be listening
        let client = test_client("http://127.0.0.1:9");
        let err = client.fetch_account(&Address([1u8; 64])).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::ChainUnavailable(_) | BlockchainError::Timeout(_)
        ));
    }
}
