//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::resilience::Transient;

/// Length of an account address in bytes (uncompressed X‖Y coordinates).
pub const ADDRESS_LEN: usize = 64;

/// Length of a transaction hash in bytes.
pub const TX_HASH_LEN: usize = 32;

/// Chain account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Derive the account address of a public key.
    ///
    /// The chain identifies accounts by the raw public key coordinates.
    pub fn from_public_key(public_key: &[u8; ADDRESS_LEN]) -> Self {
        Self(*public_key)
    }

    /// Parse a 128-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        if s.len() != ADDRESS_LEN * 2 {
            return Err(format!(
                "expected {} hex characters, got {}",
                ADDRESS_LEN * 2,
                s.len()
            ));
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| format!("invalid hex: {}", e))?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full addresses are long; the prefix is enough to tell them apart in logs
        write!(f, "Address({}…)", &self.to_hex()[..16])
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Transaction hash as reported by the chain node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; TX_HASH_LEN]);

impl TxHash {
    /// Parse a hex hash. Shorter values are left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim().trim_start_matches("0x");
        if s.is_empty() || s.len() > TX_HASH_LEN * 2 {
            return Err(format!("invalid transaction hash length {}", s.len()));
        }
        let padded = format!("{:0>width$}", s, width = TX_HASH_LEN * 2);
        let mut bytes = [0u8; TX_HASH_LEN];
        hex::decode_to_slice(&padded, &mut bytes).map_err(|e| format!("invalid hex: {}", e))?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

/// Account state as reported by the light client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAccount {
    #[serde(rename = "address", default)]
    pub address: String,

    #[serde(default)]
    pub balance: u64,

    /// Number of transactions issued by this account; the next nonce.
    #[serde(rename = "txCnt", default)]
    pub tx_count: u64,

    #[serde(rename = "isCreated", default = "default_true")]
    pub is_created: bool,

    #[serde(rename = "isRoot", default)]
    pub is_root: bool,
}

fn default_true() -> bool {
    true
}

/// Transaction kind, used for endpoint selection, logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    AccountCreate,
    FundsTransfer,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::AccountCreate => "account_create",
            TxKind::FundsTransfer => "funds_transfer",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handing a transaction to a submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub kind: TxKind,
    /// Hash of the accepted transaction, when the strategy can report one.
    pub hash: Option<TxHash>,
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Transport, decode or server failure talking to the chain node.
    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    /// Chain request timed out.
    #[error("Chain request timed out after {0} seconds")]
    Timeout(u64),

    /// The chain node (or submission tool) declined the transaction.
    #[error("{kind} submission rejected (code {code}): {reason}")]
    SubmissionRejected {
        kind: TxKind,
        code: i64,
        reason: String,
    },

    /// Key file missing, unreadable or inconsistent.
    #[error("Key file error: {0}")]
    KeyFile(String),

    /// Signing failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// The external submission tool could not be run.
    #[error("Submission tool error: {0}")]
    Tool(String),
}

impl Transient for BlockchainError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            BlockchainError::ChainUnavailable(_) | BlockchainError::Timeout(_)
        )
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
