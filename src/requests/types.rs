//! Funding-request types and error definitions.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use crate::blockchain::types::Address;
use crate::resilience::Transient;

/// Request status as tracked by the request service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Approved, account not yet requested on chain.
    Open,
    /// Account creation submitted.
    Pending,
    /// Ready for funding.
    FundProcessed,
    /// Funds submitted.
    Processed,
    /// Any status this system does not act on.
    #[serde(other)]
    #[default]
    Unknown,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Pending => "pending",
            RequestStatus::FundProcessed => "fundprocessed",
            RequestStatus::Processed => "processed",
            RequestStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A funding request as returned by the request service.
///
/// Only `id` is required. Missing or `null` fields take their default, so
/// selection depends on `id`, `status` and `public_key` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRequest {
    pub id: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: u64,

    /// Public key, expected as 128 hex characters.
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_key: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RequestStatus,

    #[serde(default, deserialize_with = "null_as_default")]
    pub max_amount: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub app_id: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FundingRequest {
    /// Chain address of the request's public key.
    pub fn address(&self) -> RequestResult<Address> {
        Address::from_hex(&self.public_key).map_err(|reason| RequestServiceError::MalformedCandidate {
            id: self.id,
            reason,
        })
    }
}

/// A request eligible for processing in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: u64,
    pub address: Address,
}

/// Response envelope of the request service.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub response: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// Body of a status update.
#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdate<'a> {
    pub id: u64,
    pub app_id: &'a str,
    pub status: RequestStatus,
}

/// Errors that can occur talking to the request service.
#[derive(Debug, Error)]
pub enum RequestServiceError {
    /// Network or decode failure.
    #[error("Request service unavailable: {0}")]
    Unavailable(String),

    /// A status push did not land.
    #[error("Status update to '{status}' for request {id} failed: {reason}")]
    StatusUpdateFailed {
        id: u64,
        status: RequestStatus,
        reason: String,
    },

    /// The request's public key is not a 128-character hex string.
    #[error("Request {id} has a malformed public key: {reason}")]
    MalformedCandidate { id: u64, reason: String },
}

impl Transient for RequestServiceError {
    fn is_transient(&self) -> bool {
        !matches!(self, RequestServiceError::MalformedCandidate { .. })
    }
}

/// Result type for request service operations.
pub type RequestResult<T> = Result<T, RequestServiceError>;
