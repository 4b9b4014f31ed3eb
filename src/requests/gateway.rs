//! Request service gateway.
//!
//! # Responsibilities
//! - Pull the request summary and select candidates for one status
//! - Fetch authoritative detail of a single request
//! - Push status transitions back
//!
//! # Design Decisions
//! - A summary whose envelope status is not "OK" yields no candidates
//! - Malformed public keys are dropped here and never reach the reconciler
//! - Status pushes are retried in-call; the service treats repeats as no-ops

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{RequestServiceConfig, RetryConfig};
use crate::observability::metrics;
use crate::requests::types::{
    Candidate, Envelope, FundingRequest, RequestResult, RequestServiceError, RequestStatus,
    StatusUpdate,
};
use crate::resilience::retry_idempotent;

/// External funding-request ledger.
#[async_trait]
pub trait RequestService: Send + Sync {
    /// Requests currently in `status` with a well-formed public key, ordered by id.
    async fn fetch_summary(&self, status: RequestStatus) -> RequestResult<Vec<Candidate>>;

    /// Full detail of one request.
    async fn fetch_status(&self, id: u64) -> RequestResult<FundingRequest>;

    /// Move a request to `status`.
    async fn push_status(&self, id: u64, status: RequestStatus) -> RequestResult<()>;
}

/// Turn raw summary entries into candidates for `status`.
pub fn select_candidates(entries: Vec<serde_json::Value>, status: RequestStatus) -> Vec<Candidate> {
    let mut selected = BTreeMap::new();

    for entry in entries {
        let request: FundingRequest = match serde_json::from_value(entry) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable summary entry");
                continue;
            }
        };

        if request.status != status {
            continue;
        }

        match request.address() {
            Ok(address) => {
                selected.insert(request.id, Candidate { id: request.id, address });
            }
            Err(e) => {
                tracing::warn!(request_id = request.id, error = %e, "Dropping malformed candidate");
                metrics::record_malformed_candidate();
            }
        }
    }

    selected.into_values().collect()
}

/// HTTP client for the request service.
#[derive(Clone)]
pub struct HttpRequestService {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    retries: RetryConfig,
}

impl HttpRequestService {
    pub fn new(config: &RequestServiceConfig, retries: RetryConfig) -> RequestResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RequestServiceError::Unavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_envelope<T>(&self, path: &str, query: &[(&str, String)]) -> RequestResult<Envelope<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| RequestServiceError::Unavailable(format!("HTTP request failed: {}", e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| RequestServiceError::Unavailable(format!("reading response failed: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| RequestServiceError::Unavailable(format!("undecodable response: {}", e)))
    }

    async fn fetch_summary_once(&self) -> RequestResult<Vec<serde_json::Value>> {
        let envelope: Envelope<serde_json::Value> = self
            .get_envelope("summary", &[("app_id", self.app_id.clone())])
            .await?;

        if !envelope.is_ok() {
            tracing::debug!(status = %envelope.status, "Summary not OK, no candidates");
            return Ok(Vec::new());
        }

        match envelope.response {
            Some(serde_json::Value::Array(entries)) => Ok(entries),
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(other) => Err(RequestServiceError::Unavailable(format!(
                "summary response is not a list: {}",
                other
            ))),
        }
    }

    async fn fetch_status_once(&self, id: u64) -> RequestResult<FundingRequest> {
        let envelope: Envelope<serde_json::Value> = self
            .get_envelope(
                "request_status",
                &[("id", id.to_string()), ("app_id", self.app_id.clone())],
            )
            .await?;

        match envelope.response {
            Some(serde_json::Value::Object(mut detail)) if envelope.is_ok() => {
                // The detail may omit the id it was asked for.
                if detail.get("id").map_or(true, serde_json::Value::is_null) {
                    detail.insert("id".to_string(), id.into());
                }
                serde_json::from_value(serde_json::Value::Object(detail)).map_err(|e| {
                    RequestServiceError::Unavailable(format!(
                        "undecodable status of request {}: {}",
                        id, e
                    ))
                })
            }
            _ => Err(RequestServiceError::Unavailable(format!(
                "status query for request {} answered '{}'",
                id, envelope.status
            ))),
        }
    }

    async fn push_status_once(&self, id: u64, status: RequestStatus) -> RequestResult<()> {
        let failed = |reason: String| RequestServiceError::StatusUpdateFailed { id, status, reason };

        let body = StatusUpdate {
            id,
            app_id: &self.app_id,
            status,
        };

        let response = self
            .http
            .post(self.url("update_request"))
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(format!("HTTP request failed: {}", e)))?;

        let text = response
            .text()
            .await
            .map_err(|e| failed(format!("reading response failed: {}", e)))?;

        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(&text).map_err(|e| failed(format!("undecodable response: {}", e)))?;

        if !envelope.is_ok() {
            return Err(failed(format!("service answered '{}'", envelope.status)));
        }

        Ok(())
    }
}

#[async_trait]
impl RequestService for HttpRequestService {
    async fn fetch_summary(&self, status: RequestStatus) -> RequestResult<Vec<Candidate>> {
        let entries = retry_idempotent(&self.retries, "fetch_summary", || self.fetch_summary_once()).await?;
        Ok(select_candidates(entries, status))
    }

    async fn fetch_status(&self, id: u64) -> RequestResult<FundingRequest> {
        retry_idempotent(&self.retries, "fetch_status", || self.fetch_status_once(id)).await
    }

    async fn push_status(&self, id: u64, status: RequestStatus) -> RequestResult<()> {
        let result =
            retry_idempotent(&self.retries, "push_status", || self.push_status_once(id, status)).await;
        metrics::record_status_update(status.as_str(), result.is_ok());
        result
    }
}

impl std::fmt::Debug for HttpRequestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequestService")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(byte: u8) -> String {
        hex::encode([byte; 64])
    }

    #[test]
    fn test_select_filters_by_status() {
        let entries = vec![
            json!({"id": 1, "status": "open", "public_key": key(1)}),
            json!({"id": 2, "status": "fundprocessed", "public_key": key(2)}),
            json!({"id": 3, "status": "open", "public_key": key(3)}),
        ];

        let open = select_candidates(entries.clone(), RequestStatus::Open);
        assert_eq!(open.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(open[0].address.0, [1u8; 64]);

        let funds = select_candidates(entries, RequestStatus::FundProcessed);
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].id, 2);
    }

    #[test]
    fn test_select_drops_malformed_keys() {
        let entries = vec![
            json!({"id": 1, "status": "open", "public_key": key(1)[..126].to_string()}),
            json!({"id": 2, "status": "open", "public_key": format!("{}0", key(2))}),
            json!({"id": 3, "status": "open", "public_key": "g".repeat(128)}),
            json!({"id": 4, "status": "open"}),
            json!({"id": 5, "status": "open", "public_key": key(5)}),
        ];

        let selected = select_candidates(entries, RequestStatus::Open);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 5);
    }

    #[test]
    fn test_select_keeps_entries_with_null_fields() {
        let entries = vec![
            json!({"id": 1, "user_id": 3, "status": "open", "public_key": key(1), "token": null, "amount": null}),
            json!({"id": 2, "status": "open", "public_key": key(2), "app_id": null, "max_amount": null}),
            json!({"id": 3, "status": "open", "public_key": null}),
        ];

        let selected = select_candidates(entries, RequestStatus::Open);
        assert_eq!(selected.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_select_skips_undecodable_entries_and_dedupes() {
        let entries = vec![
            json!({"status": "open", "public_key": key(1)}),
            json!("garbage"),
            json!({"id": 7, "status": "open", "public_key": key(7)}),
            json!({"id": 7, "status": "open", "public_key": key(8)}),
        ];

        let selected = select_candidates(entries, RequestStatus::Open);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].address.0, [8u8; 64]);
    }
}
