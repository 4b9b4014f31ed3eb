//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the reconciler.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the funding reconciler.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Funding-request service endpoint.
    pub request_service: RequestServiceConfig,

    /// Chain node (light client) endpoint and fee settings.
    pub chain: ChainConfig,

    /// Transaction submission strategy.
    pub submitter: SubmitterConfig,

    /// Loop cadence and journal settings.
    pub reconciler: LoopConfig,

    /// Retry configuration for idempotent calls.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Request service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestServiceConfig {
    /// Base URL; `summary`, `request_status` and `update_request` are resolved against it.
    pub base_url: String,

    /// Application identity sent with every call.
    pub app_id: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RequestServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://carma-poc.autoidlabs.ch/bazo/".to_string(),
            app_id: "a63c1f72-8198-4a59-85be-67a96f87ab41".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Chain node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Light client REST endpoint (e.g., "http://localhost:8001").
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Fee attached to every transaction.
    pub fee: u64,

    /// Transaction header byte.
    pub header: u8,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout_secs: 10,
            fee: 1,
            header: 0,
        }
    }
}

/// Which submission strategy signs and delivers transactions.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmitterStrategy {
    /// Sign with the key file's private key and post to the chain node.
    #[default]
    Local,
    /// Hand the transaction to an external signing tool.
    Delegated,
}

/// Submission strategy configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SubmitterConfig {
    pub strategy: SubmitterStrategy,

    pub delegated: DelegatedConfig,
}

/// External submission tool settings.
///
/// Argument templates may contain `{kind}`, `{issuer}`, `{target}`,
/// `{amount}`, `{fee}`, `{nonce}` and `{header}` placeholders.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DelegatedConfig {
    /// Program to execute.
    pub program: String,

    /// Arguments for account-creation transactions.
    pub account_args: Vec<String>,

    /// Arguments for funds transactions.
    pub funds_args: Vec<String>,

    /// Maximum run time of one invocation in seconds.
    pub timeout_secs: u64,
}

impl Default for DelegatedConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            account_args: ["accTx", "{issuer}", "{target}", "{fee}", "{header}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            funds_args: [
                "fundsTx", "{issuer}", "{target}", "{amount}", "{fee}", "{nonce}", "{header}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            timeout_secs: 60,
        }
    }
}

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Interval between account-creation cycles in seconds.
    pub account_interval_secs: u64,

    /// Interval between funds cycles in seconds.
    pub funds_interval_secs: u64,

    /// Interval between status reports in seconds.
    pub status_interval_secs: u64,

    /// Optional path of the persisted submission journal.
    pub journal_path: Option<String>,

    /// Age after which an unconfirmed account creation may be resubmitted.
    pub account_resubmit_after_secs: u64,

    /// Age after which journal entries of requests no longer listed are dropped.
    pub journal_retention_secs: u64,

    /// Time the loops get to finish their current cycle on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            account_interval_secs: 30,
            funds_interval_secs: 30,
            status_interval_secs: 10,
            journal_path: None,
            account_resubmit_after_secs: 600,
            journal_retention_secs: 86_400,
            shutdown_grace_secs: 60,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per idempotent call (1 disables retries).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key that validation refuses when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
