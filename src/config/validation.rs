//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and socket addresses
//! - Validate value ranges (intervals > 0, timeouts > 0)
//! - Check strategy-specific settings (delegated program present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ReconcilerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ReconcilerConfig, SubmitterStrategy, PLACEHOLDER_API_KEY};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &ReconcilerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "request_service.base_url", &config.request_service.base_url);
    check_url(&mut errors, "chain.base_url", &config.chain.base_url);

    if config.request_service.app_id.trim().is_empty() {
        errors.push(ValidationError::new("request_service.app_id", "must not be empty"));
    }

    let positive = [
        ("request_service.timeout_secs", config.request_service.timeout_secs),
        ("chain.timeout_secs", config.chain.timeout_secs),
        ("reconciler.account_interval_secs", config.reconciler.account_interval_secs),
        ("reconciler.funds_interval_secs", config.reconciler.funds_interval_secs),
        ("reconciler.status_interval_secs", config.reconciler.status_interval_secs),
        ("reconciler.journal_retention_secs", config.reconciler.journal_retention_secs),
        ("submitter.delegated.timeout_secs", config.submitter.delegated.timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.submitter.strategy == SubmitterStrategy::Delegated {
        let delegated = &config.submitter.delegated;
        if delegated.program.trim().is_empty() {
            errors.push(ValidationError::new(
                "submitter.delegated.program",
                "required when strategy is \"delegated\"",
            ));
        }
        if delegated.account_args.is_empty() {
            errors.push(ValidationError::new("submitter.delegated.account_args", "must not be empty"));
        }
        if delegated.funds_args.is_empty() {
            errors.push(ValidationError::new("submitter.delegated.funds_args", "must not be empty"));
        }
    }

    if matches!(config.reconciler.journal_path.as_deref(), Some(p) if p.trim().is_empty()) {
        errors.push(ValidationError::new("reconciler.journal_path", "must not be blank"));
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set to a non-default value when the admin API is enabled",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address '{}'", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ReconcilerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ReconcilerConfig::default();
        config.chain.base_url = "not a url".to_string();
        config.reconciler.status_interval_secs = 0;
        config.retries.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "chain.base_url"));
        assert!(errors.iter().any(|e| e.field == "reconciler.status_interval_secs"));
        assert!(errors.iter().any(|e| e.field == "retries.max_attempts"));
    }

    #[test]
    fn test_delegated_requires_program() {
        let mut config = ReconcilerConfig::default();
        config.submitter.strategy = SubmitterStrategy::Delegated;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "submitter.delegated.program");

        config.submitter.delegated.program = "cosign".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_admin_rejects_placeholder_key() {
        let mut config = ReconcilerConfig::default();
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "admin.api_key");

        config.admin.api_key = "s3cret".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = ReconcilerConfig::default();
        config.request_service.base_url = "ftp://example.com/".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].message.contains("ftp"));
    }
}
