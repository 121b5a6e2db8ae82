//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every pool address forms a usable base URL
//! - Check health probe method, pattern and timeout
//! - Check default headers are legal on the wire
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MultiClientConfig → Result<(), Vec<ValidationError>>

use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::MultiClientConfig;
use crate::request::descriptor::{base_url_for, parse_method};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no addresses configured")]
    NoAddresses,

    #[error("address '{0}' is not a valid endpoint")]
    InvalidAddress(String),

    #[error("health check method '{0}' is not supported")]
    UnsupportedMethod(String),

    #[error("health check pattern is invalid: {0}")]
    InvalidPattern(String),

    #[error("health check timeout must be greater than zero")]
    ZeroTimeout,

    #[error("health check interval must be greater than zero")]
    ZeroInterval,

    #[error("default header '{0}' is not valid")]
    InvalidHeader(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &MultiClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.addresses.is_empty() {
        errors.push(ValidationError::NoAddresses);
    }
    for address in &config.addresses {
        let valid = Url::parse(&base_url_for(address))
            .map(|url| url.host().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidAddress(address.clone()));
        }
    }

    let health = &config.health_check;
    if parse_method(&health.method).is_err() {
        errors.push(ValidationError::UnsupportedMethod(health.method.clone()));
    }
    if let Err(e) = Regex::new(&health.match_pattern) {
        errors.push(ValidationError::InvalidPattern(e.to_string()));
    }
    if health.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if health.enabled && health.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    for (name, value) in &config.request.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeader(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
