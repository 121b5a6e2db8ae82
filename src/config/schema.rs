//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::health::CheckPolicy;
use crate::request::body::BodyType;
use crate::request::response::DecodeStrategy;

/// Default timeout for a single health probe.
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Root configuration for a multi-endpoint client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MultiClientConfig {
    /// Endpoint pool, in probe order (e.g., "http://10.0.0.1:8080").
    pub addresses: Vec<String>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Defaults applied to every outbound request.
    pub request: RequestConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Restrict selection to endpoints that passed the last check.
    pub enabled: bool,

    /// Path to probe over HTTP. Empty means a bare TCP connect.
    pub path: String,

    /// HTTP method for path probes.
    pub method: String,

    /// Raw body sent with path probes.
    pub body: String,

    /// Regular expression the probe response body must match.
    pub match_pattern: String,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Interval between background checks in seconds.
    pub interval_secs: u64,

    /// How many endpoints a background check must confirm.
    pub policy: CheckPolicy,
}

impl HealthCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: String::new(),
            method: "GET".to_string(),
            body: String::new(),
            match_pattern: String::new(),
            timeout_ms: DEFAULT_HEALTH_CHECK_TIMEOUT.as_millis() as u64,
            interval_secs: 10,
            policy: CheckPolicy::default(),
        }
    }
}

/// Per-request defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RequestConfig {
    /// Body encoding for request payloads.
    pub body_type: BodyType,

    /// Headers merged into every request.
    pub headers: BTreeMap<String, String>,

    /// Query parameters merged into every request.
    pub query: BTreeMap<String, String>,

    /// Whole-request transport timeout in seconds. Unset uses the shared client.
    pub timeout_secs: Option<u64>,

    /// Decoding for response content types without an explicit mapping.
    pub unknown_content_type: DecodeStrategy,

    /// Stamp an x-request-id header on every request.
    pub request_id: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            body_type: BodyType::Json,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            timeout_secs: None,
            unknown_content_type: DecodeStrategy::Xml,
            request_id: false,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per request, each against a freshly selected endpoint.
    pub limit: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { limit: 1 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
