//! Health probes.
//!
//! # Responsibilities
//! - Decide whether one endpoint is reachable right now
//! - TCP connect when no health-check path is configured
//! - HTTP request + body regex match when a path is configured
//!
//! # Design Decisions
//! - A probe never errors; every failure mode reads as "unhealthy"
//! - Every probe is bounded by the health-check timeout

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use reqwest::Method;
use tokio::net::TcpStream;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::error::Result;
use crate::request::body::{BodyType, Payload};
use crate::request::descriptor::{parse_method, RequestDescriptor};
use crate::request::executor::Executor;

/// Checks a single endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, address: &str) -> bool;
}

/// Strip any `scheme://` prefix and trailing path, leaving `host:port`.
pub fn socket_address(address: &str) -> &str {
    let rest = address
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(address);
    rest.split('/').next().unwrap_or(rest)
}

/// Build the probe described by a health-check configuration.
pub fn configured_probe(config: &HealthCheckConfig, executor: &Executor) -> Result<Arc<dyn HealthProbe>> {
    if config.path.is_empty() {
        Ok(Arc::new(TcpProbe::new(config.timeout())))
    } else {
        Ok(Arc::new(HttpProbe::new(executor.clone(), config)?))
    }
}

/// Healthy iff a TCP connection completes within the timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    async fn probe(&self, address: &str) -> bool {
        let target = socket_address(address);
        match time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(address = %target, error = %e, "Health probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(address = %target, "Health probe failed: timeout");
                false
            }
        }
    }
}

/// Healthy iff the health-check request succeeds and its body matches the pattern.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    executor: Executor,
    method: Method,
    path: String,
    body: Bytes,
    pattern: Regex,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(executor: Executor, config: &HealthCheckConfig) -> Result<Self> {
        Ok(Self {
            executor,
            method: parse_method(&config.method)?,
            path: config.path.clone(),
            body: Bytes::from(config.body.clone()),
            pattern: Regex::new(&config.match_pattern)?,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, address: &str) -> bool {
        let payload = if self.body.is_empty() {
            Payload::Empty
        } else {
            Payload::Bytes(self.body.clone())
        };
        let mut descriptor =
            RequestDescriptor::new(self.method.clone(), self.path.clone(), payload, BodyType::Raw);
        descriptor.set_base_url(address);

        match time::timeout(self.timeout, self.executor.send(descriptor)).await {
            Ok(Ok(response)) if response.is_success_status() => {
                let matched = self.pattern.is_match(&response.text());
                if !matched {
                    tracing::debug!(address = %address, "Health probe failed: body did not match");
                }
                matched
            }
            Ok(Ok(response)) => {
                tracing::debug!(address = %address, status = %response.status(), "Health probe failed: error status");
                false
            }
            Ok(Err(e)) => {
                tracing::debug!(address = %address, error = %e, "Health probe failed: request error");
                false
            }
            Err(_) => {
                tracing::debug!(address = %address, "Health probe failed: timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_socket_address() {
        assert_eq!(socket_address("http://10.0.0.1:8080"), "10.0.0.1:8080");
        assert_eq!(socket_address("https://db:5432/api/"), "db:5432");
        assert_eq!(socket_address("127.0.0.1:9000"), "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_tcp_probe() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = format!("http://{}", listener.local_addr().unwrap());

        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().to_string()
        };

        let probe = TcpProbe::new(Duration::from_secs(1));
        assert!(probe.probe(&open).await);
        assert!(!probe.probe(&closed).await);
    }

    #[test]
    fn test_configured_probe_rejects_bad_pattern() {
        let config = HealthCheckConfig {
            path: "/health".into(),
            match_pattern: "(".into(),
            ..Default::default()
        };
        assert!(configured_probe(&config, &Executor::shared()).is_err());

        let tcp = HealthCheckConfig::default();
        assert!(configured_probe(&tcp, &Executor::shared()).is_ok());
    }
}
