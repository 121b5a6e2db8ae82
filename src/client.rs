//! Multi-endpoint client.
//!
//! # Data Flow
//! ```text
//! request(method, path, payload, sinks, hooks)
//!     → buffer payload once
//!     → attempt 1..=retry_limit
//!         → tracker.select (health snapshot or whole pool)
//!         → fresh RequestDescriptor (defaults, hook chain, immediate hooks)
//!         → executor.perform
//!     → first success, else the last attempt's error
//! ```
//!
//! # Design Decisions
//! - Settings live behind one `ArcSwap`; a request works from the copy it
//!   loaded at the start, so reconfiguration never tears an in-flight request
//! - Selection errors end the request at once; every other attempt error is retried
//! - Retries go to a freshly selected endpoint with no backoff

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use reqwest::Method;

use crate::config::{HealthCheckConfig, MultiClientConfig};
use crate::error::{MultiClientError, Result};
use crate::health::{configured_probe, CheckPolicy, HealthProbe, HealthTracker, TcpProbe};
use crate::load_balancer::{EndpointPool, LoadBalancer, RandomSelector};
use crate::observability::metrics;
use crate::request::body::{BodyType, Payload};
use crate::request::descriptor::{is_supported_method, RequestDescriptor};
use crate::request::executor::Executor;
use crate::request::hooks::{RequestIdHook, SharedHook, SharedImmediateHook};
use crate::request::response::{Response, ResponseDecoder, ResponseSink};

/// Everything a request or a check reads besides the pool.
#[derive(Clone)]
struct Settings {
    health: HealthCheckConfig,
    retry_limit: u32,
    body_type: BodyType,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    early_hooks: Vec<SharedHook>,
    late_hooks: Vec<SharedHook>,
    immediate_hooks: Vec<SharedImmediateHook>,
    request_id: Option<SharedImmediateHook>,
    executor: Executor,
    probe: Arc<dyn HealthProbe>,
    custom_probe: bool,
    balancer: Arc<dyn LoadBalancer>,
}

impl Settings {
    fn new() -> Self {
        let health = HealthCheckConfig::default();
        Self {
            probe: Arc::new(TcpProbe::new(health.timeout())),
            health,
            retry_limit: 1,
            body_type: BodyType::Json,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            early_hooks: Vec::new(),
            late_hooks: Vec::new(),
            immediate_hooks: Vec::new(),
            request_id: None,
            executor: Executor::shared(),
            custom_probe: false,
            balancer: Arc::new(RandomSelector::new()),
        }
    }

    /// Take over everything a config file describes. Programmatic hooks,
    /// custom probes and balancers are left alone.
    fn configure(&mut self, config: &MultiClientConfig) -> Result<()> {
        let request = &config.request;

        let executor = match request.timeout_secs {
            Some(secs) => Executor::with_timeout(Duration::from_secs(secs))?,
            None => Executor::shared(),
        };
        self.executor = executor.with_decoder(
            ResponseDecoder::default().with_fallback(request.unknown_content_type),
        );

        self.health = config.health_check.clone();
        self.retry_limit = config.retries.limit;
        self.body_type = request.body_type;
        self.headers = request.headers.clone();
        self.query = request.query.clone();
        self.request_id = request
            .request_id
            .then(|| Arc::new(RequestIdHook) as SharedImmediateHook);

        self.rebuild_probe()
    }

    fn rebuild_probe(&mut self) -> Result<()> {
        if !self.custom_probe {
            self.probe = configured_probe(&self.health, &self.executor)?;
        }
        Ok(())
    }
}

/// Client that spreads requests over a pool of equivalent endpoints.
pub struct MultiClient {
    pool: EndpointPool,
    tracker: HealthTracker,
    settings: ArcSwap<Settings>,
}

impl MultiClient {
    /// Client over `addresses` with default settings: health checks off,
    /// TCP probes, one attempt per request, JSON bodies.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pool: EndpointPool::new(addresses.into_iter().map(Into::into).collect()),
            tracker: HealthTracker::new(),
            settings: ArcSwap::from_pointee(Settings::new()),
        }
    }

    /// Client built from a configuration file.
    pub fn from_config(config: &MultiClientConfig) -> Result<Self> {
        let mut settings = Settings::new();
        settings.configure(config)?;

        tracing::info!(
            addresses = config.addresses.len(),
            health_checks = config.health_check.enabled,
            retry_limit = config.retries.limit,
            "Multi-client configured"
        );

        Ok(Self {
            pool: EndpointPool::new(config.addresses.clone()),
            tracker: HealthTracker::new(),
            settings: ArcSwap::from_pointee(settings),
        })
    }

    /// Replace the pool and file-driven settings with a new configuration.
    ///
    /// The health snapshot is kept; indices that fall outside the new pool
    /// are never selected.
    pub fn apply_config(&self, config: &MultiClientConfig) -> Result<()> {
        self.try_update(|settings| settings.configure(config))?;
        self.pool.replace(config.addresses.clone());
        Ok(())
    }

    fn update(&self, mut f: impl FnMut(&mut Settings)) {
        self.settings.rcu(|current| {
            let mut next = Settings::clone(current);
            f(&mut next);
            next
        });
    }

    fn try_update(&self, mut f: impl FnMut(&mut Settings) -> Result<()>) -> Result<()> {
        let mut outcome = Ok(());
        self.settings.rcu(|current| {
            let mut next = Settings::clone(current);
            outcome = f(&mut next);
            if outcome.is_ok() {
                Arc::new(next)
            } else {
                Arc::clone(current)
            }
        });
        outcome
    }

    // --- Configuration ---

    pub fn addresses(&self) -> Arc<Vec<String>> {
        self.pool.load()
    }

    pub fn set_addresses<I, S>(&self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pool
            .replace(addresses.into_iter().map(Into::into).collect());
    }

    pub fn health_check(&self) -> HealthCheckConfig {
        self.settings.load().health.clone()
    }

    /// Restrict selection to the health snapshot.
    pub fn set_health_checks(&self, enabled: bool) {
        self.update(|s| s.health.enabled = enabled);
    }

    pub fn health_checks_enabled(&self) -> bool {
        self.settings.load().health.enabled
    }

    /// Replace the whole health-check configuration.
    pub fn set_health_check(&self, config: HealthCheckConfig) -> Result<()> {
        self.try_update(|s| {
            s.health = config.clone();
            s.rebuild_probe()
        })
    }

    /// Probe over HTTP at `path`; an empty path switches back to TCP probes.
    pub fn set_health_check_path(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.try_update(|s| {
            s.health.path = path.clone();
            s.rebuild_probe()
        })
    }

    pub fn set_health_check_timeout(&self, timeout: Duration) -> Result<()> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.try_update(|s| {
            s.health.timeout_ms = timeout_ms;
            s.rebuild_probe()
        })
    }

    pub fn retry_limit(&self) -> u32 {
        self.settings.load().retry_limit
    }

    pub fn set_retry_limit(&self, limit: u32) {
        self.update(|s| s.retry_limit = limit);
    }

    pub fn default_body_type(&self) -> BodyType {
        self.settings.load().body_type
    }

    pub fn set_default_body_type(&self, body_type: BodyType) {
        self.update(|s| s.body_type = body_type);
    }

    pub fn set_default_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.update(|s| {
            s.headers.insert(name.clone(), value.clone());
        });
    }

    pub fn set_default_query(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.update(|s| {
            s.query.insert(key.clone(), value.clone());
        });
    }

    /// Hook that runs before every per-call hook.
    pub fn add_early_hook(&self, hook: SharedHook) {
        self.update(|s| s.early_hooks.push(hook.clone()));
    }

    /// Hook that runs after every per-call hook.
    pub fn add_late_hook(&self, hook: SharedHook) {
        self.update(|s| s.late_hooks.push(hook.clone()));
    }

    /// Hook that sees the materialized transport request.
    pub fn add_immediate_hook(&self, hook: SharedImmediateHook) {
        self.update(|s| s.immediate_hooks.push(hook.clone()));
    }

    /// Send requests (and HTTP probes) through `client`.
    pub fn set_transport(&self, client: reqwest::Client) -> Result<()> {
        self.try_update(|s| {
            s.executor = Executor::new(client.clone()).with_decoder(s.executor.decoder().clone());
            s.rebuild_probe()
        })
    }

    pub fn set_decoder(&self, decoder: ResponseDecoder) -> Result<()> {
        self.try_update(|s| {
            s.executor = s.executor.clone().with_decoder(decoder.clone());
            s.rebuild_probe()
        })
    }

    /// Use a caller-supplied probe instead of the configured TCP/HTTP one.
    pub fn set_probe(&self, probe: Arc<dyn HealthProbe>) {
        self.update(|s| {
            s.probe = probe.clone();
            s.custom_probe = true;
        });
    }

    pub fn set_load_balancer(&self, balancer: Arc<dyn LoadBalancer>) {
        self.update(|s| s.balancer = balancer.clone());
    }

    // --- Health ---

    pub fn is_active(&self) -> bool {
        self.tracker.is_active()
    }

    /// Allow checks to run again. Does not probe.
    pub fn resume(&self) {
        self.tracker.set_active(true);
    }

    /// Stop checks and clear the health snapshot.
    pub async fn suspend(&self) {
        self.tracker.set_active(false);
        if let Err(e) = self.check_all().await {
            tracing::debug!(error = %e, "Health snapshot cleared on suspend");
        }
    }

    /// Check the pool until `policy` is satisfied.
    pub async fn check(&self, policy: CheckPolicy) -> Result<()> {
        let min = policy.required(self.pool.len());
        self.check_n(min).await
    }

    pub async fn check_one(&self) -> Result<()> {
        self.check_n(1).await
    }

    pub async fn check_n(&self, n: usize) -> Result<()> {
        let probe = Arc::clone(&self.settings.load().probe);
        self.tracker.check_connect(&self.pool, probe.as_ref(), n).await
    }

    pub async fn check_quorum(&self) -> Result<()> {
        self.check(CheckPolicy::Quorum).await
    }

    pub async fn check_all(&self) -> Result<()> {
        self.check(CheckPolicy::All).await
    }

    /// Addresses that passed the most recent check, in pool order.
    pub async fn healthy_addresses(&self) -> Vec<String> {
        self.tracker.healthy_addresses(&self.pool).await
    }

    /// Pick the endpoint for one attempt.
    pub async fn select_address(&self) -> Result<String> {
        let settings = self.settings.load_full();
        self.select_with(&settings).await
    }

    async fn select_with(&self, settings: &Settings) -> Result<String> {
        self.tracker
            .select(&self.pool, settings.health.enabled, settings.balancer.as_ref())
            .await
    }

    // --- Requests ---

    /// Send one logical request, retrying on fresh endpoints.
    ///
    /// The success sink receives bodies of responses below 400, the failure
    /// sink everything else.
    pub async fn request<S, F>(
        &self,
        method: Method,
        path: &str,
        payload: impl Into<Payload>,
        success: &mut S,
        failure: &mut F,
        hooks: &[SharedHook],
    ) -> Result<Response>
    where
        S: ResponseSink + Send + ?Sized,
        F: ResponseSink + Send + ?Sized,
    {
        let started = Instant::now();
        let result = self
            .drive(method.clone(), path, payload.into(), success, failure, hooks)
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_selection_error() => "no_endpoint",
            Err(_) => "error",
        };
        metrics::record_request(&method, outcome, started.elapsed());
        result
    }

    async fn drive<S, F>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        success: &mut S,
        failure: &mut F,
        hooks: &[SharedHook],
    ) -> Result<Response>
    where
        S: ResponseSink + Send + ?Sized,
        F: ResponseSink + Send + ?Sized,
    {
        if !is_supported_method(&method) {
            return Err(MultiClientError::UnsupportedMethod(method.to_string()));
        }

        let payload = payload.buffered().await?;
        let settings = self.settings.load_full();
        let mut last_error = None;

        for attempt in 1..=settings.retry_limit {
            let address = self.select_with(&settings).await?;
            metrics::record_attempt();

            let mut descriptor = RequestDescriptor::new(
                method.clone(),
                path,
                Payload::from(payload.clone()),
                settings.body_type,
            );
            descriptor.set_base_url(&address);
            descriptor.merge_query(&settings.query);
            descriptor.merge_headers(&settings.headers);
            descriptor.append_hooks(&settings.early_hooks);
            descriptor.append_hooks(hooks);
            descriptor.append_hooks(&settings.late_hooks);
            descriptor.add_immediate_hooks(&settings.immediate_hooks);
            descriptor.add_immediate_hooks(&settings.request_id);

            tracing::debug!(attempt, address = %address, method = %method, path, "Request attempt");

            match settings.executor.perform(descriptor, success, failure).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        limit = settings.retry_limit,
                        address = %address,
                        error = %e,
                        "Request attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(MultiClientError::RetryLimitExceeded))
    }
}

impl std::fmt::Debug for MultiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.settings.load();
        f.debug_struct("MultiClient")
            .field("addresses", &self.pool.load())
            .field("active", &self.tracker.is_active())
            .field("health_checks", &settings.health.enabled)
            .field("retry_limit", &settings.retry_limit)
            .field("body_type", &settings.body_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::response::Discard;

    #[test]
    fn test_new_keeps_address_order() {
        let client = MultiClient::new(["1", "2"]);
        assert_eq!(client.addresses()[0], "1");
        assert_eq!(client.addresses()[1], "2");
    }

    #[test]
    fn test_defaults() {
        let client = MultiClient::new(Vec::<String>::new());
        assert!(client.is_active());
        assert!(!client.health_checks_enabled());
        assert_eq!(client.retry_limit(), 1);
        assert_eq!(client.default_body_type(), BodyType::Json);
        assert_eq!(client.health_check().timeout(), Duration::from_secs(10));
        assert_eq!(client.health_check().method, "GET");
    }

    #[test]
    fn test_setters() {
        let client = MultiClient::new(["a:1"]);
        client.set_addresses(["b:2", "c:3"]);
        client.set_retry_limit(4);
        client.set_default_body_type(BodyType::Form);
        client.set_health_checks(true);
        client.set_health_check_path("/health").unwrap();
        client
            .set_health_check_timeout(Duration::from_millis(250))
            .unwrap();

        assert_eq!(*client.addresses(), vec!["b:2".to_string(), "c:3".to_string()]);
        assert_eq!(client.retry_limit(), 4);
        assert_eq!(client.default_body_type(), BodyType::Form);
        assert!(client.health_checks_enabled());
        assert_eq!(client.health_check().path, "/health");
        assert_eq!(client.health_check().timeout_ms, 250);
    }

    #[test]
    fn test_bad_health_config_keeps_previous() {
        let client = MultiClient::new(["a:1"]);
        let bad = HealthCheckConfig {
            path: "/health".into(),
            match_pattern: "(".into(),
            ..Default::default()
        };

        assert!(matches!(
            client.set_health_check(bad),
            Err(MultiClientError::InvalidPattern(_))
        ));
        assert_eq!(client.health_check().path, "");
    }

    #[test]
    fn test_from_and_apply_config() {
        let mut config = MultiClientConfig {
            addresses: vec!["a:1".into(), "b:2".into()],
            ..Default::default()
        };
        config.retries.limit = 3;
        config.request.body_type = BodyType::Xml;

        let client = MultiClient::from_config(&config).unwrap();
        assert_eq!(client.retry_limit(), 3);
        assert_eq!(client.default_body_type(), BodyType::Xml);

        config.addresses = vec!["c:3".into()];
        config.retries.limit = 2;
        client.apply_config(&config).unwrap();
        assert_eq!(*client.addresses(), vec!["c:3".to_string()]);
        assert_eq!(client.retry_limit(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_method_is_not_retried() {
        let client = MultiClient::new(Vec::<String>::new());
        client.set_retry_limit(5);

        let err = client
            .request(Method::OPTIONS, "/", Payload::Empty, &mut Discard, &mut Discard, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, MultiClientError::UnsupportedMethod(m) if m == "OPTIONS"));
    }

    #[tokio::test]
    async fn test_zero_retry_limit() {
        let client = MultiClient::new(["127.0.0.1:1"]);
        client.set_retry_limit(0);

        let err = client
            .request(Method::GET, "/", Payload::Empty, &mut Discard, &mut Discard, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, MultiClientError::RetryLimitExceeded));
    }

    #[tokio::test]
    async fn test_empty_pool_aborts() {
        let client = MultiClient::new(Vec::<String>::new());
        client.set_retry_limit(3);

        let err = client
            .request(Method::GET, "/", Payload::Empty, &mut Discard, &mut Discard, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, MultiClientError::NoAddresses));
    }
}
