//! Health snapshot and address selection.
//!
//! # States
//! ```text
//! active:    check_connect probes the pool, snapshot = passing indices
//! suspended: check_connect fails with Inactive, snapshot = []
//! ```
//!
//! # Design Decisions
//! - One lock guards the snapshot; it is held across the whole probe scan,
//!   so concurrent checks serialize and readers never see a half-built list
//! - The scan stops as soon as `min` endpoints have passed, checked after
//!   each probe, so even `min = 0` probes the first endpoint
//! - A short scan still replaces the snapshot with whatever passed

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::error::{MultiClientError, Result};
use crate::health::probe::HealthProbe;
use crate::load_balancer::{EndpointPool, LoadBalancer};
use crate::observability::metrics;

/// Tracks which pool indices passed the most recent check.
#[derive(Debug)]
pub struct HealthTracker {
    healthy: Mutex<Vec<usize>>,
    active: AtomicBool,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    /// New trackers start active with an empty snapshot.
    pub fn new() -> Self {
        Self {
            healthy: Mutex::new(Vec::new()),
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        let was = self.active.swap(active, Ordering::AcqRel);
        if was != active {
            tracing::info!(active, "Health tracker state changed");
        }
    }

    /// Probe the pool in order until `min` endpoints pass.
    pub async fn check_connect(
        &self,
        pool: &EndpointPool,
        probe: &dyn HealthProbe,
        min: usize,
    ) -> Result<()> {
        let mut healthy = self.healthy.lock().await;

        if !self.is_active() {
            healthy.clear();
            metrics::record_healthy_endpoints(0);
            return Err(MultiClientError::Inactive);
        }

        let addresses = pool.load();
        let mut passing = Vec::with_capacity(min.min(addresses.len()));

        for (index, address) in addresses.iter().enumerate() {
            let ok = probe.probe(address).await;
            metrics::record_probe(ok);
            if ok {
                passing.push(index);
            } else {
                tracing::warn!(address = %address, "Endpoint failed health check");
            }
            if passing.len() >= min {
                break;
            }
        }

        let have = passing.len();
        *healthy = passing;
        metrics::record_healthy_endpoints(have);

        if have < min {
            tracing::warn!(want = min, have, "Health check below required minimum");
            return Err(MultiClientError::InsufficientHealthy { want: min, have });
        }

        tracing::debug!(want = min, have, "Health check passed");
        Ok(())
    }

    /// Addresses in the current snapshot, resolved against the pool.
    pub async fn healthy_addresses(&self, pool: &EndpointPool) -> Vec<String> {
        let healthy = self.healthy.lock().await;
        let addresses = pool.load();
        healthy
            .iter()
            .filter_map(|&i| addresses.get(i).cloned())
            .collect()
    }

    /// Raw snapshot indices.
    pub async fn healthy_indices(&self) -> Vec<usize> {
        self.healthy.lock().await.clone()
    }

    /// Pick one address for the next attempt.
    pub async fn select(
        &self,
        pool: &EndpointPool,
        health_checks: bool,
        balancer: &dyn LoadBalancer,
    ) -> Result<String> {
        let addresses = pool.load();

        if health_checks {
            let healthy = self.healthy.lock().await;
            return balancer
                .next_index(healthy.len())
                .and_then(|pick| healthy.get(pick))
                .and_then(|&i| addresses.get(i))
                .cloned()
                .ok_or(MultiClientError::NoHealthyAddresses);
        }

        let pick = balancer
            .next_index(addresses.len())
            .ok_or(MultiClientError::NoAddresses)?;
        addresses
            .get(pick)
            .cloned()
            .ok_or(MultiClientError::NoAddresses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    use crate::load_balancer::RandomSelector;

    /// Passes a fixed set of addresses and records probe order.
    struct FixedProbe {
        up: HashSet<String>,
        calls: StdMutex<Vec<String>>,
    }

    impl FixedProbe {
        fn new(up: &[&str]) -> Self {
            Self {
                up: up.iter().map(|s| s.to_string()).collect(),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HealthProbe for FixedProbe {
        async fn probe(&self, address: &str) -> bool {
            self.calls.lock().unwrap().push(address.to_string());
            self.up.contains(address)
        }
    }

    fn pool(n: usize) -> EndpointPool {
        EndpointPool::new((0..n).map(|i| format!("h{}:80", i)).collect())
    }

    #[tokio::test]
    async fn test_check_stops_at_min() {
        let pool = pool(4);
        let probe = FixedProbe::new(&["h0:80", "h1:80", "h2:80", "h3:80"]);
        let tracker = HealthTracker::new();

        tracker.check_connect(&pool, &probe, 2).await.unwrap();

        assert_eq!(probe.calls(), vec!["h0:80", "h1:80"]);
        assert_eq!(tracker.healthy_indices().await, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_check_skips_failures_in_order() {
        let pool = pool(4);
        let probe = FixedProbe::new(&["h1:80", "h3:80"]);
        let tracker = HealthTracker::new();

        tracker.check_connect(&pool, &probe, 2).await.unwrap();
        assert_eq!(
            tracker.healthy_addresses(&pool).await,
            vec!["h1:80".to_string(), "h3:80".to_string()]
        );
    }

    #[tokio::test]
    async fn test_insufficient_keeps_partial_snapshot() {
        let pool = pool(3);
        let probe = FixedProbe::new(&["h2:80"]);
        let tracker = HealthTracker::new();

        let err = tracker.check_connect(&pool, &probe, 3).await.unwrap_err();
        assert!(matches!(
            err,
            MultiClientError::InsufficientHealthy { want: 3, have: 1 }
        ));
        assert_eq!(tracker.healthy_indices().await, vec![2]);
    }

    #[tokio::test]
    async fn test_inactive_clears_snapshot() {
        let pool = pool(2);
        let probe = FixedProbe::new(&["h0:80", "h1:80"]);
        let tracker = HealthTracker::new();
        tracker.check_connect(&pool, &probe, 2).await.unwrap();

        tracker.set_active(false);
        let err = tracker.check_connect(&pool, &probe, 2).await.unwrap_err();

        assert!(matches!(err, MultiClientError::Inactive));
        assert!(tracker.healthy_indices().await.is_empty());
        assert_eq!(probe.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_select_modes() {
        let pool = pool(3);
        let tracker = HealthTracker::new();
        let lb = RandomSelector::new();

        // Health checks on but nothing checked yet
        assert!(matches!(
            tracker.select(&pool, true, &lb).await,
            Err(MultiClientError::NoHealthyAddresses)
        ));

        let probe = FixedProbe::new(&["h1:80"]);
        tracker.check_connect(&pool, &probe, 1).await.unwrap();
        for _ in 0..20 {
            assert_eq!(tracker.select(&pool, true, &lb).await.unwrap(), "h1:80");
        }

        let picked = tracker.select(&pool, false, &lb).await.unwrap();
        assert!(pool.load().contains(&picked));

        let empty = EndpointPool::default();
        assert!(matches!(
            tracker.select(&empty, false, &lb).await,
            Err(MultiClientError::NoAddresses)
        ));
    }

    #[tokio::test]
    async fn test_zero_min_checks_first_endpoint() {
        let pool = pool(3);
        let probe = FixedProbe::new(&["h0:80", "h1:80"]);
        let tracker = HealthTracker::new();

        tracker.check_connect(&pool, &probe, 0).await.unwrap();

        assert_eq!(probe.calls(), vec!["h0:80"]);
        assert_eq!(tracker.healthy_indices().await, vec![0]);
    }

    /// Returns one past the last valid index.
    #[derive(Debug)]
    struct OffByOne;

    impl LoadBalancer for OffByOne {
        fn next_index(&self, len: usize) -> Option<usize> {
            Some(len)
        }
    }

    #[tokio::test]
    async fn test_out_of_range_balancer_pick_is_an_error() {
        let pool = pool(1);
        let tracker = HealthTracker::new();

        assert!(matches!(
            tracker.select(&pool, false, &OffByOne).await,
            Err(MultiClientError::NoAddresses)
        ));

        let probe = FixedProbe::new(&["h0:80"]);
        tracker.check_connect(&pool, &probe, 1).await.unwrap();
        assert!(matches!(
            tracker.select(&pool, true, &OffByOne).await,
            Err(MultiClientError::NoHealthyAddresses)
        ));
    }

    #[tokio::test]
    async fn test_stale_index_after_shrink() {
        let pool = pool(3);
        let tracker = HealthTracker::new();
        let probe = FixedProbe::new(&["h2:80"]);
        tracker.check_connect(&pool, &probe, 1).await.unwrap();

        pool.replace(vec!["h0:80".into()]);

        assert!(matches!(
            tracker.select(&pool, true, &RandomSelector::new()).await,
            Err(MultiClientError::NoHealthyAddresses)
        ));
        assert!(tracker.healthy_addresses(&pool).await.is_empty());
    }
}
