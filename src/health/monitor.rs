//! Background health monitor.
//!
//! # Responsibilities
//! - Run the configured check policy every `interval_secs`
//! - Keep the health snapshot fresh for request selection
//! - Exit on shutdown
//!
//! # Design Decisions
//! - The enabled flag and interval are re-read every round, so toggling
//!   health checks or reloading the config never needs a restart
//! - A zero interval idles at `IDLE_INTERVAL` until a usable one appears

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::client::MultiClient;
use crate::lifecycle::ShutdownSignal;

/// Polling period while the configured interval is zero.
const IDLE_INTERVAL: Duration = Duration::from_secs(1);

pub struct HealthMonitor {
    client: Arc<MultiClient>,
    fixed_interval: Option<Duration>,
}

impl HealthMonitor {
    /// Monitor following the client's configured health-check interval.
    pub fn new(client: Arc<MultiClient>) -> Self {
        Self {
            client,
            fixed_interval: None,
        }
    }

    /// Monitor ticking at a fixed interval, ignoring the configured one.
    pub fn with_interval(client: Arc<MultiClient>, interval: Duration) -> Self {
        Self {
            client,
            fixed_interval: Some(interval),
        }
    }

    /// Period of the next round.
    pub fn current_interval(&self) -> Duration {
        let interval = self
            .fixed_interval
            .unwrap_or_else(|| self.client.health_check().interval());
        if interval.is_zero() {
            IDLE_INTERVAL
        } else {
            interval
        }
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut period = self.current_interval();
        tracing::info!(interval = ?period, "Health monitor starting");

        let mut ticker = delayed(time::interval(period));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;

                    let next = self.current_interval();
                    if next != period {
                        tracing::info!(from = ?period, to = ?next, "Health check interval changed");
                        period = next;
                        ticker = delayed(time::interval_at(Instant::now() + period, period));
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn tick(&self) {
        if !self.client.health_checks_enabled() {
            tracing::trace!("Health checks disabled, skipping round");
            return;
        }
        // Policy is re-read each round so config reloads take effect.
        let policy = self.client.health_check().policy;
        match self.client.check(policy).await {
            Ok(()) => tracing::debug!(?policy, "Health check round passed"),
            Err(e) => tracing::warn!(?policy, error = %e, "Health check round failed"),
        }
    }
}

fn delayed(mut interval: Interval) -> Interval {
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
