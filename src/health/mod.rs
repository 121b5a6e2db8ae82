//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! check (policy → min)
//!     → tracker.rs (lock snapshot, scan pool in order)
//!         → probe.rs (TCP connect or HTTP + regex, bounded by timeout)
//!     → snapshot = passing indices
//!
//! select
//!     → tracker.rs (snapshot when health checks are on, else whole pool)
//!     → load balancer picks uniformly
//!
//! Background (monitor.rs):
//!     Periodic timer → check(policy) until shutdown
//! ```
//!
//! # Design Decisions
//! - Health state is one list of indices, not per-endpoint counters
//! - A failed check never aborts the monitor loop

use serde::{Deserialize, Serialize};

pub mod monitor;
pub mod probe;
pub mod tracker;

pub use monitor::HealthMonitor;
pub use probe::{configured_probe, HealthProbe, HttpProbe, TcpProbe};
pub use tracker::HealthTracker;

/// How many endpoints a check must confirm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPolicy {
    /// At least one endpoint.
    One,
    /// At least `n` endpoints.
    AtLeast(usize),
    /// A strict majority of the pool.
    Quorum,
    /// Every endpoint.
    #[default]
    All,
}

impl CheckPolicy {
    /// Minimum passing endpoints for a pool of `pool_size`.
    pub fn required(&self, pool_size: usize) -> usize {
        match self {
            CheckPolicy::One => 1,
            CheckPolicy::AtLeast(n) => *n,
            CheckPolicy::Quorum => pool_size / 2 + 1,
            CheckPolicy::All => pool_size,
        }
    }
}
