//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracker / client / probes
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!         → Prometheus scrape endpoint when enabled
//! ```

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::init_metrics;
