//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MultiClientConfig
//!     → MultiClient::from_config / apply_config
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → MultiClient::apply_config swaps pool and settings
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - An invalid reload is logged and dropped; the running client keeps its settings
//! - Hooks and custom probes are code-only and survive reloads

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{HealthCheckConfig, MultiClientConfig, ObservabilityConfig, RequestConfig, RetryConfig};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
