//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     ctrl-c / caller → trigger → health monitor + config watcher exit
//! ```

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
