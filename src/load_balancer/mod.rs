//! Endpoint pool and selection.
//!
//! # Data Flow
//! ```text
//! MultiClient attempt
//!     → pool.rs (current endpoint list, swapped wholesale on reconfigure)
//!     → health tracker narrows candidates when health checks are on
//!     → random.rs (uniform pick among candidates)
//! ```
//!
//! # Design Decisions
//! - Selection keeps no memory of failed endpoints; a retry may land on the same one
//! - Balancers pick an index, callers resolve it against their own candidate list

use std::fmt;

pub mod pool;
pub mod random;

pub use pool::EndpointPool;
pub use random::RandomSelector;

/// Strategy for choosing one candidate out of `len`.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Returns an index in `0..len`, or `None` when there are no candidates.
    fn next_index(&self, len: usize) -> Option<usize>;
}
