//! Endpoint pool storage.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Ordered list of endpoint base addresses.
///
/// Readers get a consistent `Arc` of the whole list; writers replace it in one swap.
#[derive(Debug, Default)]
pub struct EndpointPool {
    addresses: ArcSwap<Vec<String>>,
}

impl EndpointPool {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses: ArcSwap::from_pointee(addresses),
        }
    }

    /// Current addresses.
    pub fn load(&self) -> Arc<Vec<String>> {
        self.addresses.load_full()
    }

    /// Replace the whole pool.
    pub fn replace(&self, addresses: Vec<String>) {
        tracing::info!(count = addresses.len(), "Endpoint pool replaced");
        self.addresses.store(Arc::new(addresses));
    }

    pub fn len(&self) -> usize {
        self.addresses.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
