//! Uniform random selection.

use rand::Rng;

use crate::load_balancer::LoadBalancer;

/// Picks every candidate with equal probability.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl RandomSelector {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for RandomSelector {
    fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..len))
    }
}
