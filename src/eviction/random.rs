//! Random eviction.
//!
//! Picks idle containers uniformly at random, without replacement, until the
//! target is met. The RNG is seeded so a run can be replayed exactly.

use super::{EvictionPolicy, EvictionStrategy};
use crate::container::{Container, ContainerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random victim selection.
#[derive(Debug)]
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    /// Creates a strategy whose choices are determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EvictionStrategy for RandomStrategy {
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::Random
    }

    fn select_victims(&mut self, idle: &[&Container], bytes_to_free: u64) -> Vec<ContainerId> {
        let mut available: Vec<&Container> = idle.to_vec();
        let mut victims = Vec::new();
        let mut remaining = bytes_to_free;

        while remaining > 0 && !available.is_empty() {
            let idx = self.rng.gen_range(0..available.len());
            let victim = available.swap_remove(idx);
            remaining = remaining.saturating_sub(victim.mem_size());
            victims.push(victim.id());
        }

        victims
    }
}
