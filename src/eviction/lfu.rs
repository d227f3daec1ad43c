//! Classic Least Frequently Used eviction.
//!
//! Sorts idle containers by invocation count, most used first, and pops from
//! the tail. The sort is stable, so among containers with the same count the
//! most recently admitted one is evicted first.

use super::{EvictionPolicy, EvictionStrategy};
use crate::container::{Container, ContainerId};
use core::cmp::Reverse;

/// Frequency-ordered victim selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LfuStrategy;

impl EvictionStrategy for LfuStrategy {
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::Lfu
    }

    fn select_victims(&mut self, idle: &[&Container], bytes_to_free: u64) -> Vec<ContainerId> {
        let mut available: Vec<&Container> = idle.to_vec();
        available.sort_by_key(|c| Reverse(c.invoke_count));

        let mut victims = Vec::new();
        let mut remaining = bytes_to_free;
        while remaining > 0 {
            let Some(victim) = available.pop() else {
                break;
            };
            remaining = remaining.saturating_sub(victim.mem_size());
            victims.push(victim.id());
        }
        victims
    }
}
