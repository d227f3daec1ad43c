//! Greedy-dual eviction.
//!
//! Each container carries a priority refreshed every time it serves a
//! request:
//!
//! ```text
//! priority = wall_time + init_time * invoke_count / mem_size
//! ```
//!
//! The wall-time term acts as the aging clock: a container that has not been
//! used for a while keeps an old, low priority. The second term favours
//! keeping containers that are frequently used, expensive to start and small.
//! Victims are taken lowest priority first.

use super::{EvictionPolicy, EvictionStrategy};
use crate::container::{Container, ContainerId};

/// Greedy-dual priority victim selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyDualStrategy;

impl GreedyDualStrategy {
    /// Priority of `container` observed at `now`.
    pub fn priority(container: &Container, now: f64) -> f64 {
        let profile = container.profile();
        now + profile.init_time() * container.invoke_count as f64 / profile.mem_size() as f64
    }
}

impl EvictionStrategy for GreedyDualStrategy {
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::GreedyDual
    }

    fn select_victims(&mut self, idle: &[&Container], bytes_to_free: u64) -> Vec<ContainerId> {
        let mut available: Vec<&Container> = idle.to_vec();
        available.sort_by(|a, b| b.priority.total_cmp(&a.priority));

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

    fn on_access(&mut self, container: &mut Container, now: f64) {
        container.priority = Self::priority(container, now);
    }
}
