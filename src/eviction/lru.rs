//! Least Recently Used eviction.
//!
//! Keeps every container that has served a request in an access-ordered
//! structure. Selection walks it from the least recently used end, skipping
//! entries that are not idle. A container occupies at most one position: a
//! repeated access moves it to the most recently used end instead of adding a
//! second entry.
//!
//! Idle containers the structure has never seen are treated as older than any
//! tracked entry and are taken first, in admission order.

use super::{EvictionPolicy, EvictionStrategy};
use crate::container::{Container, ContainerId};
use lru::LruCache;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Recency-ordered victim selection.
#[derive(Debug)]
pub struct LruStrategy {
    order: LruCache<ContainerId, ()>,
}

impl LruStrategy {
    /// Creates an empty recency order.
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }

    /// Number of containers tracked in the recency order.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no container is tracked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Marks `id` as most recently used.
    pub fn touch(&mut self, id: ContainerId) {
        self.order.put(id, ());
    }
}

impl Default for LruStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionStrategy for LruStrategy {
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::Lru
    }

    fn select_victims(&mut self, idle: &[&Container], bytes_to_free: u64) -> Vec<ContainerId> {
        let sizes: HashMap<ContainerId, u64> =
            idle.iter().map(|c| (c.id(), c.mem_size())).collect();

        let untracked = idle
            .iter()
            .map(|c| c.id())
            .filter(|id| !self.order.contains(id));
        let least_recent_first = self
            .order
            .iter()
            .rev()
            .map(|(id, _)| *id)
            .filter(|id| sizes.contains_key(id));

        let mut victims = Vec::new();
        let mut remaining = bytes_to_free;
        for id in untracked.chain(least_recent_first) {
            if remaining == 0 {
                break;
            }
            remaining = remaining.saturating_sub(sizes[&id]);
            victims.push(id);
        }
        victims
    }

    fn on_access(&mut self, container: &mut Container, _now: f64) {
        self.touch(container.id());
    }

    fn on_evict(&mut self, id: ContainerId) {
        self.order.pop(&id);
    }
}
