//! Closest-size eviction.
//!
//! Sorts idle containers by memory size and repeatedly evicts the smallest
//! one that covers the remaining target on its own. When no single container
//! is large enough, the [`OverflowFallback`] decides whether the largest or
//! the smallest remaining container goes, and the loop continues with the
//! reduced target. Run times and invocation counts are ignored.

use super::{closest_fit_index, sort_by_size, EvictionPolicy, EvictionStrategy};
use crate::container::{Container, ContainerId};

/// Which container to evict when none covers the remaining target alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowFallback {
    /// Evict the largest remaining candidate.
    Largest,
    /// Evict the smallest remaining candidate.
    Smallest,
}

/// Closest-fit-from-above victim selection.
#[derive(Debug, Clone, Copy)]
pub struct ClosestSizeStrategy {
    fallback: OverflowFallback,
}

impl ClosestSizeStrategy {
    /// Creates a strategy with the given overflow fallback.
    pub fn new(fallback: OverflowFallback) -> Self {
        Self { fallback }
    }

    /// Overflow fallback in use.
    pub fn fallback(&self) -> OverflowFallback {
        self.fallback
    }
}

impl EvictionStrategy for ClosestSizeStrategy {
    fn policy(&self) -> EvictionPolicy {
        match self.fallback {
            OverflowFallback::Largest => EvictionPolicy::ClosestSize,
            OverflowFallback::Smallest => EvictionPolicy::ClosestSizeSmallest,
        }
    }

    fn select_victims(&mut self, idle: &[&Container], bytes_to_free: u64) -> Vec<ContainerId> {
        let mut available: Vec<&Container> = idle.to_vec();
        sort_by_size(&mut available);

        let mut victims = Vec::new();
        let mut remaining = bytes_to_free;
        while remaining > 0 && !available.is_empty() {
            let idx = closest_fit_index(&available, remaining, self.fallback);
            let victim = available.remove(idx);
            remaining = remaining.saturating_sub(victim.mem_size());
            victims.push(victim.id());
        }
        victims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::test_support::{container, freed, ids};

    fn pool() -> Vec<Container> {
        vec![
            container(1, 40, 1.0, 1.0, 0),
            container(2, 10, 1.0, 1.0, 0),
            container(3, 100, 1.0, 1.0, 0),
            container(4, 60, 1.0, 1.0, 0),
        ]
    }

    #[test]
    fn test_single_closest_fit() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = ClosestSizeStrategy::new(OverflowFallback::Largest);

        assert_eq!(strategy.select_victims(&idle, 50), ids(&[4]));
        assert_eq!(strategy.select_victims(&idle, 40), ids(&[1]));
        assert_eq!(strategy.select_victims(&idle, 1), ids(&[2]));
    }

    #[test]
    fn test_kick_largest_on_overflow() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = ClosestSizeStrategy::new(OverflowFallback::Largest);

        // 150: nothing fits alone, drop 100, then 50 remains -> 60.
        let victims = strategy.select_victims(&idle, 150);
        assert_eq!(victims, ids(&[3, 4]));
        assert!(freed(&pool, &victims) >= 150);
    }

    #[test]
    fn test_kick_smallest_on_overflow() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = ClosestSizeStrategy::new(OverflowFallback::Smallest);

        // 150: drop 10 (140 left), drop 40 (100 left), then 100 fits exactly.
        let victims = strategy.select_victims(&idle, 150);
        assert_eq!(victims, ids(&[2, 1, 3]));
        assert!(freed(&pool, &victims) >= 150);
    }

    #[test]
    fn test_partial_when_infeasible() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        for fallback in [OverflowFallback::Largest, OverflowFallback::Smallest] {
            let victims = ClosestSizeStrategy::new(fallback).select_victims(&idle, 1_000);
            assert_eq!(victims.len(), 4);
            assert_eq!(freed(&pool, &victims), 210);
        }
    }

    #[test]
    fn test_equal_sizes_keep_admission_order() {
        let pool = vec![
            container(1, 30, 1.0, 1.0, 0),
            container(2, 30, 1.0, 1.0, 0),
            container(3, 30, 1.0, 1.0, 0),
        ];
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = ClosestSizeStrategy::new(OverflowFallback::Largest);
        assert_eq!(strategy.select_victims(&idle, 30), ids(&[1]));
    }
}
