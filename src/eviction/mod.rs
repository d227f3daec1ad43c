//! Eviction Strategies
//!
//! When a cold start does not fit in the remaining memory, the scheduler asks
//! its [`EvictionStrategy`] which idle containers to remove. Every strategy
//! follows the same greedy contract:
//!
//! - it only ever sees idle containers, so it cannot pick a running one;
//! - it keeps adding victims until the freed memory reaches the target or
//!   the candidates run out, in which case the (insufficient) partial list is
//!   returned and the caller re-checks admission;
//! - it never returns the same container twice.
//!
//! # Policies
//!
//! | Policy | Selector | Victim order |
//! |--------|----------|--------------|
//! | [`Random`](EvictionPolicy::Random) | `RAND` | uniform, without replacement |
//! | [`ClosestSize`](EvictionPolicy::ClosestSize) | `CLOSEST_SIZE` | smallest size ≥ remaining target, else largest |
//! | [`ClosestSizeSmallest`](EvictionPolicy::ClosestSizeSmallest) | `CLOSEST_SIZE_SMALLEST` | smallest size ≥ remaining target, else smallest |
//! | [`Lru`](EvictionPolicy::Lru) | `LRU` | least recently used first |
//! | [`Lfu`](EvictionPolicy::Lfu) | `LFU` | lowest invocation count first |
//! | [`LfuGroupClosest`](EvictionPolicy::LfuGroupClosest) | `LFU_GROUP_CLOSEST` | closest size within the LFU group |
//! | [`LfuGroupMaxCold`](EvictionPolicy::LfuGroupMaxCold) | `LFU_GROUP_MAX_COLD` | longest cold run within the LFU group |
//! | [`LfuGroupInitClosest`](EvictionPolicy::LfuGroupInitClosest) | `LFU_GROUP_INIT_CLOSEST` | closest size among the cheapest-to-start |
//! | [`LfuGroupInitLargest`](EvictionPolicy::LfuGroupInitLargest) | `LFU_GROUP_INIT_LARGEST` | largest among the cheapest-to-start |
//! | [`LfuGroupSizeInit`](EvictionPolicy::LfuGroupSizeInit) | `LFU_GROUP_SIZE_INIT` | cheapest-to-start among the closest sizes |
//! | [`GreedyDual`](EvictionPolicy::GreedyDual) | `GREEDY_DUAL` | lowest greedy-dual priority first |
//!
//! Candidates arrive in admission order and all sorts are stable, so every
//! policy except `RAND` is deterministic. `RAND` draws from a seeded RNG.

use crate::container::{Container, ContainerId};
use crate::error::ConfigError;
use core::fmt;
use core::str::FromStr;

pub mod closest_size;
pub mod greedy_dual;
pub mod lfu;
pub mod lfu_group;
pub mod lru;
pub mod random;

pub use closest_size::{ClosestSizeStrategy, OverflowFallback};
pub use greedy_dual::GreedyDualStrategy;
pub use lfu::LfuStrategy;
pub use lfu_group::{GroupSelector, LfuGroupStrategy};
pub use lru::LruStrategy;
pub use random::RandomStrategy;

/// Victim selection algorithm hosted by the scheduler.
pub trait EvictionStrategy: fmt::Debug + Send {
    /// Policy this strategy implements.
    fn policy(&self) -> EvictionPolicy;

    /// Chooses victims among `idle` until at least `bytes_to_free` would be
    /// released, or every candidate has been chosen.
    ///
    /// `idle` is in admission order and never contains running containers.
    fn select_victims(&mut self, idle: &[&Container], bytes_to_free: u64) -> Vec<ContainerId>;

    /// Called after `container` served a request at `now`, hit or cold start.
    /// The invocation counter has already been incremented.
    fn on_access(&mut self, _container: &mut Container, _now: f64) {}

    /// Called after a victim has been removed from the pool.
    fn on_evict(&mut self, _id: ContainerId) {}
}

/// Eviction policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvictionPolicy {
    /// Uniform random choice among idle containers.
    Random,
    /// Closest fit from above; the largest container when nothing fits alone.
    ClosestSize,
    /// Closest fit from above; the smallest container when nothing fits alone.
    ClosestSizeSmallest,
    /// Least recently used.
    Lru,
    /// Classic least frequently used.
    Lfu,
    /// LFU group, then closest size.
    LfuGroupClosest,
    /// LFU group, then longest cold run time.
    LfuGroupMaxCold,
    /// LFU group, cheapest-to-start sub-group, then closest size.
    LfuGroupInitClosest,
    /// LFU group, cheapest-to-start sub-group, then largest.
    LfuGroupInitLargest,
    /// LFU group, closest-size window, then cheapest to start.
    LfuGroupSizeInit,
    /// Greedy-dual priority.
    GreedyDual,
}

impl EvictionPolicy {
    /// Canonical selector string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Random => "RAND",
            EvictionPolicy::ClosestSize => "CLOSEST_SIZE",
            EvictionPolicy::ClosestSizeSmallest => "CLOSEST_SIZE_SMALLEST",
            EvictionPolicy::Lru => "LRU",
            EvictionPolicy::Lfu => "LFU",
            EvictionPolicy::LfuGroupClosest => "LFU_GROUP_CLOSEST",
            EvictionPolicy::LfuGroupMaxCold => "LFU_GROUP_MAX_COLD",
            EvictionPolicy::LfuGroupInitClosest => "LFU_GROUP_INIT_CLOSEST",
            EvictionPolicy::LfuGroupInitLargest => "LFU_GROUP_INIT_LARGEST",
            EvictionPolicy::LfuGroupSizeInit => "LFU_GROUP_SIZE_INIT",
            EvictionPolicy::GreedyDual => "GREEDY_DUAL",
        }
    }

    /// Get all available policies
    pub fn all() -> Vec<EvictionPolicy> {
        vec![
            EvictionPolicy::Random,
            EvictionPolicy::ClosestSize,
            EvictionPolicy::ClosestSizeSmallest,
            EvictionPolicy::Lru,
            EvictionPolicy::Lfu,
            EvictionPolicy::LfuGroupClosest,
            EvictionPolicy::LfuGroupMaxCold,
            EvictionPolicy::LfuGroupInitClosest,
            EvictionPolicy::LfuGroupInitLargest,
            EvictionPolicy::LfuGroupSizeInit,
            EvictionPolicy::GreedyDual,
        ]
    }

    /// Builds the strategy for this policy. `seed` only affects `RAND`.
    pub fn build(self, seed: u64) -> Box<dyn EvictionStrategy> {
        match self {
            EvictionPolicy::Random => Box::new(RandomStrategy::new(seed)),
            EvictionPolicy::ClosestSize => {
                Box::new(ClosestSizeStrategy::new(OverflowFallback::Largest))
            }
            EvictionPolicy::ClosestSizeSmallest => {
                Box::new(ClosestSizeStrategy::new(OverflowFallback::Smallest))
            }
            EvictionPolicy::Lru => Box::new(LruStrategy::new()),
            EvictionPolicy::Lfu => Box::new(LfuStrategy),
            EvictionPolicy::LfuGroupClosest => {
                Box::new(LfuGroupStrategy::new(GroupSelector::ClosestSize))
            }
            EvictionPolicy::LfuGroupMaxCold => {
                Box::new(LfuGroupStrategy::new(GroupSelector::MaxColdTime))
            }
            EvictionPolicy::LfuGroupInitClosest => {
                Box::new(LfuGroupStrategy::new(GroupSelector::InitClosestSize))
            }
            EvictionPolicy::LfuGroupInitLargest => {
                Box::new(LfuGroupStrategy::new(GroupSelector::InitLargest))
            }
            EvictionPolicy::LfuGroupSizeInit => {
                Box::new(LfuGroupStrategy::new(GroupSelector::SizeThenInit))
            }
            EvictionPolicy::GreedyDual => Box::new(GreedyDualStrategy),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let policy = match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "RAND" | "RANDOM" => EvictionPolicy::Random,
            "CLOSEST_SIZE" | "CLOSEST_SIZE_LARGEST" => EvictionPolicy::ClosestSize,
            "CLOSEST_SIZE_SMALLEST" => EvictionPolicy::ClosestSizeSmallest,
            "LRU" => EvictionPolicy::Lru,
            "LFU" | "LFU_CLASSIC" => EvictionPolicy::Lfu,
            "LFU_GROUP_CLOSEST" => EvictionPolicy::LfuGroupClosest,
            "LFU_GROUP_MAX_COLD" | "LFU_GROUP_MAX_COLD_TIME" => EvictionPolicy::LfuGroupMaxCold,
            "LFU_GROUP_INIT_CLOSEST" => EvictionPolicy::LfuGroupInitClosest,
            "LFU_GROUP_INIT_LARGEST" => EvictionPolicy::LfuGroupInitLargest,
            "LFU_GROUP_SIZE_INIT" => EvictionPolicy::LfuGroupSizeInit,
            "GREEDY_DUAL" | "DUAL_GREEDY" | "DUAL_GREEDY_PRIORITY" => EvictionPolicy::GreedyDual,
            _ => return Err(ConfigError::UnknownPolicy(s.to_string())),
        };
        Ok(policy)
    }
}

/// Index of the smallest container whose size is at least `target` in a
/// slice sorted by ascending size, or `fallback`'s choice when none is big
/// enough on its own. `sorted` must not be empty.
pub(crate) fn closest_fit_index(
    sorted: &[&Container],
    target: u64,
    fallback: OverflowFallback,
) -> usize {
    let idx = sorted.partition_point(|c| c.mem_size() < target);
    if idx < sorted.len() {
        idx
    } else {
        match fallback {
            OverflowFallback::Largest => sorted.len() - 1,
            OverflowFallback::Smallest => 0,
        }
    }
}

/// Stable ascending sort by memory size.
pub(crate) fn sort_by_size(candidates: &mut [&Container]) {
    candidates.sort_by_key(|c| c.mem_size());
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::container::{Container, ContainerId};
    use crate::profile::FunctionProfile;
    use std::sync::Arc;

    /// Builds a container with the given id, size, run times and count.
    pub(crate) fn container(id: u64, mem: u64, cold: f64, warm: f64, count: u64) -> Container {
        let profile = Arc::new(FunctionProfile::new(format!("f{id}"), mem, cold, warm).unwrap());
        let mut c = Container::new(ContainerId(id), profile, 0.0);
        c.invoke_count = count;
        c
    }

    /// Memory released by evicting `ids` out of `pool`.
    pub(crate) fn freed(pool: &[Container], ids: &[ContainerId]) -> u64 {
        ids.iter()
            .map(|id| pool.iter().find(|c| c.id() == *id).unwrap().mem_size())
            .sum()
    }

    pub(crate) fn ids(raw: &[u64]) -> Vec<ContainerId> {
        raw.iter().copied().map(ContainerId).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::container;
    use super::*;

    #[test]
    fn test_policy_round_trip_through_selector() {
        for policy in EvictionPolicy::all() {
            assert_eq!(policy.as_str().parse::<EvictionPolicy>().unwrap(), policy);
            assert_eq!(policy.build(0).policy(), policy);
        }
    }

    #[test]
    fn test_policy_aliases_and_case() {
        assert_eq!("rand".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Random);
        assert_eq!(
            "dual-greedy".parse::<EvictionPolicy>().unwrap(),
            EvictionPolicy::GreedyDual
        );
        assert_eq!(
            " lfu_classic ".parse::<EvictionPolicy>().unwrap(),
            EvictionPolicy::Lfu
        );
    }

    #[test]
    fn test_unknown_policy_fails_fast() {
        let err = "MRU".parse::<EvictionPolicy>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownPolicy("MRU".to_string()));
    }

    #[test]
    fn test_closest_fit_index() {
        let pool = [
            container(1, 10, 1.0, 1.0, 0),
            container(2, 50, 1.0, 1.0, 0),
            container(3, 100, 1.0, 1.0, 0),
        ];
        let sorted: Vec<&Container> = pool.iter().collect();

        assert_eq!(closest_fit_index(&sorted, 5, OverflowFallback::Largest), 0);
        assert_eq!(closest_fit_index(&sorted, 50, OverflowFallback::Largest), 1);
        assert_eq!(closest_fit_index(&sorted, 51, OverflowFallback::Largest), 2);
        assert_eq!(closest_fit_index(&sorted, 500, OverflowFallback::Largest), 2);
        assert_eq!(closest_fit_index(&sorted, 500, OverflowFallback::Smallest), 0);
    }
}
