//! LFU-group eviction.
//!
//! Pure LFU always evicts the least used container, regardless of how much
//! memory it frees or how expensive it is to start again. The LFU-group
//! policies relax that: they sort idle containers by invocation count, take
//! the lowest-frequency *group* as the candidate set, and let a secondary
//! criterion pick the victim inside the group. The group is re-formed from
//! the remaining candidates after every pick.
//!
//! Group sizes are derived from the idle count at the start of the call:
//!
//! - LFU group: `max(4, 10% of idle)`
//! - start-up sub-group: `max(2, 5% of idle)`
//!
//! Both are clamped to the number of remaining candidates.
//!
//! "Init time" is the estimated container start-up overhead, cold minus warm
//! run time (see [`FunctionProfile::init_time`](crate::FunctionProfile::init_time)).

use super::{closest_fit_index, EvictionPolicy, EvictionStrategy, OverflowFallback};
use crate::container::{Container, ContainerId};

/// Minimum size of the lowest-frequency group.
pub const MIN_LFU_GROUP: usize = 4;
/// Minimum size of the start-up sub-group.
pub const MIN_INIT_GROUP: usize = 2;

/// Secondary criterion applied inside the LFU group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSelector {
    /// Smallest container covering the remaining target, else the largest.
    ClosestSize,
    /// Longest cold run time.
    MaxColdTime,
    /// Narrow to the cheapest-to-start sub-group, then closest size.
    InitClosestSize,
    /// Narrow to the cheapest-to-start sub-group, then the largest.
    InitLargest,
    /// Narrow to a window of the closest sizes, then the cheapest to start.
    SizeThenInit,
}

/// LFU group with a secondary selection criterion.
#[derive(Debug, Clone, Copy)]
pub struct LfuGroupStrategy {
    selector: GroupSelector,
}

impl LfuGroupStrategy {
    /// Creates a strategy using `selector` inside the LFU group.
    pub fn new(selector: GroupSelector) -> Self {
        Self { selector }
    }

    /// Secondary criterion in use.
    pub fn selector(&self) -> GroupSelector {
        self.selector
    }
}

/// `max(4, 10%)` of the idle count.
pub fn lfu_group_len(idle_count: usize) -> usize {
    MIN_LFU_GROUP.max(idle_count / 10)
}

/// `max(2, 5%)` of the idle count.
pub fn init_group_len(idle_count: usize) -> usize {
    MIN_INIT_GROUP.max(idle_count / 20)
}

fn by_size(available: &[&Container], positions: &mut [usize]) {
    positions.sort_by_key(|&i| available[i].mem_size());
}

fn by_init_time(available: &[&Container], positions: &mut [usize]) {
    positions.sort_by(|&a, &b| {
        available[a]
            .profile()
            .init_time()
            .total_cmp(&available[b].profile().init_time())
    });
}

fn closest_position(available: &[&Container], sorted: &[usize], target: u64) -> usize {
    let sized: Vec<&Container> = sorted.iter().map(|&i| available[i]).collect();
    sorted[closest_fit_index(&sized, target, OverflowFallback::Largest)]
}

/// First position holding the maximum of `key`.
fn max_position<F>(positions: &[usize], key: F) -> usize
where
    F: Fn(usize) -> f64,
{
    let mut best = positions[0];
    for &p in &positions[1..] {
        if key(p) > key(best) {
            best = p;
        }
    }
    best
}

impl LfuGroupStrategy {
    /// Position in `available` of the next victim. `available` is sorted by
    /// ascending invocation count and is never empty.
    fn pick(&self, available: &[&Container], idle_count: usize, remaining: u64) -> usize {
        let group_len = lfu_group_len(idle_count).min(available.len());
        let mut group: Vec<usize> = (0..group_len).collect();

        match self.selector {
            GroupSelector::ClosestSize => {
                by_size(available, &mut group);
                closest_position(available, &group, remaining)
            }
            GroupSelector::MaxColdTime => {
                max_position(&group, |i| available[i].profile().cold_run_time())
            }
            GroupSelector::InitClosestSize | GroupSelector::InitLargest => {
                by_init_time(available, &mut group);
                group.truncate(init_group_len(idle_count).min(group.len()));
                if self.selector == GroupSelector::InitLargest {
                    max_position(&group, |i| available[i].mem_size() as f64)
                } else {
                    by_size(available, &mut group);
                    closest_position(available, &group, remaining)
                }
            }
            GroupSelector::SizeThenInit => {
                by_size(available, &mut group);
                let sized: Vec<&Container> = group.iter().map(|&i| available[i]).collect();
                let closest = closest_fit_index(&sized, remaining, OverflowFallback::Largest);
                let window = init_group_len(idle_count).min(group.len());
                let start = closest.min(group.len() - window);
                let candidates = &group[start..start + window];
                max_position(candidates, |i| -available[i].profile().init_time())
            }
        }
    }
}

impl EvictionStrategy for LfuGroupStrategy {
    fn policy(&self) -> EvictionPolicy {
        match self.selector {
            GroupSelector::ClosestSize => EvictionPolicy::LfuGroupClosest,
            GroupSelector::MaxColdTime => EvictionPolicy::LfuGroupMaxCold,
            GroupSelector::InitClosestSize => EvictionPolicy::LfuGroupInitClosest,
            GroupSelector::InitLargest => EvictionPolicy::LfuGroupInitLargest,
            GroupSelector::SizeThenInit => EvictionPolicy::LfuGroupSizeInit,
        }
    }

    fn select_victims(&mut self, idle: &[&Container], bytes_to_free: u64) -> Vec<ContainerId> {
        let idle_count = idle.len();
        let mut available: Vec<&Container> = idle.to_vec();
        available.sort_by_key(|c| c.invoke_count);

        let mut victims = Vec::new();
        let mut remaining = bytes_to_free;
        while remaining > 0 && !available.is_empty() {
            let pos = self.pick(&available, idle_count, remaining);
            let victim = available.remove(pos);
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

    #[test]
    fn test_group_lengths() {
        assert_eq!(lfu_group_len(0), 4);
        assert_eq!(lfu_group_len(39), 4);
        assert_eq!(lfu_group_len(100), 10);
        assert_eq!(init_group_len(10), 2);
        assert_eq!(init_group_len(100), 5);
    }

    /// Five low-frequency containers and one hot one. The hot container is
    /// outside the LFU group even though its size fits best.
    fn pool() -> Vec<Container> {
        vec![
            //        id  mem   cold    warm  count
            container(1, 30, 500.0, 100.0, 1),
            container(2, 80, 3000.0, 2000.0, 2),
            container(3, 50, 900.0, 850.0, 0),
            container(4, 20, 100.0, 10.0, 3),
            container(5, 60, 200.0, 190.0, 9),
            container(6, 55, 400.0, 100.0, 4),
        ]
    }

    #[test]
    fn test_group_closest_stays_in_group() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = LfuGroupStrategy::new(GroupSelector::ClosestSize);

        // Group is the 4 least used: 3, 1, 2, 4. Container 6 (55) would fit
        // 55 exactly but is not in the group, so 80 is chosen.
        assert_eq!(strategy.select_victims(&idle, 55), ids(&[2]));
        assert_eq!(strategy.select_victims(&idle, 25), ids(&[1]));
    }

    #[test]
    fn test_group_max_cold_time() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = LfuGroupStrategy::new(GroupSelector::MaxColdTime);

        // First pick: container 2 (cold 3000). Group then re-forms from
        // 3, 1, 4, 6 and container 3 (cold 900) goes next.
        assert_eq!(strategy.select_victims(&idle, 100), ids(&[2, 3]));
    }

    #[test]
    fn test_group_init_closest() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = LfuGroupStrategy::new(GroupSelector::InitClosestSize);

        // Init times in group: 3 -> 50, 1 -> 400, 2 -> 1000, 4 -> 90.
        // Cheapest two: 3 (50 MB) and 4 (20 MB). Closest to 15 is 4.
        assert_eq!(strategy.select_victims(&idle, 15), ids(&[4]));
        // Closest to 40 among {20, 50} is 3.
        assert_eq!(strategy.select_victims(&idle, 40), ids(&[3]));
    }

    #[test]
    fn test_group_init_largest() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = LfuGroupStrategy::new(GroupSelector::InitLargest);
        assert_eq!(strategy.select_victims(&idle, 15), ids(&[3]));
    }

    #[test]
    fn test_group_size_then_init() {
        let pool = pool();
        let idle: Vec<&Container> = pool.iter().collect();
        let mut strategy = LfuGroupStrategy::new(GroupSelector::SizeThenInit);

        // Group by size: 4 (20), 1 (30), 3 (50), 2 (80). Closest to 25 is
        // 1 (30); the window is {1, 3} and 3 starts cheaper.
        assert_eq!(strategy.select_victims(&idle, 25), ids(&[3]));
        // Closest to 70 is 2 (80) at the end; the window shifts back to
        // {3, 2} and 3 is still cheaper, leaving 20 to free.
        assert_eq!(strategy.select_victims(&idle, 70), ids(&[3, 4]));
    }

    /// 100 idle containers: the LFU group is 10 wide and the start-up
    /// sub-group 5 wide. Ids 1..=10 are unused, the other 90 are hot.
    fn wide_pool() -> Vec<Container> {
        let mut pool = Vec::new();
        for id in 1..=5 {
            pool.push(container(id, 900, 2000.0, 100.0, 0));
        }
        //                  id  mem   cold    warm  count    init
        pool.push(container(6, 40, 101.0, 100.0, 0)); //      1
        pool.push(container(7, 60, 102.0, 100.0, 0)); //      2
        pool.push(container(8, 200, 103.0, 100.0, 0)); //     3
        pool.push(container(9, 500, 100.0, 100.0, 0)); //     0
        pool.push(container(10, 120, 5000.0, 4995.0, 0)); //  5
        for id in 11..=100 {
            pool.push(container(id, 10, 99_999.0, 0.0, 5));
        }
        pool
    }

    #[test]
    fn test_group_widths_scale_with_idle_count() {
        let pool = wide_pool();
        let idle: Vec<&Container> = pool.iter().collect();
        assert_eq!(lfu_group_len(idle.len()), 10);
        assert_eq!(init_group_len(idle.len()), 5);

        let pick = |selector, target| {
            LfuGroupStrategy::new(selector).select_victims(&idle, target)
        };

        // A 4-wide group would hold only 900 MB containers; 500 fits 450 best.
        assert_eq!(pick(GroupSelector::ClosestSize, 450), ids(&[9]));
        // Longest cold run is the 10th member; the hot ones are outside.
        assert_eq!(pick(GroupSelector::MaxColdTime, 1), ids(&[10]));
        // Sub-group is 6..=10. A 2-wide one would hold only 9 and 6 and
        // pick 9 for a 150 MB target.
        assert_eq!(pick(GroupSelector::InitClosestSize, 150), ids(&[8]));
        assert_eq!(pick(GroupSelector::InitLargest, 1), ids(&[9]));
        // Size order 6, 7, 10, 8, 9, 1..=5; closest to 100 is 10 (120).
        // The 5-wide window {10, 8, 9, 1, 2} reaches 9 with init 0.
        assert_eq!(pick(GroupSelector::SizeThenInit, 100), ids(&[9]));
    }

    #[test]
    fn test_group_policies_free_enough_when_feasible() {
        let pool: Vec<Container> = (1..=40)
            .map(|i| container(i, 5 + (i * 13) % 97, (i * 31 % 500) as f64, 10.0, i % 7))
            .collect();
        let idle: Vec<&Container> = pool.iter().collect();
        let total: u64 = pool.iter().map(Container::mem_size).sum();

        for selector in [
            GroupSelector::ClosestSize,
            GroupSelector::MaxColdTime,
            GroupSelector::InitClosestSize,
            GroupSelector::InitLargest,
            GroupSelector::SizeThenInit,
        ] {
            let mut strategy = LfuGroupStrategy::new(selector);
            for target in [1, 120, 700, total] {
                let victims = strategy.select_victims(&idle, target);
                assert!(freed(&pool, &victims) >= target, "{selector:?} {target}");
            }
            let victims = strategy.select_victims(&idle, total + 1);
            assert_eq!(victims.len(), pool.len());
        }
    }
}
