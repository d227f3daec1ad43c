//! Container instances.
//!
//! A [`Container`] is one memory-resident execution environment bound to a
//! [`FunctionProfile`]. Containers are addressed by a stable [`ContainerId`]
//! handle rather than by reference, so the running set, the LRU order and
//! policy bookkeeping can all refer to a container without borrowing the pool.
//!
//! # Per-container state
//!
//! | Field | Used by |
//! |-------|---------|
//! | `invoke_count` | LFU and LFU-group policies, greedy-dual priority |
//! | `priority` | greedy-dual only |
//! | `last_used` | reporting; LRU keeps its own recency order |
//! | `created_at` | reporting |

use crate::profile::FunctionProfile;
use core::fmt;
use std::sync::Arc;

/// Stable handle of a container within one simulation.
///
/// Handles are allocated monotonically by the scheduler and never reused, so
/// ordering by handle is ordering by admission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A memory-resident container and its runtime counters.
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    profile: Arc<FunctionProfile>,
    /// Number of requests this container has served.
    pub invoke_count: u64,
    /// Greedy-dual priority. Other policies leave it at zero.
    pub priority: f64,
    /// Logical time of the most recent request served.
    pub last_used: f64,
    created_at: f64,
}

impl Container {
    /// Creates a fresh container that has not served any request yet.
    pub fn new(id: ContainerId, profile: Arc<FunctionProfile>, created_at: f64) -> Self {
        Self {
            id,
            profile,
            invoke_count: 0,
            priority: 0.0,
            last_used: created_at,
            created_at,
        }
    }

    /// Container handle.
    #[inline]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Profile this container was created for.
    #[inline]
    pub fn profile(&self) -> &Arc<FunctionProfile> {
        &self.profile
    }

    /// Shorthand for `profile().kind()`.
    #[inline]
    pub fn kind(&self) -> &str {
        self.profile.kind()
    }

    /// Shorthand for `profile().mem_size()`.
    #[inline]
    pub fn mem_size(&self) -> u64 {
        self.profile.mem_size()
    }

    /// Logical time at which the container was admitted.
    #[inline]
    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    /// Whether the container was created for `profile`.
    ///
    /// Profiles are matched by kind, which is their identity.
    #[inline]
    pub fn serves(&self, profile: &FunctionProfile) -> bool {
        self.profile.kind() == profile.kind()
    }

    /// Records one served request at `now` and returns the new count.
    #[inline]
    pub fn record_invocation(&mut self, now: f64) -> u64 {
        self.invoke_count += 1;
        self.last_used = now;
        self.invoke_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(kind: &str, mem: u64) -> Arc<FunctionProfile> {
        Arc::new(FunctionProfile::new(kind, mem, 100.0, 50.0).unwrap())
    }

    #[test]
    fn test_new_container_is_unused() {
        let c = Container::new(ContainerId(7), profile("a", 10), 42.0);
        assert_eq!(c.id(), ContainerId(7));
        assert_eq!(c.invoke_count, 0);
        assert_eq!(c.priority, 0.0);
        assert_eq!(c.created_at(), 42.0);
        assert_eq!(c.last_used, 42.0);
        assert_eq!(c.mem_size(), 10);
        assert_eq!(c.kind(), "a");
    }

    #[test]
    fn test_record_invocation() {
        let mut c = Container::new(ContainerId(1), profile("a", 10), 0.0);
        assert_eq!(c.record_invocation(5.0), 1);
        assert_eq!(c.record_invocation(9.0), 2);
        assert_eq!(c.last_used, 9.0);
        assert_eq!(c.created_at(), 0.0);
    }

    #[test]
    fn test_serves_matches_kind() {
        let a = profile("a", 10);
        let b = profile("b", 10);
        let c = Container::new(ContainerId(1), Arc::clone(&a), 0.0);
        assert!(c.serves(&a));
        assert!(!c.serves(&b));
    }

    #[test]
    fn test_container_id_display_and_order() {
        assert_eq!(ContainerId(12).to_string(), "#12");
        assert!(ContainerId(1) < ContainerId(2));
    }
}
