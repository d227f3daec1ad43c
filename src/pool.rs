//! Container pool and memory accounting.
//!
//! The pool owns every resident [`Container`] and the running set. It is the
//! only place where `used_memory` changes, and it changes together with pool
//! membership: admission and removal either update both or neither.
//!
//! # Invariants
//!
//! After every mutation:
//! 1. `used_memory` equals the sum of resident container sizes.
//! 2. `used_memory <= capacity`.
//! 3. A running container is never removed.
//!
//! [`ContainerPool::check_invariants`] recomputes (1) and (2) from scratch;
//! (3) is enforced by [`ContainerPool::remove`].
//!
//! # Ordering
//!
//! Residents are kept in a `BTreeMap` keyed by [`ContainerId`]. Handles are
//! monotonic, so iteration order is admission order. Eviction policies rely
//! on this for deterministic tie-breaks.

use crate::container::{Container, ContainerId};
use crate::error::InvariantViolation;
use crate::profile::FunctionProfile;
use std::collections::BTreeMap;
use tracing::error;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Execution window of a running container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningSlot {
    /// Logical time the current request started.
    pub start: f64,
    /// Logical time the current request finishes.
    pub end: f64,
}

/// Resident containers, running set and memory counter.
#[derive(Debug)]
pub struct ContainerPool {
    capacity: u64,
    used_memory: u64,
    peak_memory: u64,
    containers: BTreeMap<ContainerId, Container>,
    running: HashMap<ContainerId, RunningSlot>,
}

impl ContainerPool {
    /// Creates an empty pool with `capacity` units of memory.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            used_memory: 0,
            peak_memory: 0,
            containers: BTreeMap::new(),
            running: HashMap::new(),
        }
    }

    /// Total memory the pool may hold.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Memory held by resident containers.
    #[inline]
    pub fn used_memory(&self) -> u64 {
        self.used_memory
    }

    /// Highest `used_memory` observed so far.
    #[inline]
    pub fn peak_memory(&self) -> u64 {
        self.peak_memory
    }

    /// `capacity - used_memory`.
    #[inline]
    pub fn capacity_remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.used_memory)
    }

    /// Number of resident containers.
    #[inline]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether no container is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Number of containers currently executing a request.
    #[inline]
    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    /// Whether at least one resident container is idle.
    #[inline]
    pub fn has_idle(&self) -> bool {
        self.running.len() < self.containers.len()
    }

    /// Whether a container of `mem_size` would fit without eviction.
    #[inline]
    pub fn fits(&self, mem_size: u64) -> bool {
        mem_size <= self.capacity_remaining()
    }

    /// Resident container by handle.
    #[inline]
    pub fn get(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    /// Mutable resident container by handle.
    #[inline]
    pub fn get_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(&id)
    }

    /// Whether `id` is in the running set.
    #[inline]
    pub fn is_running(&self, id: ContainerId) -> bool {
        self.running.contains_key(&id)
    }

    /// Execution window of a running container.
    #[inline]
    pub fn running_slot(&self, id: ContainerId) -> Option<RunningSlot> {
        self.running.get(&id).copied()
    }

    /// Iterates resident containers in admission order.
    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// Idle containers in admission order.
    pub fn idle_containers(&self) -> Vec<&Container> {
        self.containers
            .values()
            .filter(|c| !self.running.contains_key(&c.id()))
            .collect()
    }

    /// Returns the first idle container, in admission order, created for
    /// `profile`.
    pub fn find_idle(&self, profile: &FunctionProfile) -> Option<ContainerId> {
        self.containers
            .values()
            .find(|c| c.serves(profile) && !self.running.contains_key(&c.id()))
            .map(Container::id)
    }

    /// Admits `container` if its memory fits in the remaining capacity.
    ///
    /// On rejection the container is handed back unchanged and the pool is
    /// not modified.
    pub fn try_add(&mut self, container: Container) -> Result<ContainerId, Container> {
        let mem_size = container.mem_size();
        if !self.fits(mem_size) || self.containers.contains_key(&container.id()) {
            return Err(container);
        }
        let id = container.id();
        self.containers.insert(id, container);
        self.used_memory += mem_size;
        self.peak_memory = self.peak_memory.max(self.used_memory);
        Ok(id)
    }

    /// Removes an idle container and releases its memory.
    ///
    /// # Errors
    ///
    /// [`InvariantViolation::RunningRemoval`] if the container is running,
    /// [`InvariantViolation::UnknownContainer`] if it is not resident.
    pub fn remove(&mut self, id: ContainerId) -> Result<Container, InvariantViolation> {
        if self.running.contains_key(&id) {
            error!(container = %id, "attempted to remove a running container");
            return Err(InvariantViolation::RunningRemoval(id));
        }
        let container = self
            .containers
            .remove(&id)
            .ok_or(InvariantViolation::UnknownContainer(id))?;
        self.used_memory -= container.mem_size();
        Ok(container)
    }

    /// Puts a resident container in the running set for `[start, end)`.
    pub fn mark_running(
        &mut self,
        id: ContainerId,
        start: f64,
        end: f64,
    ) -> Result<(), InvariantViolation> {
        if !self.containers.contains_key(&id) {
            return Err(InvariantViolation::UnknownContainer(id));
        }
        if self.running.contains_key(&id) {
            return Err(InvariantViolation::AlreadyRunning(id));
        }
        self.running.insert(id, RunningSlot { start, end });
        Ok(())
    }

    /// Drops every running entry whose end time is at or before `now`.
    /// Returns how many containers became idle.
    pub fn reap(&mut self, now: f64) -> usize {
        let before = self.running.len();
        self.running.retain(|_, slot| slot.end > now);
        before - self.running.len()
    }

    /// Recomputes resident memory and checks it against the tracked counter
    /// and the capacity.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let actual: u64 = self.containers.values().map(Container::mem_size).sum();
        if actual != self.used_memory {
            error!(
                tracked = self.used_memory,
                actual, "container pool memory accounting mismatch"
            );
            return Err(InvariantViolation::MemoryMismatch {
                tracked: self.used_memory,
                actual,
            });
        }
        if actual > self.capacity {
            error!(
                used = actual,
                capacity = self.capacity,
                "container pool exceeds capacity"
            );
            return Err(InvariantViolation::CapacityExceeded {
                used: actual,
                capacity: self.capacity,
            });
        }
        if let Some(id) = self
            .running
            .keys()
            .find(|id| !self.containers.contains_key(id))
        {
            error!(container = %id, "running set refers to a non-resident container");
            return Err(InvariantViolation::UnknownContainer(*id));
        }
        Ok(())
    }
}
