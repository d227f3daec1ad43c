//! Discrete-event scheduler.
//!
//! [`CacheScheduler`] replays invocations in logical time against a
//! [`ContainerPool`]. Every call to [`CacheScheduler::run_invocation`] walks
//! the same steps:
//!
//! ```text
//! advance time -> reap -> lookup -> hit
//!                                -> miss -> evict? -> admit  -> record
//!                                                  -> reject -> count capacity miss
//! ```
//!
//! and finishes with a full invariant check of the pool. Invariant violations
//! are fatal: they are logged at `error` level and returned, and the caller is
//! expected to stop the run.
//!
//! # Example
//!
//! ```
//! use faas_cache::{CacheScheduler, FunctionProfile, InvocationOutcome, SchedulerConfig};
//! use std::sync::Arc;
//!
//! let mut scheduler = CacheScheduler::new(SchedulerConfig::new(1000)).unwrap();
//! let f = Arc::new(FunctionProfile::new("f", 1000, 100.0, 50.0).unwrap());
//!
//! let first = scheduler.run_invocation(&f, 0.0).unwrap();
//! assert!(matches!(first, InvocationOutcome::Miss { .. }));
//!
//! // 3000 + 100 + 20% of 100 later the container is idle again
//! let second = scheduler.run_invocation(&f, 5000.0).unwrap();
//! assert!(second.is_hit());
//! ```

use crate::config::SchedulerConfig;
use crate::container::{Container, ContainerId};
use crate::error::{InvariantViolation, Result, SimulationError};
use crate::eviction::{EvictionPolicy, EvictionStrategy};
use crate::metrics::{CacheMetrics, SchedulerMetrics};
use crate::perf_log::{MemoryLog, OutcomeKind, OutcomeRecord, PerformanceLog};
use crate::pool::ContainerPool;
use crate::profile::FunctionProfile;
use core::borrow::Borrow;
use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// One request in a trace: which function, and when.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationEvent {
    /// Function being invoked.
    pub profile: Arc<FunctionProfile>,
    /// Logical arrival time.
    pub time: f64,
}

impl InvocationEvent {
    /// Creates an event for `profile` arriving at `time`.
    pub fn new(profile: Arc<FunctionProfile>, time: f64) -> Self {
        Self { profile, time }
    }
}

/// Result of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// An idle container of the same kind served the request.
    Hit {
        /// Container that served the request.
        container: ContainerId,
    },
    /// A new container was created, possibly after evicting others.
    Miss {
        /// The new container.
        container: ContainerId,
        /// Containers evicted to make room, in eviction order.
        evicted: Vec<ContainerId>,
    },
    /// No container could be created. Evictions may still have happened.
    CapacityMiss {
        /// Containers evicted before admission failed.
        evicted: Vec<ContainerId>,
    },
}

impl InvocationOutcome {
    /// Whether the request was served warm.
    pub fn is_hit(&self) -> bool {
        matches!(self, InvocationOutcome::Hit { .. })
    }

    /// Whether the request was dropped.
    pub fn is_capacity_miss(&self) -> bool {
        matches!(self, InvocationOutcome::CapacityMiss { .. })
    }

    /// Container that served the request, if any.
    pub fn container(&self) -> Option<ContainerId> {
        match self {
            InvocationOutcome::Hit { container } | InvocationOutcome::Miss { container, .. } => {
                Some(*container)
            }
            InvocationOutcome::CapacityMiss { .. } => None,
        }
    }

    /// Containers evicted while handling the request.
    pub fn evicted(&self) -> &[ContainerId] {
        match self {
            InvocationOutcome::Hit { .. } => &[],
            InvocationOutcome::Miss { evicted, .. } | InvocationOutcome::CapacityMiss { evicted } => {
                evicted
            }
        }
    }
}

/// Warm-container cache driven by a trace of invocations.
///
/// The scheduler is generic over its [`PerformanceLog`] sink. The default
/// [`MemoryLog`] keeps outcomes in memory; use
/// [`CsvPerformanceLog`](crate::CsvPerformanceLog) to stream them to a file.
pub struct CacheScheduler<L: PerformanceLog = MemoryLog> {
    config: SchedulerConfig,
    pool: ContainerPool,
    strategy: Box<dyn EvictionStrategy>,
    wall_time: f64,
    next_id: u64,
    history: Vec<(Arc<FunctionProfile>, f64)>,
    metrics: SchedulerMetrics,
    log: L,
}

impl CacheScheduler<MemoryLog> {
    /// Creates a scheduler that keeps its outcome log in memory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_log(config, MemoryLog::new())
    }
}

impl<L: PerformanceLog> CacheScheduler<L> {
    /// Creates a scheduler writing outcomes to `log`.
    pub fn with_log(config: SchedulerConfig, log: L) -> Result<Self> {
        config.validate()?;
        let strategy = config.policy().build(config.seed());
        debug!(config = ?config, "scheduler created");
        Ok(Self {
            pool: ContainerPool::new(config.capacity()),
            metrics: SchedulerMetrics::new(config.capacity()),
            strategy,
            config,
            wall_time: 0.0,
            next_id: 0,
            history: Vec::new(),
            log,
        })
    }

    /// Handles one invocation of `profile` arriving at `time`.
    ///
    /// # Errors
    ///
    /// An [`InvariantViolation`] means the pool is inconsistent and the run
    /// must stop. A NaN or infinite `time` is rejected before any state
    /// changes. A log error means the outcome could not be recorded.
    pub fn run_invocation(
        &mut self,
        profile: &Arc<FunctionProfile>,
        time: f64,
    ) -> Result<InvocationOutcome> {
        if !time.is_finite() {
            error!(kind = profile.kind(), time, "invocation time is not finite");
            return Err(SimulationError::InvalidTime(time));
        }
        if time < self.wall_time {
            warn!(
                kind = profile.kind(),
                time,
                wall_time = self.wall_time,
                "invocation arrived out of order"
            );
        }
        self.wall_time = time;

        let finished = self.pool.reap(time);
        self.metrics.record_reaped(finished);

        if let Some(id) = self.pool.find_idle(profile) {
            self.serve(id, profile, time + profile.warm_run_time(), OutcomeKind::Hit)?;
            self.metrics.record_hit();
            trace!(kind = profile.kind(), container = %id, time, "warm hit");
            self.pool.check_invariants()?;
            return Ok(InvocationOutcome::Hit { container: id });
        }

        let mem_size = profile.mem_size();
        let mut evicted = Vec::new();
        if !self.pool.fits(mem_size) && self.pool.has_idle() {
            evicted = self.evict(mem_size)?;
        }

        let container = Container::new(ContainerId(self.next_id), Arc::clone(profile), time);
        let id = match self.pool.try_add(container) {
            Ok(id) => id,
            Err(_) => {
                self.metrics.record_capacity_miss(profile.kind());
                debug!(
                    kind = profile.kind(),
                    mem_size,
                    free = self.pool.capacity_remaining(),
                    evicted = evicted.len(),
                    "capacity miss"
                );
                self.pool.check_invariants()?;
                return Ok(InvocationOutcome::CapacityMiss { evicted });
            }
        };
        self.next_id += 1;

        let end = time + self.config.cold_time(profile.cold_run_time());
        self.serve(id, profile, end, OutcomeKind::Miss)?;
        self.metrics.record_miss();
        debug!(
            kind = profile.kind(),
            container = %id,
            time,
            end,
            used = self.pool.used_memory(),
            "cold start"
        );
        self.pool.check_invariants()?;
        Ok(InvocationOutcome::Miss {
            container: id,
            evicted,
        })
    }

    /// Runs every event of `trace` in order, stopping at the first error.
    pub fn run_trace<I, E>(&mut self, trace: I) -> Result<()>
    where
        I: IntoIterator<Item = E>,
        E: Borrow<InvocationEvent>,
    {
        for event in trace {
            let event = event.borrow();
            self.run_invocation(&event.profile, event.time)?;
        }
        Ok(())
    }

    /// Marks `id` running until `end`, bumps its counters and records the
    /// outcome.
    fn serve(
        &mut self,
        id: ContainerId,
        profile: &Arc<FunctionProfile>,
        end: f64,
        outcome: OutcomeKind,
    ) -> Result<()> {
        let now = self.wall_time;
        self.pool.mark_running(id, now, end)?;
        let container = self
            .pool
            .get_mut(id)
            .ok_or(InvariantViolation::UnknownContainer(id))?;
        container.record_invocation(now);
        self.strategy.on_access(container, now);

        self.log.record(&OutcomeRecord {
            kind: profile.kind().to_string(),
            time: now,
            outcome,
        })?;
        self.history.push((Arc::clone(profile), now));
        self.metrics.observe_memory(self.pool.used_memory());
        Ok(())
    }

    /// Asks the strategy for victims freeing `bytes_to_free` and removes them.
    fn evict(&mut self, bytes_to_free: u64) -> Result<Vec<ContainerId>> {
        self.metrics.record_eviction_round();
        let victims = {
            let idle = self.pool.idle_containers();
            self.strategy.select_victims(&idle, bytes_to_free)
        };

        for &id in &victims {
            let container = self.pool.remove(id)?;
            self.strategy.on_evict(id);
            self.metrics
                .record_eviction(container.kind(), container.mem_size());
            debug!(
                container = %id,
                kind = container.kind(),
                mem_size = container.mem_size(),
                invocations = container.invoke_count,
                "evicted"
            );
        }
        self.pool.check_invariants()?;
        Ok(victims)
    }

    /// Flushes the performance log.
    pub fn flush(&mut self) -> Result<()> {
        self.log.flush()?;
        Ok(())
    }

    /// Configuration the scheduler was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Active eviction policy.
    pub fn policy(&self) -> EvictionPolicy {
        self.strategy.policy()
    }

    /// Timestamp of the most recent invocation.
    pub fn wall_time(&self) -> f64 {
        self.wall_time
    }

    /// The container pool.
    pub fn pool(&self) -> &ContainerPool {
        &self.pool
    }

    /// Evictions per function kind.
    pub fn evictions(&self) -> &BTreeMap<String, u64> {
        &self.metrics.evictions_by_kind
    }

    /// Capacity misses per function kind.
    pub fn capacity_misses(&self) -> &BTreeMap<String, u64> {
        &self.metrics.capacity_misses_by_kind
    }

    /// Served invocations as `(profile, time)`, in arrival order. Capacity
    /// misses are not included.
    pub fn history(&self) -> &[(Arc<FunctionProfile>, f64)] {
        &self.history
    }

    /// Counters collected so far.
    pub fn scheduler_metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// The performance log sink.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Consumes the scheduler and returns its performance log.
    pub fn into_log(self) -> L {
        self.log
    }
}

impl<L: PerformanceLog> CacheMetrics for CacheScheduler<L> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.to_btreemap();
        metrics.insert("used_memory".to_string(), self.pool.used_memory() as f64);
        metrics.insert("resident".to_string(), self.pool.len() as f64);
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        self.strategy.policy().as_str()
    }
}

impl<L: PerformanceLog> fmt::Debug for CacheScheduler<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheScheduler")
            .field("policy", &self.strategy.policy().as_str())
            .field("capacity", &self.pool.capacity())
            .field("used_memory", &self.pool.used_memory())
            .field("resident", &self.pool.len())
            .field("running", &self.pool.running_len())
            .field("wall_time", &self.wall_time)
            .finish()
    }
}
