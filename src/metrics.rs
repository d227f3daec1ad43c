//! Scheduler Metrics
//!
//! Counters collected while a trace is replayed, plus the per-kind eviction
//! and capacity-miss tables external reporting consumes.
//!
//! Metrics are reported through a `BTreeMap<String, f64>` so that keys always
//! come out in the same order, which keeps CSV exports and test assertions
//! stable across runs.

use std::collections::BTreeMap;

/// Counters for one scheduler run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SchedulerMetrics {
    /// Invocations submitted to the scheduler.
    pub invocations: u64,

    /// Invocations served by an idle container of the same kind.
    pub warm_hits: u64,

    /// Invocations served by a newly created container.
    pub cold_misses: u64,

    /// Invocations dropped because memory could not be freed.
    pub capacity_misses: u64,

    /// Containers evicted.
    pub evictions: u64,

    /// Memory released by evictions.
    pub memory_evicted: u64,

    /// Number of times the eviction strategy was consulted.
    pub eviction_rounds: u64,

    /// Containers that finished a request and became idle again.
    pub reaped: u64,

    /// Highest resident memory observed.
    pub peak_memory: u64,

    /// Memory capacity of the pool.
    pub capacity: u64,

    /// Evictions per function kind.
    pub evictions_by_kind: BTreeMap<String, u64>,

    /// Capacity misses per function kind.
    pub capacity_misses_by_kind: BTreeMap<String, u64>,
}

impl SchedulerMetrics {
    /// Creates empty metrics for a pool of `capacity`.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Records a warm hit.
    pub fn record_hit(&mut self) {
        self.invocations += 1;
        self.warm_hits += 1;
    }

    /// Records a cold start that was admitted.
    pub fn record_miss(&mut self) {
        self.invocations += 1;
        self.cold_misses += 1;
    }

    /// Records a request that could not be admitted.
    pub fn record_capacity_miss(&mut self, kind: &str) {
        self.invocations += 1;
        self.capacity_misses += 1;
        *self
            .capacity_misses_by_kind
            .entry(kind.to_string())
            .or_insert(0) += 1;
    }

    /// Records one evicted container.
    pub fn record_eviction(&mut self, kind: &str, mem_size: u64) {
        self.evictions += 1;
        self.memory_evicted += mem_size;
        *self.evictions_by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Records a consultation of the eviction strategy.
    pub fn record_eviction_round(&mut self) {
        self.eviction_rounds += 1;
    }

    /// Records containers retired from the running set.
    pub fn record_reaped(&mut self, count: usize) {
        self.reaped += count as u64;
    }

    /// Updates the resident memory high-water mark.
    pub fn observe_memory(&mut self, used: u64) {
        self.peak_memory = self.peak_memory.max(used);
    }

    /// Served invocations that needed a new container, over all served.
    pub fn cold_start_ratio(&self) -> f64 {
        let served = self.warm_hits + self.cold_misses;
        if served > 0 {
            self.cold_misses as f64 / served as f64
        } else {
            0.0
        }
    }

    /// Dropped invocations over all submitted.
    pub fn drop_ratio(&self) -> f64 {
        if self.invocations > 0 {
            self.capacity_misses as f64 / self.invocations as f64
        } else {
            0.0
        }
    }

    /// Convert metrics to BTreeMap for reporting
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("invocations".to_string(), self.invocations as f64);
        metrics.insert("warm_hits".to_string(), self.warm_hits as f64);
        metrics.insert("cold_misses".to_string(), self.cold_misses as f64);
        metrics.insert("capacity_misses".to_string(), self.capacity_misses as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("memory_evicted".to_string(), self.memory_evicted as f64);
        metrics.insert("eviction_rounds".to_string(), self.eviction_rounds as f64);
        metrics.insert("reaped".to_string(), self.reaped as f64);

        metrics.insert("cold_start_ratio".to_string(), self.cold_start_ratio());
        metrics.insert("drop_ratio".to_string(), self.drop_ratio());

        metrics.insert("peak_memory".to_string(), self.peak_memory as f64);
        metrics.insert("capacity".to_string(), self.capacity as f64);
        if self.capacity > 0 {
            metrics.insert(
                "peak_utilization".to_string(),
                self.peak_memory as f64 / self.capacity as f64,
            );
        }

        metrics
    }
}

/// Uniform metrics interface, so reports can compare runs of different
/// policies without knowing their types.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Policy name for identification (e.g. "LRU", "GREEDY_DUAL")
    fn algorithm_name(&self) -> &'static str;
}
