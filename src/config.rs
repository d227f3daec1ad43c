//! Scheduler configuration.
//!
//! [`SchedulerConfig`] is the single entry point for configuring a
//! [`CacheScheduler`](crate::CacheScheduler): memory capacity, eviction
//! policy, the provider overhead added to every cold start, and the seed for
//! randomized policies.
//!
//! # Cold-start time
//!
//! ```text
//! cold_time = overhead_base + cold_run_time + overhead_pct * cold_run_time
//! ```
//!
//! With the defaults (`3000`, `0.20`) a function with a cold run time of 100
//! occupies its container for 3120 time units on a cold start.
//!
//! # Examples
//!
//! ```
//! use faas_cache::config::SchedulerConfig;
//! use faas_cache::EvictionPolicy;
//!
//! let config = SchedulerConfig::new(32_000)
//!     .with_policy(EvictionPolicy::GreedyDual)
//!     .with_overhead(2000.0, 0.1)
//!     .with_seed(7);
//! assert_eq!(config.capacity(), 32_000);
//! assert_eq!(config.cold_time(100.0), 2110.0);
//! ```

use crate::error::ConfigError;
use crate::eviction::EvictionPolicy;
use core::fmt;

/// Default fixed cold-start overhead, in trace time units (ms).
pub const DEFAULT_OVERHEAD_BASE: f64 = 3000.0;
/// Default share of the cold run time added to a cold start.
pub const DEFAULT_OVERHEAD_PCT: f64 = 0.2;
/// Default memory capacity, in the unit of profile sizes (MB).
pub const DEFAULT_CAPACITY: u64 = 32_000;

/// Configuration for a [`CacheScheduler`](crate::CacheScheduler).
///
/// # Required Parameters
///
/// - `capacity`: memory available to resident containers (set in constructor)
///
/// # Optional Parameters (Builder Methods)
///
/// - `policy`: eviction policy (default: `RAND`)
/// - `overhead_base` / `overhead_pct`: cold-start overhead (default: 3000, 0.20)
/// - `seed`: RNG seed for randomized policies (default: 0)
#[derive(Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    capacity: u64,
    policy: EvictionPolicy,
    overhead_base: f64,
    overhead_pct: f64,
    seed: u64,
}

impl SchedulerConfig {
    /// Creates a configuration with `capacity` and default everything else.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            policy: EvictionPolicy::Random,
            overhead_base: DEFAULT_OVERHEAD_BASE,
            overhead_pct: DEFAULT_OVERHEAD_PCT,
            seed: 0,
        }
    }

    /// Sets the eviction policy.
    #[must_use]
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the cold-start overhead.
    ///
    /// # Arguments
    ///
    /// * `base` - Fixed overhead added to every cold start
    /// * `pct` - Fraction of the function's cold run time added on top
    #[must_use]
    pub fn with_overhead(mut self, base: f64, pct: f64) -> Self {
        self.overhead_base = base;
        self.overhead_pct = pct;
        self
    }

    /// Sets the seed used by randomized policies.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Memory available to resident containers.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Eviction policy.
    #[inline]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Fixed cold-start overhead.
    #[inline]
    pub fn overhead_base(&self) -> f64 {
        self.overhead_base
    }

    /// Share of the cold run time added to a cold start.
    #[inline]
    pub fn overhead_pct(&self) -> f64 {
        self.overhead_pct
    }

    /// RNG seed for randomized policies.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Time a container stays busy serving a cold start of a function with
    /// the given cold run time.
    #[inline]
    pub fn cold_time(&self, cold_run_time: f64) -> f64 {
        self.overhead_base + cold_run_time + self.overhead_pct * cold_run_time
    }

    /// Checks the configuration before a scheduler is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(self.overhead_base) || !valid(self.overhead_pct) {
            return Err(ConfigError::InvalidOverhead {
                base: self.overhead_base,
                pct: self.overhead_pct,
            });
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy.as_str())
            .field("overhead_base", &self.overhead_base)
            .field("overhead_pct", &self.overhead_pct)
            .field("seed", &self.seed)
            .finish()
    }
}
