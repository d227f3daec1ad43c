#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Model
//!
//! ```text
//! trace ──▶ CacheScheduler::run_invocation
//!               │
//!               ├─ reap finished containers
//!               ├─ ContainerPool::find_idle ──▶ hit
//!               └─ miss ──▶ EvictionStrategy::select_victims (if full)
//!                       └─▶ ContainerPool::try_add ──▶ miss | capacity miss
//!                                                          │
//!                                            PerformanceLog ◀┘
//! ```
//!
//! Time is logical: the scheduler never sleeps, it only compares trace
//! timestamps with the end times of running containers.
//!
//! ## Picking a policy at runtime
//!
//! ```rust
//! use faas_cache::{CacheScheduler, EvictionPolicy, SchedulerConfig};
//!
//! let policy: EvictionPolicy = "lfu_group_closest".parse().unwrap();
//! let scheduler = CacheScheduler::new(SchedulerConfig::new(4000).with_policy(policy)).unwrap();
//! assert_eq!(scheduler.policy().as_str(), "LFU_GROUP_CLOSEST");
//!
//! assert!("MRU".parse::<EvictionPolicy>().is_err());
//! ```
//!
//! ## Writing the performance log
//!
//! ```rust
//! use faas_cache::{CacheScheduler, CsvPerformanceLog, FunctionProfile, SchedulerConfig};
//! use std::sync::Arc;
//!
//! let log = CsvPerformanceLog::from_writer(Vec::new()).unwrap();
//! let mut scheduler = CacheScheduler::with_log(SchedulerConfig::new(100), log).unwrap();
//! let f = Arc::new(FunctionProfile::new("f", 10, 1.0, 1.0).unwrap());
//! scheduler.run_invocation(&f, 0.0).unwrap();
//!
//! let csv = scheduler.into_log().into_inner().unwrap();
//! assert_eq!(String::from_utf8(csv).unwrap(), "lambda,time,meta\nf,0.0,miss\n");
//! ```
//!
//! ## Modules
//!
//! - [`profile`]: Function profiles
//! - [`container`]: Container instances and handles
//! - [`pool`]: Resident containers, running set and memory accounting
//! - [`eviction`]: Eviction policies
//! - [`scheduler`]: The discrete-event scheduler
//! - [`config`]: Scheduler configuration
//! - [`perf_log`]: Outcome sinks
//! - [`metrics`]: Post-run counters
//! - [`error`]: Error types

/// Scheduler configuration.
pub mod config;

/// Container instances.
///
/// A container is bound to one function profile for its whole life and
/// carries the counters eviction policies rank it by.
pub mod container;

/// Error types.
pub mod error;

/// Eviction strategies.
///
/// One module per policy family, all implementing
/// [`EvictionStrategy`](eviction::EvictionStrategy).
pub mod eviction;

/// Scheduler metrics.
///
/// Counters for hits, cold starts, capacity misses and evictions, reported
/// through the [`CacheMetrics`](metrics::CacheMetrics) interface.
pub mod metrics;

/// Performance log sinks.
pub mod perf_log;

/// Container pool.
///
/// Owns resident containers and the running set, and is the only place
/// resident memory is accounted.
pub mod pool;

/// Function profiles.
pub mod profile;

/// The discrete-event scheduler.
pub mod scheduler;

pub use config::SchedulerConfig;
pub use container::{Container, ContainerId};
pub use error::{ConfigError, InvariantViolation, LogError, Result, SimulationError};
pub use eviction::{EvictionPolicy, EvictionStrategy, OverflowFallback};
pub use metrics::{CacheMetrics, SchedulerMetrics};
pub use perf_log::{CsvPerformanceLog, MemoryLog, OutcomeKind, OutcomeRecord, PerformanceLog};
pub use pool::{ContainerPool, RunningSlot};
pub use profile::FunctionProfile;
pub use scheduler::{CacheScheduler, InvocationEvent, InvocationOutcome};
