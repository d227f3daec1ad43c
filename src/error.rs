//! Error types for the container cache model.
//!
//! Capacity misses are not errors: they are an ordinary
//! [`InvocationOutcome`](crate::scheduler::InvocationOutcome). Everything in
//! this module either stops a run (invariant violations, sink failures) or
//! prevents one from starting (configuration errors).

use crate::container::ContainerId;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SimulationError> = core::result::Result<T, E>;

/// Top-level error returned by scheduler and pool operations.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Memory accounting or running-set bookkeeping is inconsistent.
    /// The run cannot continue.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The scheduler or a profile was configured with invalid values.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The performance log sink failed to record an outcome.
    #[error("performance log error: {0}")]
    Log(#[from] LogError),

    /// An invocation arrived with a NaN or infinite timestamp.
    #[error("invocation time {0} is not finite")]
    InvalidTime(f64),
}

/// Internal-consistency failures of the container pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Recomputed resident memory does not match the tracked counter.
    #[error("container pool memory {actual} does not match tracked usage {tracked}")]
    MemoryMismatch {
        /// Value held by the pool's counter.
        tracked: u64,
        /// Sum of resident container sizes.
        actual: u64,
    },

    /// Resident memory exceeds the configured capacity.
    #[error("container pool memory {used} exceeds capacity {capacity}")]
    CapacityExceeded {
        /// Resident memory.
        used: u64,
        /// Configured capacity.
        capacity: u64,
    },

    /// Attempted to remove a container that is executing a request.
    #[error("cannot remove running container {0}")]
    RunningRemoval(ContainerId),

    /// Attempted to operate on a container that is not resident.
    #[error("container {0} is not resident in the pool")]
    UnknownContainer(ContainerId),

    /// Attempted to mark a container running twice.
    #[error("container {0} is already running")]
    AlreadyRunning(ContainerId),
}

/// Rejected configuration, reported before any invocation runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The eviction policy identifier is not one of the supported policies.
    #[error("unknown eviction policy: {0}")]
    UnknownPolicy(String),

    /// Memory capacity must be positive.
    #[error("memory capacity must be greater than zero")]
    ZeroCapacity,

    /// Cold-start overhead values must be finite and non-negative.
    #[error("invalid provider overhead: base={base}, pct={pct}")]
    InvalidOverhead {
        /// Fixed overhead added to every cold start.
        base: f64,
        /// Fraction of the cold run time added to every cold start.
        pct: f64,
    },

    /// A function profile has a zero memory size or a bad run time.
    #[error("invalid function profile '{kind}': {reason}")]
    InvalidProfile {
        /// Function kind.
        kind: String,
        /// Why the profile was rejected.
        reason: &'static str,
    },
}

/// Failure of the outcome sink.
#[derive(Error, Debug)]
pub enum LogError {
    /// Underlying writer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
