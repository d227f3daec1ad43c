//! Function profiles.
//!
//! A [`FunctionProfile`] describes one function "kind": how much memory a
//! container for it occupies and how long an invocation takes when the
//! container is cold versus warm. Profiles are immutable and shared through
//! `Arc` so that any number of containers, and any number of independent
//! simulations, can point at the same description.
//!
//! # Examples
//!
//! ```
//! use faas_cache::FunctionProfile;
//!
//! let profile = FunctionProfile::new("thumbnail", 256, 900.0, 150.0).unwrap();
//! assert_eq!(profile.mem_size(), 256);
//! assert_eq!(profile.init_time(), 750.0);
//! ```

use crate::error::ConfigError;
use core::fmt;

/// Immutable description of a function kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProfile {
    kind: String,
    mem_size: u64,
    cold_run_time: f64,
    warm_run_time: f64,
}

impl FunctionProfile {
    /// Creates a validated profile.
    ///
    /// # Arguments
    ///
    /// * `kind` - Identifier of the function kind
    /// * `mem_size` - Memory footprint of one container, must be positive
    /// * `cold_run_time` - Execution time when the container starts cold
    /// * `warm_run_time` - Execution time on an already warm container
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProfile`] for a zero memory size or a
    /// negative or non-finite run time.
    pub fn new(
        kind: impl Into<String>,
        mem_size: u64,
        cold_run_time: f64,
        warm_run_time: f64,
    ) -> Result<Self, ConfigError> {
        let kind = kind.into();
        if mem_size == 0 {
            return Err(ConfigError::InvalidProfile {
                kind,
                reason: "memory size must be greater than zero",
            });
        }
        if !cold_run_time.is_finite() || cold_run_time < 0.0 {
            return Err(ConfigError::InvalidProfile {
                kind,
                reason: "cold run time must be finite and non-negative",
            });
        }
        if !warm_run_time.is_finite() || warm_run_time < 0.0 {
            return Err(ConfigError::InvalidProfile {
                kind,
                reason: "warm run time must be finite and non-negative",
            });
        }
        Ok(Self {
            kind,
            mem_size,
            cold_run_time,
            warm_run_time,
        })
    }

    /// Function kind identifier.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Memory occupied by one container of this kind.
    #[inline]
    pub fn mem_size(&self) -> u64 {
        self.mem_size
    }

    /// Execution time from a cold container, before provider overhead.
    #[inline]
    pub fn cold_run_time(&self) -> f64 {
        self.cold_run_time
    }

    /// Execution time on a warm container.
    #[inline]
    pub fn warm_run_time(&self) -> f64 {
        self.warm_run_time
    }

    /// Estimated container start-up overhead: cold minus warm run time,
    /// never negative.
    #[inline]
    pub fn init_time(&self) -> f64 {
        (self.cold_run_time - self.warm_run_time).max(0.0)
    }
}

impl fmt::Display for FunctionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (mem={}, cold={}, warm={})",
            self.kind, self.mem_size, self.cold_run_time, self.warm_run_time
        )
    }
}
