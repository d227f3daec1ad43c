// Data models for trace replay and analysis

use crate::error::{Result, SimulatorError};
use faas_cache::config::{DEFAULT_OVERHEAD_BASE, DEFAULT_OVERHEAD_PCT};
use faas_cache::{EvictionPolicy, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

/// Suffix of every performance log written by the runner.
pub const PERF_LOG_SUFFIX: &str = "-performancelog.csv";

/// File the runner writes its per-run summary rows to.
pub const RUNS_FILE: &str = "runs.csv";

/// One row of a trace file: the invoked function's profile and the time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Function kind.
    pub kind: String,
    /// Memory footprint (MB).
    pub mem_size: u64,
    /// Run time from a cold container (ms).
    pub cold_time: f64,
    /// Run time from a warm container (ms).
    pub warm_time: f64,
    /// Arrival time (ms).
    pub time: f64,
}

/// Identifies one simulation run inside a sweep.
///
/// The key is encoded in the performance log file name as
/// `POLICY-FUNCS-MEMORY-RUN-performancelog.csv`, which is how analysis finds
/// its way back to the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey {
    /// Eviction policy.
    pub policy: EvictionPolicy,
    /// Number of distinct functions in the trace.
    pub num_funcs: usize,
    /// Memory capacity (MB).
    pub memory: u64,
    /// Free-form run label.
    pub run: String,
}

impl RunKey {
    /// File name of this run's performance log.
    pub fn log_file_name(&self) -> String {
        format!("{self}{PERF_LOG_SUFFIX}")
    }

    /// Parses a performance log file name back into a key.
    pub fn from_log_file_name(name: &str) -> Result<Self> {
        let bad = || SimulatorError::BadLogName(name.to_string());
        let stem = name.strip_suffix(PERF_LOG_SUFFIX).ok_or_else(bad)?;
        let parts: Vec<&str> = stem.split('-').collect();
        let [policy, num_funcs, memory, run] = parts.as_slice() else {
            return Err(bad());
        };
        Ok(Self {
            policy: policy.parse().map_err(|_| bad())?,
            num_funcs: num_funcs.parse().map_err(|_| bad())?,
            memory: memory.parse().map_err(|_| bad())?,
            run: run.to_string(),
        })
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.policy.as_str(),
            self.num_funcs,
            self.memory,
            self.run
        )
    }
}

/// Configuration for a sweep over policies and memory sizes
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Directory performance logs and `runs.csv` are written to
    pub output_dir: PathBuf,
    /// Policies to run
    pub policies: Vec<EvictionPolicy>,
    /// Memory capacities to run each policy at (MB)
    pub memory_sizes: Vec<u64>,
    /// Label distinguishing repeated sweeps
    pub run_label: String,
    /// Seed for randomized policies
    pub seed: u64,
    /// Fixed cold-start overhead (ms)
    pub overhead_base: f64,
    /// Share of the cold run time added to a cold start
    pub overhead_pct: f64,
    /// Runs executed at the same time; each holds one open log file
    pub workers: usize,
}

impl SimulationConfig {
    /// Every policy at the given memory sizes, default overhead.
    pub fn new(output_dir: impl Into<PathBuf>, memory_sizes: Vec<u64>) -> Self {
        Self {
            output_dir: output_dir.into(),
            policies: EvictionPolicy::all(),
            memory_sizes,
            run_label: "0".to_string(),
            seed: 0,
            overhead_base: DEFAULT_OVERHEAD_BASE,
            overhead_pct: DEFAULT_OVERHEAD_PCT,
            workers: default_workers(),
        }
    }

    /// Checks the run label can be encoded in a log file name.
    pub fn validate(&self) -> Result<()> {
        if self.run_label.is_empty() || self.run_label.contains('-') {
            return Err(SimulatorError::BadRunLabel(self.run_label.clone()));
        }
        Ok(())
    }

    /// Scheduler configuration for one run.
    pub fn scheduler_config(&self, policy: EvictionPolicy, memory: u64) -> SchedulerConfig {
        SchedulerConfig::new(memory)
            .with_policy(policy)
            .with_overhead(self.overhead_base, self.overhead_pct)
            .with_seed(self.seed)
    }
}

/// Worker count used when none is configured: the available parallelism.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Cold-start and drop percentages.
///
/// - cold: misses over served invocations
/// - dropped: capacity misses over trace length
pub fn percentages(hits: u64, misses: u64, dropped: u64, trace_len: u64) -> (f64, f64) {
    let served = hits + misses;
    let cold = if served > 0 {
        misses as f64 / served as f64 * 100.0
    } else {
        0.0
    };
    let dropped = if trace_len > 0 {
        dropped as f64 / trace_len as f64 * 100.0
    } else {
        0.0
    };
    (cold, dropped)
}

/// Outcome of a single run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Which run
    pub key: RunKey,
    /// Invocations in the trace
    pub trace_len: u64,
    /// Where the performance log was written
    pub log_path: PathBuf,
    /// Evictions per function kind
    pub evictions: BTreeMap<String, u64>,
    /// Capacity misses per function kind
    pub capacity_misses: BTreeMap<String, u64>,
    /// Scheduler metrics at the end of the run
    pub metrics: BTreeMap<String, f64>,
}

impl RunSummary {
    fn metric(&self, name: &str) -> u64 {
        self.metrics.get(name).copied().unwrap_or(0.0) as u64
    }

    /// Row written to `runs.csv`.
    pub fn to_row(&self) -> RunRow {
        let hits = self.metric("warm_hits");
        let misses = self.metric("cold_misses");
        let dropped: u64 = self.capacity_misses.values().sum();
        let (cold_pct, dropped_pct) = percentages(hits, misses, dropped, self.trace_len);
        RunRow {
            policy: self.key.policy.as_str().to_string(),
            num_funcs: self.key.num_funcs,
            memory: self.key.memory,
            run: self.key.run.clone(),
            trace_len: self.trace_len,
            hits,
            misses,
            capacity_misses: dropped,
            evictions: self.evictions.values().sum(),
            peak_memory: self.metric("peak_memory"),
            cold_pct,
            dropped_pct,
        }
    }
}

/// Row of `runs.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRow {
    pub policy: String,
    pub num_funcs: usize,
    pub memory: u64,
    pub run: String,
    pub trace_len: u64,
    pub hits: u64,
    pub misses: u64,
    pub capacity_misses: u64,
    pub evictions: u64,
    pub peak_memory: u64,
    pub cold_pct: f64,
    pub dropped_pct: f64,
}

/// Row of the analysis CSV export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvResultRow {
    pub policy: String,
    pub num_funcs: usize,
    pub memory: u64,
    pub run: String,
    pub hits: u64,
    pub misses: u64,
    pub dropped: u64,
    pub trace_len: u64,
    pub cold_pct: f64,
    pub dropped_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_name_round_trip() {
        let key = RunKey {
            policy: EvictionPolicy::LfuGroupSizeInit,
            num_funcs: 20,
            memory: 4096,
            run: "a".to_string(),
        };
        let name = key.log_file_name();
        assert_eq!(name, "LFU_GROUP_SIZE_INIT-20-4096-a-performancelog.csv");
        assert_eq!(RunKey::from_log_file_name(&name).unwrap(), key);
    }

    #[test]
    fn test_bad_log_names() {
        for name in [
            "LRU-20-4096-performancelog.csv",
            "LRU-x-4096-a-performancelog.csv",
            "MRU-20-4096-a-performancelog.csv",
            "LRU-20-4096-a.csv",
        ] {
            assert!(
                matches!(
                    RunKey::from_log_file_name(name),
                    Err(SimulatorError::BadLogName(_))
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn test_run_label_validation() {
        let mut config = SimulationConfig::new("out", vec![1000]);
        assert!(config.validate().is_ok());
        config.run_label = "a-b".to_string();
        assert!(config.validate().is_err());
        config.run_label = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_workers() {
        let config = SimulationConfig::new("out", vec![1000]);
        assert!(config.workers >= 1);
        assert_eq!(config.workers, default_workers());
    }

    #[test]
    fn test_percentages() {
        assert_eq!(percentages(3, 1, 1, 5), (25.0, 20.0));
        assert_eq!(percentages(0, 0, 0, 0), (0.0, 0.0));
    }

    #[test]
    fn test_scheduler_config() {
        let mut config = SimulationConfig::new("out", vec![1000]);
        config.overhead_base = 100.0;
        config.seed = 3;
        let sc = config.scheduler_config(EvictionPolicy::Lru, 2048);
        assert_eq!(sc.capacity(), 2048);
        assert_eq!(sc.policy(), EvictionPolicy::Lru);
        assert_eq!(sc.overhead_base(), 100.0);
        assert_eq!(sc.seed(), 3);
    }
}
