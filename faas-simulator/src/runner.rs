//! Sweep runner.
//!
//! Replays one trace against every `(policy, memory)` combination of a
//! [`SimulationConfig`]. Runs are spread over a fixed pool of
//! `config.workers` threads, so at most that many performance logs are open
//! at once. Each run owns its scheduler and log; the trace's profiles are
//! shared read-only.
//!
//! For every run the runner writes
//! `POLICY-FUNCS-MEMORY-RUN-performancelog.csv` into the output directory,
//! and once all runs are done, one row per run into `runs.csv`. Analysis reads
//! both back later.

use crate::error::{Result, SimulatorError};
use crate::input::Trace;
use crate::models::{RunKey, RunSummary, SimulationConfig, RUNS_FILE};
use faas_cache::{CacheMetrics, CacheScheduler, CsvPerformanceLog, EvictionPolicy};
use scoped_threadpool::Pool;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;
use tracing::{error, info};

/// Runner for policy and memory sweeps
#[derive(Debug)]
pub struct SweepRunner {
    config: SimulationConfig,
}

impl SweepRunner {
    /// Create a new sweep runner
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Sweep configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run keys in the order they are reported: by policy, then memory.
    pub fn keys(&self, trace: &Trace) -> Vec<RunKey> {
        let mut keys = Vec::new();
        for &policy in &self.config.policies {
            for &memory in &self.config.memory_sizes {
                keys.push(RunKey {
                    policy,
                    num_funcs: trace.num_funcs(),
                    memory,
                    run: self.config.run_label.clone(),
                });
            }
        }
        keys
    }

    /// Runs every configuration on the worker pool and writes `runs.csv`.
    ///
    /// Summaries come back in [`keys`](Self::keys) order. The first failing
    /// run's error is returned after all runs finish.
    pub fn run(&self, trace: &Trace) -> Result<Vec<RunSummary>> {
        self.config.validate()?;
        fs::create_dir_all(&self.config.output_dir)?;

        let keys = self.keys(trace);
        let workers = self.config.workers.clamp(1, keys.len().max(1));
        info!(
            runs = keys.len(),
            workers,
            invocations = trace.len(),
            output = %self.config.output_dir.display(),
            "starting sweep"
        );
        let start = Instant::now();

        let (tx, rx) = mpsc::channel();
        let mut pool = Pool::new(workers as u32);
        pool.scoped(|scope| {
            for (index, key) in keys.iter().enumerate() {
                let tx = tx.clone();
                scope.execute(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.run_one(key, trace)
                    }))
                    .unwrap_or_else(|_| Err(SimulatorError::RunPanicked(key.to_string())));
                    // the receiver outlives the pool
                    let _ = tx.send((index, result));
                });
            }
        });
        drop(tx);

        let mut results: Vec<Option<Result<RunSummary>>> = keys.iter().map(|_| None).collect();
        for (index, result) in rx {
            results[index] = Some(result);
        }

        let mut summaries = Vec::with_capacity(keys.len());
        for (result, key) in results.into_iter().zip(&keys) {
            match result.unwrap_or_else(|| Err(SimulatorError::RunPanicked(key.to_string()))) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!(run = %key, error = %e, "simulation run failed");
                    return Err(e);
                }
            }
        }

        write_runs(&summaries, &self.config.output_dir.join(RUNS_FILE))?;
        info!(elapsed = ?start.elapsed(), "sweep complete");
        Ok(summaries)
    }

    /// Replays the trace for a single configuration.
    pub fn run_one(&self, key: &RunKey, trace: &Trace) -> Result<RunSummary> {
        let log_path = self.config.output_dir.join(key.log_file_name());
        let log = CsvPerformanceLog::create(&log_path)?;
        let scheduler_config = self.config.scheduler_config(key.policy, key.memory);
        let mut scheduler = CacheScheduler::with_log(scheduler_config, log)?;

        scheduler.run_trace(trace.events())?;
        scheduler.flush()?;

        info!(
            run = %key,
            hits = scheduler.scheduler_metrics().warm_hits,
            misses = scheduler.scheduler_metrics().cold_misses,
            dropped = scheduler.scheduler_metrics().capacity_misses,
            "run finished"
        );

        Ok(RunSummary {
            key: key.clone(),
            trace_len: trace.len() as u64,
            log_path,
            evictions: scheduler.evictions().clone(),
            capacity_misses: scheduler.capacity_misses().clone(),
            metrics: scheduler.metrics(),
        })
    }
}

/// Writes one `runs.csv` row per summary.
pub fn write_runs(summaries: &[RunSummary], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for summary in summaries {
        writer.serialize(summary.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Prints a per-run table, grouped by policy.
pub fn print_summary(summaries: &[RunSummary]) {
    println!("\nSweep Summary");
    println!("=============");
    println!(
        "{:<24} {:>8} {:>10} {:>10} {:>10} {:>10} {:>8} {:>8}",
        "Policy", "Memory", "Hits", "Misses", "Dropped", "Evicted", "Cold%", "Drop%"
    );
    println!("{}", "-".repeat(96));

    let mut current: Option<EvictionPolicy> = None;
    for summary in summaries {
        let row = summary.to_row();
        let policy = if current == Some(summary.key.policy) {
            ""
        } else {
            current = Some(summary.key.policy);
            summary.key.policy.as_str()
        };
        println!(
            "{:<24} {:>8} {:>10} {:>10} {:>10} {:>10} {:>7.2}% {:>7.2}%",
            policy,
            row.memory,
            row.hits,
            row.misses,
            row.capacity_misses,
            row.evictions,
            row.cold_pct,
            row.dropped_pct
        );
    }
}
