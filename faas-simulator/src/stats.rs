//! Performance log analysis.
//!
//! Reads the logs a sweep left behind and turns them into cold-start and drop
//! percentages per run. Logs are matched by their file name; the trace length
//! each percentage is taken against comes from `runs.csv` next to the logs,
//! or from the trace file when one is given.

use crate::error::{Result, SimulatorError};
use crate::models::{percentages, CsvResultRow, RunKey, RunRow, PERF_LOG_SUFFIX, RUNS_FILE};
use faas_cache::{EvictionPolicy, OutcomeKind, OutcomeRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Hit and miss counts for one function kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub hits: u64,
    pub misses: u64,
}

impl KindStats {
    /// Served invocations.
    pub fn served(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Counts hits and misses per function kind in one performance log.
pub fn miss_stats<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, KindStats>> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let mut stats: BTreeMap<String, KindStats> = BTreeMap::new();
    for record in reader.deserialize::<OutcomeRecord>() {
        let record = record?;
        let entry = stats.entry(record.kind).or_default();
        match record.outcome {
            OutcomeKind::Hit => entry.hits += 1,
            OutcomeKind::Miss => entry.misses += 1,
        }
    }
    Ok(stats)
}

/// Analysis of one run.
#[derive(Debug, Clone)]
pub struct RunAnalysis {
    pub key: RunKey,
    pub path: PathBuf,
    pub per_kind: BTreeMap<String, KindStats>,
    pub trace_len: u64,
    /// Invocations in the trace that never reached the log.
    pub dropped: u64,
}

impl RunAnalysis {
    pub fn hits(&self) -> u64 {
        self.per_kind.values().map(|s| s.hits).sum()
    }

    pub fn misses(&self) -> u64 {
        self.per_kind.values().map(|s| s.misses).sum()
    }

    /// Cold starts as a percentage of served invocations.
    pub fn cold_pct(&self) -> f64 {
        percentages(self.hits(), self.misses(), self.dropped, self.trace_len).0
    }

    /// Capacity misses as a percentage of the trace.
    pub fn dropped_pct(&self) -> f64 {
        percentages(self.hits(), self.misses(), self.dropped, self.trace_len).1
    }

    pub fn to_row(&self) -> CsvResultRow {
        let (cold_pct, dropped_pct) =
            percentages(self.hits(), self.misses(), self.dropped, self.trace_len);
        CsvResultRow {
            policy: self.key.policy.as_str().to_string(),
            num_funcs: self.key.num_funcs,
            memory: self.key.memory,
            run: self.key.run.clone(),
            hits: self.hits(),
            misses: self.misses(),
            dropped: self.dropped,
            trace_len: self.trace_len,
            cold_pct,
            dropped_pct,
        }
    }
}

/// Reads a directory of performance logs.
#[derive(Debug, Clone)]
pub struct LogAnalyzer {
    log_dir: PathBuf,
    trace_len: Option<u64>,
    policy: Option<EvictionPolicy>,
}

impl LogAnalyzer {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            trace_len: None,
            policy: None,
        }
    }

    /// Uses a known trace length for every log instead of `runs.csv`.
    pub fn with_trace_len(mut self, trace_len: u64) -> Self {
        self.trace_len = Some(trace_len);
        self
    }

    /// Only analyzes logs of one policy.
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Performance logs in the directory, sorted by path.
    pub fn log_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.log_dir.join(format!("*{PERF_LOG_SUFFIX}"));
        let mut paths = Vec::new();
        for entry in glob::glob(&pattern.to_string_lossy())? {
            paths.push(entry?);
        }
        paths.sort();
        Ok(paths)
    }

    fn runs(&self) -> Result<BTreeMap<String, RunRow>> {
        let path = self.log_dir.join(RUNS_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let mut runs = BTreeMap::new();
        for row in reader.deserialize::<RunRow>() {
            let row = row?;
            let stem = format!("{}-{}-{}-{}", row.policy, row.num_funcs, row.memory, row.run);
            runs.insert(stem, row);
        }
        Ok(runs)
    }

    /// Analyzes every matching log, sorted by run key.
    ///
    /// File names that do not parse as run keys are skipped with a warning.
    pub fn analyze(&self) -> Result<Vec<RunAnalysis>> {
        let runs = self.runs()?;
        let mut results = Vec::new();

        for path in self.log_files()? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let key = match RunKey::from_log_file_name(&name) {
                Ok(key) => key,
                Err(e) => {
                    warn!(error = %e, "skipping log");
                    continue;
                }
            };
            if self.policy.is_some_and(|p| p != key.policy) {
                continue;
            }

            let per_kind = miss_stats(&path)?;
            let served: u64 = per_kind.values().map(KindStats::served).sum();
            let recorded = runs.get(&key.to_string());
            let trace_len = match (self.trace_len, recorded) {
                (Some(len), _) => len,
                (None, Some(row)) => row.trace_len,
                (None, None) => return Err(SimulatorError::MissingTraceLength(name)),
            };
            let dropped = match recorded {
                Some(row) if self.trace_len.is_none() => row.capacity_misses,
                _ => trace_len.saturating_sub(served),
            };
            debug!(run = %key, served, trace_len, dropped, "analyzed log");

            results.push(RunAnalysis {
                key,
                path,
                per_kind,
                trace_len,
                dropped,
            });
        }

        results.sort_by(|a, b| a.key.cmp(&b.key));
        info!(
            logs = results.len(),
            dir = %self.log_dir.display(),
            "analysis complete"
        );
        Ok(results)
    }
}

/// Prints one line per run, grouped by policy.
pub fn print_analysis(results: &[RunAnalysis]) {
    println!("\nPerformance Log Analysis");
    println!("========================");
    println!("Runs analyzed: {}", results.len());

    println!("\nResults by Policy and Memory:");
    println!(
        "{:<24} {:>6} {:>8} {:>6} {:>10} {:>10} {:>10} {:>8} {:>8}",
        "Policy", "Funcs", "Memory", "Run", "Hits", "Misses", "Dropped", "Cold%", "Drop%"
    );
    println!("{}", "-".repeat(100));

    for analysis in results {
        let row = analysis.to_row();
        println!(
            "{:<24} {:>6} {:>8} {:>6} {:>10} {:>10} {:>10} {:>7.2}% {:>7.2}%",
            row.policy,
            row.num_funcs,
            row.memory,
            row.run,
            row.hits,
            row.misses,
            row.dropped,
            row.cold_pct,
            row.dropped_pct
        );
    }
}

/// Prints per-kind cold-start percentages of one run.
pub fn print_per_kind(analysis: &RunAnalysis) {
    println!("\n{}", analysis.key);
    println!("{:<16} {:>10} {:>10} {:>8}", "Kind", "Hits", "Misses", "Cold%");
    for (kind, stats) in &analysis.per_kind {
        let (cold, _) = percentages(stats.hits, stats.misses, 0, 0);
        println!(
            "{:<16} {:>10} {:>10} {:>7.2}%",
            kind, stats.hits, stats.misses, cold
        );
    }
}

/// Exports one CSV row per run.
pub fn export_csv(results: &[RunAnalysis], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for analysis in results {
        writer.serialize(analysis.to_row())?;
    }
    writer.flush()?;
    Ok(())
}
