//! Errors raised while generating, reading, running or analyzing traces.

use faas_cache::{ConfigError, LogError, SimulationError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for simulator results.
pub type Result<T, E = SimulatorError> = std::result::Result<T, E>;

/// Everything that can stop a simulator command.
#[derive(Error, Debug)]
pub enum SimulatorError {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A CSV file could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The scheduler stopped a run.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Invalid scheduler or profile configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A performance log could not be opened or written.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Invalid file search pattern.
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A path matched by a glob could not be read.
    #[error("glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// Two trace rows disagree about a function's profile.
    #[error("line {line}: profile of '{kind}' differs from its first occurrence")]
    InconsistentProfile {
        /// Function kind.
        kind: String,
        /// One-based line number in the trace file.
        line: u64,
    },

    /// A trace timestamp is NaN or infinite.
    #[error("line {line}: time {time} is not a finite number")]
    NonFiniteTime {
        /// One-based line number in the trace file.
        line: u64,
        /// Offending timestamp.
        time: f64,
    },

    /// Trace timestamps must not decrease.
    #[error("line {line}: time {time} is earlier than the previous invocation at {previous}")]
    TimeDecreased {
        /// One-based line number in the trace file.
        line: u64,
        /// Offending timestamp.
        time: f64,
        /// Timestamp of the row before.
        previous: f64,
    },

    /// The trace has no invocations.
    #[error("trace {0} contains no invocations")]
    EmptyTrace(PathBuf),

    /// A trace preset parameter is out of range.
    #[error("invalid generator parameter: {0}")]
    InvalidGenerator(String),

    /// A performance log file name does not follow
    /// `POLICY-FUNCS-MEMORY-RUN-performancelog.csv`.
    #[error("unrecognized performance log name: {0}")]
    BadLogName(String),

    /// A run label would make log file names ambiguous.
    #[error("run label '{0}' must be non-empty and must not contain '-'")]
    BadRunLabel(String),

    /// No trace length is known for a performance log.
    #[error("no trace length recorded for {0}; pass the trace file")]
    MissingTraceLength(String),

    /// A simulation thread panicked.
    #[error("simulation run {0} panicked")]
    RunPanicked(String),
}
