//! Trace input.
//!
//! Parses the `kind,mem_size,cold_time,warm_time,time` CSV written by the
//! generator. Every row repeats its function's profile; the reader keeps one
//! shared [`FunctionProfile`] per kind and rejects rows that disagree with the
//! first occurrence. Timestamps must be finite and non-decreasing since the
//! scheduler replays events in file order.

use crate::error::{Result, SimulatorError};
use crate::models::TraceRow;
use faas_cache::{FunctionProfile, InvocationEvent};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A parsed trace.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    functions: BTreeMap<String, Arc<FunctionProfile>>,
    events: Vec<InvocationEvent>,
}

impl Trace {
    /// Distinct functions by kind.
    pub fn functions(&self) -> &BTreeMap<String, Arc<FunctionProfile>> {
        &self.functions
    }

    /// Number of distinct functions.
    pub fn num_funcs(&self) -> usize {
        self.functions.len()
    }

    /// Invocations in arrival order.
    pub fn events(&self) -> &[InvocationEvent] {
        &self.events
    }

    /// Number of invocations.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the trace has no invocations.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Builds a trace from rows, validating profiles and ordering.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<TraceRow>>,
    {
        let mut trace = Trace::default();
        let mut previous = f64::NEG_INFINITY;

        for (i, row) in rows.into_iter().enumerate() {
            let row = row?;
            // header is line 1
            let line = i as u64 + 2;

            if !row.time.is_finite() {
                return Err(SimulatorError::NonFiniteTime {
                    line,
                    time: row.time,
                });
            }
            if row.time < previous {
                return Err(SimulatorError::TimeDecreased {
                    line,
                    time: row.time,
                    previous,
                });
            }
            previous = row.time;

            let profile = match trace.functions.get(&row.kind) {
                Some(profile) => {
                    if profile.mem_size() != row.mem_size
                        || profile.cold_run_time() != row.cold_time
                        || profile.warm_run_time() != row.warm_time
                    {
                        return Err(SimulatorError::InconsistentProfile {
                            kind: row.kind,
                            line,
                        });
                    }
                    Arc::clone(profile)
                }
                None => {
                    let profile = Arc::new(FunctionProfile::new(
                        row.kind.clone(),
                        row.mem_size,
                        row.cold_time,
                        row.warm_time,
                    )?);
                    trace.functions.insert(row.kind, Arc::clone(&profile));
                    profile
                }
            };
            trace.events.push(InvocationEvent::new(profile, row.time));
        }
        Ok(trace)
    }
}

/// Reads a trace from any CSV source with a header row.
pub fn read_trace_from<R: io::Read>(reader: R) -> Result<Trace> {
    let mut reader = csv::Reader::from_reader(reader);
    Trace::from_rows(
        reader
            .deserialize::<TraceRow>()
            .map(|row| row.map_err(SimulatorError::from)),
    )
}

/// Reads a trace file.
///
/// # Errors
///
/// I/O and parse errors, inconsistent profiles, non-finite or decreasing
/// timestamps, and an empty trace.
pub fn read_trace<P: AsRef<Path>>(path: P) -> Result<Trace> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let trace = read_trace_from(BufReader::new(file))?;
    if trace.is_empty() {
        return Err(SimulatorError::EmptyTrace(path.to_path_buf()));
    }
    info!(
        path = %path.display(),
        invocations = trace.len(),
        functions = trace.num_funcs(),
        "trace loaded"
    );
    Ok(trace)
}
