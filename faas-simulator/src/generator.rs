//! Synthetic trace generation.
//!
//! Each function gets a mean inter-arrival time (IAT). Out of `n` requested
//! invocations, function `i` receives `frac_iat[i] * n` of them, where
//! `frac_iat` is the normalised reciprocal of the IATs: functions that arrive
//! twice as often get twice the invocations. Arrival gaps are drawn from an
//! exponential distribution with the function's mean IAT and truncated to
//! whole milliseconds. The per-function streams are merged and sorted by time.
//!
//! Output CSV:
//!
//! ```text
//! kind,mem_size,cold_time,warm_time,time
//! a,10,10.0,5.0,12.0
//! ```

use crate::error::{Result, SimulatorError};
use crate::models::TraceRow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Function description used to generate invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    /// Function kind.
    pub kind: String,
    /// Memory footprint (MB).
    pub mem_size: u64,
    /// Cold run time (ms).
    pub cold_time: f64,
    /// Warm run time (ms).
    pub warm_time: f64,
    /// Mean inter-arrival time (ms).
    pub iat: f64,
}

impl FunctionSpec {
    /// Creates a function description.
    pub fn new(kind: &str, mem_size: u64, cold_time: f64, warm_time: f64, iat: f64) -> Self {
        Self {
            kind: kind.to_string(),
            mem_size,
            cold_time,
            warm_time,
            iat,
        }
    }
}

/// Built-in function mixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracePreset {
    /// Four functions `a`..`d` spanning 10 MB to 1 GB, equal arrival rates.
    Default,
    /// Two functions, `smol` and `lorge`, arriving rarely relative to their
    /// run time.
    Planned,
    /// `functions` functions with random sizes, run times and rates.
    Random {
        /// Number of functions.
        functions: usize,
    },
}

const RANDOM_MEM_SIZES: [u64; 5] = [128, 256, 512, 1024, 2048];

impl TracePreset {
    /// Function descriptions for this preset. `rng` is only used by
    /// [`TracePreset::Random`].
    pub fn functions(&self, rng: &mut StdRng) -> Vec<FunctionSpec> {
        match *self {
            TracePreset::Default => vec![
                FunctionSpec::new("a", 10, 10.0, 5.0, 50.0),
                FunctionSpec::new("b", 50, 500.0, 100.0, 50.0),
                FunctionSpec::new("c", 100, 500.0, 400.0, 50.0),
                FunctionSpec::new("d", 1000, 3000.0, 2000.0, 50.0),
            ],
            TracePreset::Planned => vec![
                FunctionSpec::new("smol", 200, 400.0, 300.0, 300.0 * 1000.0),
                FunctionSpec::new("lorge", 2000, 990.0, 600.0, 600.0 * 1000.0),
            ],
            TracePreset::Random { functions } => (0..functions)
                .map(|i| {
                    let mem_size = RANDOM_MEM_SIZES[rng.gen_range(0..RANDOM_MEM_SIZES.len())];
                    let warm = rng.gen_range(10..=2000) as f64;
                    let cold = warm + rng.gen_range(50..=5000) as f64;
                    let iat = rng.gen_range(100..=20_000) as f64;
                    FunctionSpec::new(&format!("f{i}"), mem_size, cold, warm, iat)
                })
                .collect(),
        }
    }
}

impl fmt::Display for TracePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracePreset::Default => f.write_str("default"),
            TracePreset::Planned => f.write_str("planned"),
            TracePreset::Random { functions } => write!(f, "random({functions})"),
        }
    }
}

/// Generates invocation traces for a fixed set of functions.
#[derive(Debug, Clone)]
pub struct TraceGenerator {
    functions: Vec<FunctionSpec>,
    seed: u64,
}

impl TraceGenerator {
    /// Creates a generator for `functions`.
    ///
    /// # Errors
    ///
    /// Fails if there are no functions or a mean IAT is not positive.
    pub fn new(functions: Vec<FunctionSpec>, seed: u64) -> Result<Self> {
        if functions.is_empty() {
            return Err(SimulatorError::InvalidGenerator(
                "at least one function is required".to_string(),
            ));
        }
        if let Some(f) = functions.iter().find(|f| !(f.iat.is_finite() && f.iat > 0.0)) {
            return Err(SimulatorError::InvalidGenerator(format!(
                "mean inter-arrival time of '{}' must be positive, got {}",
                f.kind, f.iat
            )));
        }
        Ok(Self { functions, seed })
    }

    /// Creates a generator for a built-in preset.
    pub fn from_preset(preset: TracePreset, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(preset.functions(&mut rng), seed)
    }

    /// Function descriptions.
    pub fn functions(&self) -> &[FunctionSpec] {
        &self.functions
    }

    /// Share of invocations each function receives.
    pub fn frac_iat(&self) -> Vec<f64> {
        // (1/iat_i) / sum(1/iat_j), arranged so equal IATs give exact shares
        self.functions
            .iter()
            .map(|f| 1.0 / self.functions.iter().map(|g| f.iat / g.iat).sum::<f64>())
            .collect()
    }

    /// Generates about `n` invocations, sorted by arrival time.
    pub fn generate(&self, n: usize) -> Result<Vec<TraceRow>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut rows = Vec::with_capacity(n);

        for (f, frac) in self.functions.iter().zip(self.frac_iat()) {
            let exp = Exp::new(1.0 / f.iat)
                .map_err(|e| SimulatorError::InvalidGenerator(format!("{}: {e}", f.kind)))?;
            let count = (frac * n as f64) as usize;
            let mut t = 0.0;
            for _ in 0..count {
                let gap: f64 = exp.sample(&mut rng);
                t += gap.trunc();
                rows.push(TraceRow {
                    kind: f.kind.clone(),
                    mem_size: f.mem_size,
                    cold_time: f.cold_time,
                    warm_time: f.warm_time,
                    time: t,
                });
            }
            debug!(kind = %f.kind, count, last = t, "generated invocations");
        }

        rows.sort_by(|a, b| a.time.total_cmp(&b.time));
        info!(
            functions = self.functions.len(),
            invocations = rows.len(),
            "trace generated"
        );
        Ok(rows)
    }
}

/// Writes trace rows as CSV with a header.
pub fn write_trace<P: AsRef<Path>>(rows: &[TraceRow], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
