use clap::{Parser, Subcommand, ValueEnum};
use faas_cache::config::{DEFAULT_OVERHEAD_BASE, DEFAULT_OVERHEAD_PCT};
use faas_cache::EvictionPolicy;
use faas_simulator::generator::{write_trace, TraceGenerator, TracePreset};
use faas_simulator::input::read_trace;
use faas_simulator::models::SimulationConfig;
use faas_simulator::runner::{print_summary, SweepRunner};
use faas_simulator::stats::{export_csv, print_analysis, print_per_kind, LogAnalyzer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Warm-container cache simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Log filter used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

/// Function mix presets
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Preset {
    /// Four functions from 10 MB to 1 GB with equal arrival rates
    Default,
    /// Two functions arriving rarely relative to their run time
    Planned,
    /// Random sizes, run times and arrival rates
    Random,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a synthetic invocation trace
    Generate {
        /// Function mix
        #[arg(long, value_enum, default_value = "default")]
        preset: Preset,

        /// Number of functions for the random preset
        #[arg(long, default_value = "10")]
        functions: usize,

        /// Number of invocations to generate
        #[arg(short = 'n', long, default_value = "10000")]
        invocations: usize,

        /// RNG seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output trace file
        #[arg(short, long, default_value = "trace.csv")]
        output: PathBuf,
    },

    /// Replay a trace for every policy and memory size
    Simulate {
        /// Trace file written by `generate`
        #[arg(short, long, value_name = "FILE")]
        trace: PathBuf,

        /// Memory capacities in MB
        #[arg(short, long, value_name = "MB", num_args = 1.., value_delimiter = ',', required = true)]
        memory: Vec<u64>,

        /// Policies to run (e.g. LRU,GREEDY_DUAL). All policies if omitted
        #[arg(short, long, value_name = "POLICIES", num_args = 1.., value_delimiter = ',')]
        policies: Option<Vec<EvictionPolicy>>,

        /// Directory for performance logs
        #[arg(short, long, default_value = "logs")]
        output_dir: PathBuf,

        /// Run label embedded in log file names
        #[arg(long, default_value = "0")]
        run: String,

        /// Seed for the RAND policy
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Fixed cold-start overhead in ms
        #[arg(long, default_value_t = DEFAULT_OVERHEAD_BASE)]
        overhead_base: f64,

        /// Share of the cold run time added to a cold start
        #[arg(long, default_value_t = DEFAULT_OVERHEAD_PCT)]
        overhead_pct: f64,

        /// Runs executed at the same time (default: available parallelism)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Compute cold-start and drop percentages from performance logs
    Analyze {
        /// Directory containing performance logs
        #[arg(short, long, default_value = "logs")]
        log_dir: PathBuf,

        /// Trace file the logs were produced from; overrides runs.csv
        #[arg(short, long, value_name = "FILE")]
        trace: Option<PathBuf>,

        /// Only analyze one policy
        #[arg(short, long)]
        policy: Option<EvictionPolicy>,

        /// Print per-function counts for each run
        #[arg(long)]
        per_kind: bool,

        /// Export results to CSV file
        #[arg(long, value_name = "PATH")]
        output_csv: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match args.command {
        Commands::Generate {
            preset,
            functions,
            invocations,
            seed,
            output,
        } => {
            let preset = match preset {
                Preset::Default => TracePreset::Default,
                Preset::Planned => TracePreset::Planned,
                Preset::Random => TracePreset::Random { functions },
            };
            let generator = TraceGenerator::from_preset(preset, seed)?;
            let rows = generator.generate(invocations)?;
            write_trace(&rows, &output)?;

            println!("Trace Generation");
            println!("================");
            println!("Preset: {preset}");
            println!("Functions: {}", generator.functions().len());
            println!("Invocations: {}", rows.len());
            println!("Output: {}", output.display());
            Ok(())
        }

        Commands::Simulate {
            trace,
            memory,
            policies,
            output_dir,
            run,
            seed,
            overhead_base,
            overhead_pct,
            jobs,
        } => {
            let trace_data = read_trace(&trace)?;

            let mut config = SimulationConfig::new(output_dir, memory);
            if let Some(policies) = policies.filter(|p| !p.is_empty()) {
                config.policies = policies;
            }
            config.run_label = run;
            config.seed = seed;
            config.overhead_base = overhead_base;
            config.overhead_pct = overhead_pct;
            if let Some(jobs) = jobs {
                config.workers = jobs;
            }

            println!("Cache Simulation");
            println!("================");
            println!("Trace: {}", trace.display());
            println!(
                "Invocations: {} ({} functions)",
                trace_data.len(),
                trace_data.num_funcs()
            );
            println!("Memory sizes (MB): {:?}", config.memory_sizes);
            println!(
                "Policies: {:?}",
                config.policies.iter().map(|p| p.as_str()).collect::<Vec<_>>()
            );
            println!("Output directory: {}", config.output_dir.display());
            println!("Workers: {}", config.workers);

            let runner = SweepRunner::new(config);
            match runner.run(&trace_data) {
                Ok(summaries) => {
                    print_summary(&summaries);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Error running simulation: {e}");
                    Err(e.into())
                }
            }
        }

        Commands::Analyze {
            log_dir,
            trace,
            policy,
            per_kind,
            output_csv,
        } => {
            let mut analyzer = LogAnalyzer::new(log_dir);
            if let Some(path) = trace {
                analyzer = analyzer.with_trace_len(read_trace(path)?.len() as u64);
            }
            if let Some(policy) = policy {
                analyzer = analyzer.with_policy(policy);
            }

            let results = analyzer.analyze()?;
            print_analysis(&results);
            if per_kind {
                for analysis in &results {
                    print_per_kind(analysis);
                }
            }

            if let Some(csv_path) = output_csv {
                match export_csv(&results, &csv_path) {
                    Ok(()) => println!("\nResults exported to: {}", csv_path.display()),
                    Err(e) => eprintln!("Failed to export CSV: {e}"),
                }
            }
            Ok(())
        }
    }
}
