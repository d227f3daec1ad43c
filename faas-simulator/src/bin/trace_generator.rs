use clap::Parser;
use faas_simulator::generator::{write_trace, FunctionSpec, TraceGenerator, TracePreset};
use std::path::PathBuf;

/// Invocation trace generator for warm-container cache simulations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of invocations to generate
    #[arg(short = 'n', long, default_value = "10000")]
    invocations: usize,

    /// Number of random functions; the four-function default mix if omitted
    #[arg(long)]
    functions: Option<usize>,

    /// Use the two-function planned mix
    #[arg(long, conflicts_with = "functions")]
    planned: bool,

    /// Scale every mean inter-arrival time by this factor
    #[arg(long, default_value = "1.0")]
    iat_scale: f64,

    /// RNG seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Output trace file
    #[arg(short, long, default_value = "trace.csv")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let preset = match (args.planned, args.functions) {
        (true, _) => TracePreset::Planned,
        (false, Some(functions)) => TracePreset::Random { functions },
        (false, None) => TracePreset::Default,
    };

    let functions: Vec<FunctionSpec> = TraceGenerator::from_preset(preset, args.seed)?
        .functions()
        .iter()
        .cloned()
        .map(|mut f| {
            f.iat *= args.iat_scale;
            f
        })
        .collect();
    let generator = TraceGenerator::new(functions, args.seed)?;
    let rows = generator.generate(args.invocations)?;
    write_trace(&rows, &args.output)?;

    println!("Generated {} invocations ({preset})", rows.len());
    for (f, frac) in generator.functions().iter().zip(generator.frac_iat()) {
        println!(
            "  {:<8} {:>6} MB  cold {:>7.1} ms  warm {:>7.1} ms  iat {:>9.1} ms  share {:>5.1}%",
            f.kind,
            f.mem_size,
            f.cold_time,
            f.warm_time,
            f.iat,
            frac * 100.0
        );
    }
    println!("Output: {}", args.output.display());
    Ok(())
}
