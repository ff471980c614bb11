use clap::Parser;
use schem::{Overrides, RunConfig, RunMode, RunOutcome, init_logging};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "schem")]
#[command(about = "Analytic chemical evolution of a galaxy annulus with randomized sweeps")]
struct Args {
    /// Run configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for results and logs (default: ~/.schem/)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Evaluate one annulus or sweep the grid
    #[arg(short, long, value_enum)]
    mode: Option<RunMode>,

    /// Number of randomized trials in sweep mode
    #[arg(short, long)]
    trials: Option<usize>,

    /// Worker threads in sweep mode
    #[arg(long)]
    threads: Option<usize>,

    /// Seed for the trial draws
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".schem")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let output_dir = args.output_dir.unwrap_or_else(default_output_dir);

    init_logging(&output_dir, &args.log_level)?;

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    config.apply_overrides(&Overrides {
        mode: args.mode,
        trials: args.trials,
        threads: args.threads,
        seed: args.seed,
    });

    tracing::info!("Running in {:?} mode", config.mode);
    match schem::run(&config, &output_dir)? {
        RunOutcome::Single(state) => tracing::info!(
            "Single evaluation complete: {:.6e} stars formed by t={}",
            state.stars_formed,
            state.time
        ),
        RunOutcome::Sweep { summary, .. } => tracing::info!(
            "Sweep complete: {} of {} cells passed (seed {})",
            summary.cells_passed,
            summary.cells_evaluated,
            summary.seed
        ),
    }

    Ok(())
}
