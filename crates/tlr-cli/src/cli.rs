use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hourly thermal risk of overhead transmission conductors", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the hourly thermal risk analysis over the whole route
    Run(RunArgs),
    /// Invert the ampacity for one (point, hour) on demand
    Ampacity(AmpacityArgs),
    /// Load and cross-check all inputs without running the analysis
    Validate(ValidateArgs),
}

/// Input files shared by every subcommand.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Station observations CSV (long format, one row per station-hour)
    #[arg(long)]
    pub stations: PathBuf,

    /// Route vertices CSV (progressive_m, lat, lon, azimuth_deg)
    #[arg(long)]
    pub route: PathBuf,

    /// Conductor parameters JSON
    #[arg(long)]
    pub conductor: PathBuf,

    /// Constant current in amperes
    #[arg(long, conflicts_with = "current_file")]
    pub current: Option<f64>,

    /// Hourly current schedule CSV (timestamp, current_a)
    #[arg(long)]
    pub current_file: Option<PathBuf>,
}

/// Configuration overrides shared by run and ampacity.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// TOML configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Route discretization step in metres
    #[arg(long)]
    pub step: Option<f64>,

    /// Monte Carlo iterations per (point, hour)
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Confidence percentile (0-100)
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Variogram model: linear, spherical, or exponential
    #[arg(long)]
    pub variogram: Option<String>,

    /// Master RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads ("auto" or a count)
    #[arg(long, default_value = "auto")]
    pub threads: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Result CSV path
    #[arg(long, default_value = "results.csv")]
    pub out: PathBuf,

    /// Diagnostics JSON path (defaults to <out>.diagnostics.json)
    #[arg(long)]
    pub diagnostics_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AmpacityArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Hour to rate (e.g. 2024-01-15T14:00:00)
    #[arg(long)]
    pub hour: String,

    /// Discretized point id along the route
    #[arg(long)]
    pub point_id: usize,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
}
