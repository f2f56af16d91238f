//! Command implementations and the shared input/config plumbing.

pub mod ampacity;
pub mod run;
pub mod validate;

use anyhow::{anyhow, Context, Result};
use rayon::ThreadPoolBuilder;
use std::fs;

use crate::cli::{ConfigArgs, InputArgs};
use tlr_algo::geodesy::discretize_route;
use tlr_algo::PolyconicProjection;
use tlr_core::{Amperes, AnalysisConfig, CurrentSchedule, JoinStats};
use tlr_io::importers;

/// Size the global rayon pool. The flag wins over the configuration
/// file; "auto" (or 0 in the file) means one worker per CPU.
pub fn configure_threads(spec: &str, config_threads: usize) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        if config_threads > 0 {
            config_threads
        } else {
            num_cpus::get()
        }
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

/// Resolve the analysis configuration: TOML file first, then flag overrides.
pub fn resolve_config(args: &ConfigArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading configuration {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing configuration {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(step) = args.step {
        config.discretization_step_m = step;
    }
    if let Some(iterations) = args.iterations {
        config.mc_iterations = iterations;
    }
    if let Some(percentile) = args.percentile {
        config.confidence_percentile = percentile;
    }
    if let Some(variogram) = &args.variogram {
        config.variogram_model = variogram.parse()?;
    }
    if let Some(seed) = args.seed {
        config.rng_master_seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Build the current schedule from the flag pair; exactly one source.
pub fn resolve_schedule(args: &InputArgs) -> Result<CurrentSchedule> {
    match (args.current, &args.current_file) {
        (Some(current), None) => {
            if !(current >= 0.0) {
                return Err(anyhow!("--current must be non-negative, got {current}"));
            }
            Ok(CurrentSchedule::Constant(Amperes(current)))
        }
        (None, Some(path)) => Ok(importers::load_current_schedule_csv(path)?),
        (None, None) => Err(anyhow!("provide --current <A> or --current-file <csv>")),
        (Some(_), Some(_)) => unreachable!("clap conflicts_with"),
    }
}

/// Load, project, and discretize everything a run needs.
pub fn load_inputs(
    args: &InputArgs,
    config: &AnalysisConfig,
    schedule: CurrentSchedule,
) -> Result<(tlr_algo::AnalysisInputs, JoinStats)> {
    let conductor = importers::load_conductor_json(&args.conductor)?;
    let vertices = importers::load_route_csv(&args.route)?;
    let (mut stations, stats) = importers::load_stations_csv(&args.stations)?;

    let projection = PolyconicProjection::for_epsg(config.source_crs, config.target_crs)?;
    projection.project_stations(&mut stations);
    let points = discretize_route(&vertices, &projection, config.discretization_step_m)?;

    Ok((
        tlr_algo::AnalysisInputs {
            conductor,
            points,
            stations,
            schedule,
        },
        stats,
    ))
}
