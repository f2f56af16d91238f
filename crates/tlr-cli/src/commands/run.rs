//! `tlr run`: the full (hour × point) analysis to a result CSV.

use anyhow::Result;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::commands::{configure_threads, load_inputs, resolve_config, resolve_schedule};
use tlr_algo::workflow::run_analysis;
use tlr_io::exporters;

pub fn execute(args: &RunArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    configure_threads(&args.config.threads, config.threads);
    let schedule = resolve_schedule(&args.inputs)?;
    let (inputs, stats) = load_inputs(&args.inputs, &config, schedule)?;

    info!(
        "Analyzing {} points × {} hours with {} stations",
        inputs.points.len(),
        inputs.stations.n_hours(),
        inputs.stations.n_stations()
    );

    let cancel = AtomicBool::new(false);
    let mut outcome = run_analysis(&inputs, &config, &cancel)?;
    outcome.diagnostics.hours_dropped_incomplete = stats.hours_union - stats.hours_common;

    if outcome.results.is_empty() {
        warn!("No results produced; see diagnostics for dropped hours");
    }

    exporters::write_results_csv(&args.out, &outcome.results)?;
    let diagnostics_path = args
        .diagnostics_out
        .clone()
        .unwrap_or_else(|| args.out.with_extension("diagnostics.json"));
    exporters::write_diagnostics_json(&diagnostics_path, &outcome.diagnostics)?;

    info!(
        "Wrote {} rows to {} ({})",
        outcome.results.len(),
        args.out.display(),
        outcome.diagnostics.summary()
    );
    Ok(())
}
