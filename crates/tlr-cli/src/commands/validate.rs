//! `tlr validate`: load and cross-check inputs without running.

use anyhow::Result;
use tracing::warn;

use crate::cli::ValidateArgs;
use crate::commands::resolve_schedule;
use tlr_io::{importers, validate};

pub fn execute(args: &ValidateArgs) -> Result<()> {
    let conductor = importers::load_conductor_json(&args.inputs.conductor)?;
    let vertices = importers::load_route_csv(&args.inputs.route)?;
    let (stations, stats) = importers::load_stations_csv(&args.inputs.stations)?;
    let schedule = resolve_schedule(&args.inputs)?;

    let summary = validate::validate_inputs(&conductor, &vertices, &stations, stats, &schedule)?;

    println!("Conductor : {}", summary.conductor_name);
    println!("Stations  : {}", summary.stations);
    println!(
        "Hours     : {} complete of {} observed",
        summary.hours_common, summary.hours_union
    );
    println!(
        "Route     : {} vertices, {:.1} km",
        summary.route_vertices,
        summary.route_length_m / 1000.0
    );
    println!("Schedule  : {}", summary.schedule);

    for warning in &summary.warnings {
        warn!("{warning}");
    }
    println!("Inputs OK");
    Ok(())
}
