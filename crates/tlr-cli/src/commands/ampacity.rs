//! `tlr ampacity`: on-demand rating inversion for one (point, hour).

use anyhow::Result;
use tracing::info;

use crate::cli::AmpacityArgs;
use crate::commands::{configure_threads, load_inputs, resolve_config};
use tlr_algo::workflow::ampacity_at;
use tlr_core::{Amperes, CurrentSchedule, PointId};
use tlr_io::importers::parse_timestamp;

pub fn execute(args: &AmpacityArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    configure_threads(&args.config.threads, config.threads);
    let hour = parse_timestamp(&args.hour)?;

    // Ampacity does not consume a schedule; a placeholder keeps the
    // input loading shared with `run`.
    let schedule = CurrentSchedule::Constant(Amperes(0.0));
    let (inputs, _) = load_inputs(&args.inputs, &config, schedule)?;

    let rating = ampacity_at(&inputs, &config, hour, PointId::new(args.point_id))?;
    info!(
        "Ampacity at point {} for {}: p{:.0} conductor temperature reaches {} at {:.0} A",
        args.point_id,
        hour,
        config.confidence_percentile,
        inputs.conductor.t_max,
        rating.value()
    );
    println!("{:.0}", rating.value());
    Ok(())
}
