//! Result table and diagnostics writers.
//!
//! The CSV column set is the canonical downstream contract; order and
//! names are fixed here and nowhere else.

use std::fs::File;
use std::path::Path;

use tlr_core::{Diagnostics, HourlyResult, TlrResult};

/// Canonical result columns, in order.
const RESULT_COLUMNS: [&str; 15] = [
    "timestamp",
    "point_id",
    "progressive_m",
    "t_c_mean",
    "t_c_p90",
    "t_c_p95",
    "risk",
    "risk_class",
    "t_a_mean",
    "q_s_mean",
    "w_s_mean",
    "attack_angle_mean",
    "current_a",
    "iterations_used",
    "degraded",
];

/// Write the result table as the canonical CSV.
pub fn write_results_csv(path: &Path, results: &[HourlyResult]) -> TlrResult<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|err| tlr_core::TlrError::Parse(format!("{}: {err}", path.display())))?;

    writer
        .write_record(RESULT_COLUMNS)
        .map_err(|err| tlr_core::TlrError::Parse(err.to_string()))?;

    for row in results {
        writer
            .write_record([
                row.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
                row.point_id.value().to_string(),
                format!("{:.1}", row.progressive_m),
                format!("{:.3}", row.t_c_mean),
                format!("{:.3}", row.t_c_p90),
                format!("{:.3}", row.t_c_p95),
                format!("{:.6}", row.risk),
                row.risk_class.clone(),
                format!("{:.3}", row.t_a_mean),
                format!("{:.3}", row.q_s_mean),
                format!("{:.3}", row.w_s_mean),
                format!("{:.3}", row.attack_angle_mean),
                format!("{:.1}", row.current_a),
                row.iterations_used.to_string(),
                row.degraded.to_string(),
            ])
            .map_err(|err| tlr_core::TlrError::Parse(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| tlr_core::TlrError::Parse(err.to_string()))?;
    Ok(())
}

/// Write the run diagnostics next to the result table.
pub fn write_diagnostics_json(path: &Path, diagnostics: &Diagnostics) -> TlrResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, diagnostics)
        .map_err(|err| tlr_core::TlrError::Parse(err.to_string()))?;
    Ok(())
}
