//! CSV and JSON importers for the analysis inputs.
//!
//! Station observations arrive in long format, one row per
//! (station, hour); the loader groups them, checks that station
//! coordinates stay constant, and joins the series on the common valid
//! hour index. Route vertices and current schedules are flat CSV tables;
//! conductor parameters are a JSON record.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tlr_core::{
    ConductorParams, CurrentSchedule, Degrees, JoinStats, RawObservation, RouteVertex, Station,
    StationId, StationSet, TlrError, TlrResult,
};

/// Accepted timestamp layouts, all UTC-naive hourly.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp in any accepted layout.
pub fn parse_timestamp(text: &str) -> TlrResult<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text.trim(), format) {
            return Ok(ts);
        }
    }
    Err(TlrError::DataShape(format!(
        "unparseable timestamp '{text}'; expected e.g. 2024-01-15T12:00:00"
    )))
}

#[derive(Debug, Deserialize)]
struct StationRow {
    station_id: String,
    lat: f64,
    lon: f64,
    timestamp: String,
    t_air_c: f64,
    q_solar_wm2: f64,
    wind_speed_ms: f64,
    wind_dir_deg: f64,
}

/// Load station observations from long-format CSV and join them on the
/// common valid hour index. Projected coordinates are filled later by
/// the geodesy step.
pub fn load_stations_csv(path: &Path) -> TlrResult<(StationSet, JoinStats)> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| TlrError::DataShape(format!("{}: {err}", path.display())))?;

    // station code -> (lat, lon, observations), ordered by code
    let mut grouped: BTreeMap<String, (f64, f64, Vec<RawObservation>)> = BTreeMap::new();

    for (line, record) in reader.deserialize::<StationRow>().enumerate() {
        let row = record.map_err(|err| {
            TlrError::DataShape(format!("{} row {}: {err}", path.display(), line + 2))
        })?;
        let timestamp = parse_timestamp(&row.timestamp)?;

        let entry = grouped
            .entry(row.station_id.clone())
            .or_insert((row.lat, row.lon, Vec::new()));
        if (entry.0 - row.lat).abs() > 1e-9 || (entry.1 - row.lon).abs() > 1e-9 {
            return Err(TlrError::DataShape(format!(
                "station '{}' changes coordinates between rows",
                row.station_id
            )));
        }
        entry.2.push(RawObservation {
            timestamp,
            t_air_c: row.t_air_c,
            q_solar_wm2: row.q_solar_wm2,
            wind_speed_ms: row.wind_speed_ms,
            wind_dir_deg: row.wind_dir_deg,
        });
    }

    if grouped.is_empty() {
        return Err(TlrError::DataShape(format!(
            "{}: no station rows",
            path.display()
        )));
    }

    let series = grouped
        .into_iter()
        .enumerate()
        .map(|(idx, (code, (lat, lon, observations)))| {
            (
                Station {
                    id: StationId::new(idx),
                    code,
                    lat_deg: lat,
                    lon_deg: lon,
                    x_m: f64::NAN,
                    y_m: f64::NAN,
                },
                observations,
            )
        })
        .collect();

    StationSet::from_observations(series)
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    progressive_m: f64,
    lat: f64,
    lon: f64,
    azimuth_deg: f64,
}

/// Load route vertices in route order.
pub fn load_route_csv(path: &Path) -> TlrResult<Vec<RouteVertex>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| TlrError::DataShape(format!("{}: {err}", path.display())))?;

    let mut vertices = Vec::new();
    for (line, record) in reader.deserialize::<RouteRow>().enumerate() {
        let row = record.map_err(|err| {
            TlrError::DataShape(format!("{} row {}: {err}", path.display(), line + 2))
        })?;
        vertices.push(RouteVertex {
            progressive_m: row.progressive_m,
            lat_deg: row.lat,
            lon_deg: row.lon,
            azimuth: Degrees(row.azimuth_deg),
        });
    }

    if vertices.len() < 2 {
        return Err(TlrError::DataShape(format!(
            "{}: route needs at least 2 vertices, got {}",
            path.display(),
            vertices.len()
        )));
    }
    for pair in vertices.windows(2) {
        if pair[1].progressive_m <= pair[0].progressive_m {
            return Err(TlrError::DataShape(format!(
                "{}: route progressives must be strictly increasing",
                path.display()
            )));
        }
    }
    Ok(vertices)
}

/// Load conductor parameters from a JSON record and validate them.
pub fn load_conductor_json(path: &Path) -> TlrResult<ConductorParams> {
    let text = fs::read_to_string(path)?;
    let conductor: ConductorParams = serde_json::from_str(&text)
        .map_err(|err| TlrError::Parse(format!("{}: {err}", path.display())))?;
    conductor.validate()?;
    Ok(conductor)
}

#[derive(Debug, Deserialize)]
struct CurrentRow {
    timestamp: String,
    current_a: f64,
}

/// Load an hourly current schedule.
pub fn load_current_schedule_csv(path: &Path) -> TlrResult<CurrentSchedule> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| TlrError::DataShape(format!("{}: {err}", path.display())))?;

    let mut map = BTreeMap::new();
    for (line, record) in reader.deserialize::<CurrentRow>().enumerate() {
        let row = record.map_err(|err| {
            TlrError::DataShape(format!("{} row {}: {err}", path.display(), line + 2))
        })?;
        if !(row.current_a >= 0.0) || !row.current_a.is_finite() {
            return Err(TlrError::DataShape(format!(
                "{} row {}: current must be non-negative, got {}",
                path.display(),
                line + 2,
                row.current_a
            )));
        }
        let timestamp = parse_timestamp(&row.timestamp)?;
        if map.insert(timestamp, row.current_a).is_some() {
            return Err(TlrError::DataShape(format!(
                "{}: duplicate schedule entry for {timestamp}",
                path.display()
            )));
        }
    }

    if map.is_empty() {
        return Err(TlrError::DataShape(format!(
            "{}: empty current schedule",
            path.display()
        )));
    }
    Ok(CurrentSchedule::Hourly(map))
}
