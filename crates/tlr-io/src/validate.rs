//! Cross-input validation, used by `tlr validate` before a run.

use tlr_core::{
    ConductorParams, CurrentSchedule, JoinStats, RouteVertex, StationSet, TlrError, TlrResult,
};

/// Summary of loaded inputs, printed by the validate command.
#[derive(Debug, Clone)]
pub struct InputSummary {
    pub conductor_name: String,
    pub stations: usize,
    pub hours_union: usize,
    pub hours_common: usize,
    pub route_vertices: usize,
    pub route_length_m: f64,
    pub schedule: String,
    /// Non-fatal observations worth surfacing
    pub warnings: Vec<String>,
}

/// Cross-check loaded inputs and summarize them.
///
/// Individual loaders already enforce their own schemas; this checks the
/// relationships between inputs that only show up when combined.
pub fn validate_inputs(
    conductor: &ConductorParams,
    vertices: &[RouteVertex],
    stations: &StationSet,
    stats: JoinStats,
    schedule: &CurrentSchedule,
) -> TlrResult<InputSummary> {
    conductor.validate()?;

    if stations.n_stations() < 2 {
        return Err(TlrError::DataShape(format!(
            "at least 2 stations are required for interpolation, got {}",
            stations.n_stations()
        )));
    }

    let mut warnings = Vec::new();
    if stations.n_hours() == 0 {
        warnings.push("no hour is complete across all stations; the run would be empty".into());
    }
    if stats.hours_union > 0 {
        let kept = stats.hours_common as f64 / stats.hours_union as f64;
        if kept < 0.5 {
            warnings.push(format!(
                "only {:.0}% of observed hours are complete across all stations",
                100.0 * kept
            ));
        }
    }

    let schedule_label = match schedule {
        CurrentSchedule::Constant(current) => format!("constant {current}"),
        CurrentSchedule::Hourly(map) => {
            let covered = stations
                .hours()
                .iter()
                .filter(|h| map.contains_key(*h))
                .count();
            if covered < stations.n_hours() {
                warnings.push(format!(
                    "current schedule covers {covered} of {} valid hours; the rest drop",
                    stations.n_hours()
                ));
            }
            format!("hourly ({} entries)", map.len())
        }
    };

    let route_length_m = vertices.last().map(|v| v.progressive_m).unwrap_or(0.0)
        - vertices.first().map(|v| v.progressive_m).unwrap_or(0.0);

    Ok(InputSummary {
        conductor_name: conductor.name.clone(),
        stations: stations.n_stations(),
        hours_union: stats.hours_union,
        hours_common: stats.hours_common,
        route_vertices: vertices.len(),
        route_length_m,
        schedule: schedule_label,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tlr_core::{
        Amperes, Celsius, Degrees, Meters, RawObservation, Station, StationId,
    };

    fn conductor() -> ConductorParams {
        ConductorParams {
            name: "Grosbeak".into(),
            diameter: Meters(0.02814),
            r_ac_25: 7.28e-5,
            r_ac_75: 9.09e-5,
            emissivity: 0.8,
            absorptivity: 0.8,
            t_max: Celsius(75.0),
            elevation: Meters(0.0),
        }
    }

    fn two_station_set() -> (StationSet, JoinStats) {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let obs = RawObservation {
            timestamp: ts,
            t_air_c: 25.0,
            q_solar_wm2: 800.0,
            wind_speed_ms: 2.0,
            wind_dir_deg: 90.0,
        };
        let station = |id: usize, code: &str| Station {
            id: StationId::new(id),
            code: code.into(),
            lat_deg: -15.0,
            lon_deg: -47.9,
            x_m: f64::NAN,
            y_m: f64::NAN,
        };
        StationSet::from_observations(vec![
            (station(0, "A"), vec![obs]),
            (station(1, "B"), vec![obs]),
        ])
        .unwrap()
    }

    fn route() -> Vec<RouteVertex> {
        vec![
            RouteVertex {
                progressive_m: 0.0,
                lat_deg: -15.0,
                lon_deg: -47.9,
                azimuth: Degrees(90.0),
            },
            RouteVertex {
                progressive_m: 2500.0,
                lat_deg: -15.0,
                lon_deg: -47.877,
                azimuth: Degrees(90.0),
            },
        ]
    }

    #[test]
    fn test_valid_inputs_summarize() {
        let (stations, stats) = two_station_set();
        let summary = validate_inputs(
            &conductor(),
            &route(),
            &stations,
            stats,
            &CurrentSchedule::Constant(Amperes(500.0)),
        )
        .unwrap();
        assert_eq!(summary.stations, 2);
        assert_eq!(summary.hours_common, 1);
        assert_eq!(summary.route_length_m, 2500.0);
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn test_single_station_rejected() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let (stations, stats) = StationSet::from_observations(vec![(
            Station {
                id: StationId::new(0),
                code: "A".into(),
                lat_deg: -15.0,
                lon_deg: -47.9,
                x_m: f64::NAN,
                y_m: f64::NAN,
            },
            vec![RawObservation {
                timestamp: ts,
                t_air_c: 25.0,
                q_solar_wm2: 800.0,
                wind_speed_ms: 2.0,
                wind_dir_deg: 90.0,
            }],
        )])
        .unwrap();

        let err = validate_inputs(
            &conductor(),
            &route(),
            &stations,
            stats,
            &CurrentSchedule::Constant(Amperes(500.0)),
        )
        .unwrap_err();
        assert!(matches!(err, TlrError::DataShape(_)));
    }

    #[test]
    fn test_partial_schedule_warns() {
        let (stations, stats) = two_station_set();
        let schedule = CurrentSchedule::Hourly(std::collections::BTreeMap::new());
        let summary = validate_inputs(&conductor(), &route(), &stations, stats, &schedule).unwrap();
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("covers 0 of 1"));
    }
}
