//! End-to-end orchestration of the thermal risk analysis.
//!
//! Walks the Cartesian product of (hour, point). Per hour, the variogram
//! fit and kriging factorization happen once per variable and are shared
//! read-only by the point fan-out; each (point, hour) task owns its RNG,
//! draw buffers, and solver scratch. Results are delivered in
//! (timestamp, progressive) order at the accumulation boundary,
//! independent of execution order.
//!
//! Error policy: an hour that loses coverage, has a singular kriging
//! system, or is missing from the current schedule is dropped and
//! counted; a point whose draws all fail is skipped and counted; only
//! configuration and data-shape problems abort the run.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;

use crate::kriging::KrigingField;
use crate::monte_carlo::{self, EnvDistributions};
use crate::risk;
use crate::thermal::CigreThermalModel;
use crate::variogram::Variogram;
use tlr_core::{
    Amperes, AnalysisConfig, ConductorParams, CurrentSchedule, Diagnostics, HourlyResult,
    LinePoint, MeteoVar, StationSet, TlrError, TlrResult,
};

/// Everything the analysis consumes, loaded and projected by the caller.
pub struct AnalysisInputs {
    pub conductor: ConductorParams,
    /// Discretized route in the projected frame
    pub points: Vec<LinePoint>,
    /// Stations with projected coordinates and joined hourly series
    pub stations: StationSet,
    pub schedule: CurrentSchedule,
}

/// Result table plus the diagnostics accumulated while producing it.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Rows in (timestamp, progressive) ascending order
    pub results: Vec<HourlyResult>,
    pub diagnostics: Diagnostics,
}

struct PointOutcome {
    result: HourlyResult,
    discarded: usize,
}

/// Run the full analysis over every common valid hour and line point.
///
/// The cancellation flag is observed between hours and between points;
/// an hour interrupted mid-flight is discarded whole, so the output
/// never contains a partial hour.
pub fn run_analysis(
    inputs: &AnalysisInputs,
    config: &AnalysisConfig,
    cancel: &AtomicBool,
) -> TlrResult<AnalysisOutcome> {
    config.validate()?;
    let model = CigreThermalModel::new(inputs.conductor.clone())?;

    if inputs.points.is_empty() {
        return Err(TlrError::DataShape("no line points to analyze".into()));
    }
    if inputs
        .stations
        .stations()
        .iter()
        .any(|s| !s.x_m.is_finite() || !s.y_m.is_finite())
    {
        return Err(TlrError::DataShape(
            "stations are missing projected coordinates".into(),
        ));
    }

    let coords: Vec<(f64, f64)> = inputs
        .stations
        .stations()
        .iter()
        .map(|s| (s.x_m, s.y_m))
        .collect();

    let mut diagnostics = Diagnostics::new();
    diagnostics.hours_seen = inputs.stations.n_hours();

    let mut results: Vec<HourlyResult> = Vec::new();

    'hours: for (hour_idx, &hour) in inputs.stations.hours().iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            diagnostics.cancelled = true;
            break;
        }

        let Some(current) = inputs.schedule.current_at(hour) else {
            diagnostics.hours_dropped_schedule += 1;
            diagnostics.add_warning_for_hour("schedule", "no current entry for hour", hour);
            continue;
        };

        // One fitted, factorized system per variable, shared by all points.
        let mut fields: Vec<KrigingField> = Vec::with_capacity(MeteoVar::ALL.len());
        for var in MeteoVar::ALL {
            let values = inputs.stations.values_at(var, hour_idx);
            let variogram = Variogram::fit(config.variogram_model, &coords, &values);
            match KrigingField::build(hour, coords.clone(), values, variogram) {
                Ok(field) => fields.push(field),
                Err(err @ TlrError::Coverage { .. }) => {
                    diagnostics.hours_dropped_coverage += 1;
                    diagnostics.add_warning_for_hour("coverage", err.to_string(), hour);
                    continue 'hours;
                }
                Err(err @ TlrError::Interpolation { .. }) => {
                    diagnostics.hours_dropped_interpolation += 1;
                    diagnostics.add_warning_for_hour("interpolation", err.to_string(), hour);
                    continue 'hours;
                }
                Err(err) => return Err(err),
            }
        }

        let point_outcomes: Vec<TlrResult<PointOutcome>> = inputs
            .points
            .par_iter()
            .map(|point| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(TlrError::Cancelled);
                }
                compute_point(&model, &fields, point, hour, current, config)
            })
            .collect();

        if point_outcomes
            .iter()
            .any(|r| matches!(r, Err(TlrError::Cancelled)))
        {
            // Clean stop: the interrupted hour is discarded whole.
            diagnostics.cancelled = true;
            break;
        }
        if let Some(Err(err)) = point_outcomes
            .iter()
            .find(|r| matches!(r, Err(TlrError::Interpolation { .. })))
        {
            diagnostics.hours_dropped_interpolation += 1;
            diagnostics.add_warning_for_hour("interpolation", err.to_string(), hour);
            continue;
        }

        for (point, outcome) in inputs.points.iter().zip(point_outcomes) {
            match outcome {
                Ok(point_outcome) => {
                    diagnostics.draws_total += config.mc_iterations as u64;
                    diagnostics.draws_discarded += point_outcome.discarded as u64;
                    if point_outcome.result.degraded {
                        diagnostics.results_degraded += 1;
                    }
                    diagnostics.results_emitted += 1;
                    results.push(point_outcome.result);
                }
                Err(err) => {
                    // Solver or numeric failure of a single point
                    diagnostics.draws_total += config.mc_iterations as u64;
                    diagnostics.draws_discarded += config.mc_iterations as u64;
                    diagnostics.add_error(
                        "solver",
                        format!("point {} at {hour}: {err}", point.id.value()),
                    );
                }
            }
        }
    }

    // Ordering is a delivery guarantee, enforced here rather than by the
    // execution schedule.
    results.sort_by(|a, b| {
        (a.timestamp, a.progressive_m)
            .partial_cmp(&(b.timestamp, b.progressive_m))
            .expect("finite progressives")
    });

    Ok(AnalysisOutcome {
        results,
        diagnostics,
    })
}

/// On-demand ampacity: the current that puts the confidence-percentile
/// conductor temperature at the design limit for one (point, hour),
/// under the same ambient sampling the analysis would use there.
pub fn ampacity_at(
    inputs: &AnalysisInputs,
    config: &AnalysisConfig,
    hour: NaiveDateTime,
    point_id: tlr_core::PointId,
) -> TlrResult<Amperes> {
    config.validate()?;
    let model = CigreThermalModel::new(inputs.conductor.clone())?;

    let hour_idx = inputs
        .stations
        .hours()
        .iter()
        .position(|&h| h == hour)
        .ok_or_else(|| {
            TlrError::DataShape(format!("hour {hour} is not in the common valid hour set"))
        })?;
    let point = inputs
        .points
        .iter()
        .find(|p| p.id == point_id)
        .ok_or_else(|| {
            TlrError::DataShape(format!("point {} is not on the route", point_id.value()))
        })?;

    let coords: Vec<(f64, f64)> = inputs
        .stations
        .stations()
        .iter()
        .map(|s| (s.x_m, s.y_m))
        .collect();

    let mut estimates = Vec::with_capacity(MeteoVar::ALL.len());
    for var in MeteoVar::ALL {
        let values = inputs.stations.values_at(var, hour_idx);
        let variogram = Variogram::fit(config.variogram_model, &coords, &values);
        let field = KrigingField::build(hour, coords.clone(), values, variogram)?;
        estimates.push(field.predict(point.x_m, point.y_m)?);
    }

    let env = EnvDistributions {
        t_air: (estimates[0].mean, estimates[0].std),
        q_solar: (estimates[1].mean, estimates[1].std),
        wind_u: (estimates[2].mean, estimates[2].std),
        wind_v: (estimates[3].mean, estimates[3].std),
    };
    let seed = monte_carlo::subseed(config.rng_master_seed, hour, point.id);
    let draws = monte_carlo::draw_ambient(&env, point.azimuth.value(), config.mc_iterations, seed)?;
    risk::ampacity(
        &model,
        &draws,
        model.conductor().t_max.value(),
        config.confidence_percentile,
    )
}

fn compute_point(
    model: &CigreThermalModel,
    fields: &[KrigingField],
    point: &LinePoint,
    hour: NaiveDateTime,
    current: Amperes,
    config: &AnalysisConfig,
) -> TlrResult<PointOutcome> {
    let estimates: Vec<_> = fields
        .iter()
        .map(|f| f.predict(point.x_m, point.y_m))
        .collect::<TlrResult<_>>()?;

    let env = EnvDistributions {
        t_air: (estimates[0].mean, estimates[0].std),
        q_solar: (estimates[1].mean, estimates[1].std),
        wind_u: (estimates[2].mean, estimates[2].std),
        wind_v: (estimates[3].mean, estimates[3].std),
    };

    let seed = monte_carlo::subseed(config.rng_master_seed, hour, point.id);
    let draws = monte_carlo::draw_ambient(&env, point.azimuth.value(), config.mc_iterations, seed)?;
    let outcome = monte_carlo::propagate(model, &draws, current)?;
    let summary = risk::analyze(
        &outcome.samples,
        model.conductor().t_max.value(),
        config.confidence_percentile,
        &config.risk_bands,
    )?;

    Ok(PointOutcome {
        result: HourlyResult {
            timestamp: hour,
            point_id: point.id,
            progressive_m: point.progressive_m,
            t_c_mean: summary.mean,
            t_c_p90: summary.p90,
            t_c_p95: summary.p95,
            risk: summary.risk,
            risk_class: summary.class,
            t_a_mean: outcome.ambient_means.t_air,
            q_s_mean: outcome.ambient_means.q_solar,
            w_s_mean: outcome.ambient_means.wind_speed,
            attack_angle_mean: outcome.ambient_means.attack_angle,
            current_a: current.value(),
            iterations_used: outcome.samples.len(),
            degraded: outcome.degraded,
        },
        discarded: outcome.discarded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tlr_core::{
        Celsius, Degrees, Meters, PointId, RawObservation, Station, StationId,
    };

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn station(id: usize, x: f64, y: f64) -> Station {
        Station {
            id: StationId::new(id),
            code: format!("S{id}"),
            lat_deg: 0.0,
            lon_deg: 0.0,
            x_m: x,
            y_m: y,
        }
    }

    fn observation(h: u32, t: f64, q: f64, ws: f64, dir: f64) -> RawObservation {
        RawObservation {
            timestamp: hour(h),
            t_air_c: t,
            q_solar_wm2: q,
            wind_speed_ms: ws,
            wind_dir_deg: dir,
        }
    }

    fn test_inputs() -> AnalysisInputs {
        // Three stations around a 2 km east-west route, two hours.
        let series = vec![
            (
                station(0, -5_000.0, 0.0),
                vec![
                    observation(10, 24.0, 700.0, 2.0, 0.0),
                    observation(11, 26.0, 850.0, 2.5, 10.0),
                ],
            ),
            (
                station(1, 8_000.0, 2_000.0),
                vec![
                    observation(10, 26.0, 750.0, 1.5, 20.0),
                    observation(11, 28.0, 900.0, 2.0, 30.0),
                ],
            ),
            (
                station(2, 2_000.0, -7_000.0),
                vec![
                    observation(10, 25.0, 720.0, 1.0, 350.0),
                    observation(11, 27.0, 880.0, 1.5, 0.0),
                ],
            ),
        ];
        let (mut stations, _) = StationSet::from_observations(series).unwrap();
        // Coordinates were set directly on the fixtures; keep them.
        for s in stations.stations_mut() {
            assert!(s.x_m.is_finite());
        }

        let points = (0..3)
            .map(|i| LinePoint {
                id: PointId::new(i),
                progressive_m: 1000.0 * i as f64,
                x_m: 1000.0 * i as f64,
                y_m: 0.0,
                azimuth: Degrees(90.0),
            })
            .collect();

        AnalysisInputs {
            conductor: ConductorParams {
                name: "Grosbeak".into(),
                diameter: Meters(0.02814),
                r_ac_25: 7.28e-5,
                r_ac_75: 9.09e-5,
                emissivity: 0.8,
                absorptivity: 0.8,
                t_max: Celsius(75.0),
                elevation: Meters(0.0),
            },
            points,
            stations,
            schedule: CurrentSchedule::Constant(Amperes(500.0)),
        }
    }

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            mc_iterations: 300,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_full_run_shape_and_order() {
        let inputs = test_inputs();
        let config = small_config();
        let cancel = AtomicBool::new(false);

        let outcome = run_analysis(&inputs, &config, &cancel).unwrap();
        // 2 hours × 3 points
        assert_eq!(outcome.results.len(), 6);
        assert_eq!(outcome.diagnostics.results_emitted, 6);
        assert_eq!(outcome.diagnostics.hours_dropped(), 0);

        // Timestamp-major, progressive-minor ordering.
        for pair in outcome.results.windows(2) {
            let key_a = (pair[0].timestamp, pair[0].progressive_m);
            let key_b = (pair[1].timestamp, pair[1].progressive_m);
            assert!(key_a < key_b);
        }

        for row in &outcome.results {
            assert!(row.t_c_mean > row.t_a_mean);
            assert!(row.t_c_p95 >= row.t_c_p90);
            assert!((0.0..=1.0).contains(&row.risk));
            assert!(row.iterations_used > 0);
            assert_eq!(row.current_a, 500.0);
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let inputs = test_inputs();
        let config = small_config();
        let cancel = AtomicBool::new(false);

        let a = run_analysis(&inputs, &config, &cancel).unwrap();
        let b = run_analysis(&inputs, &config, &cancel).unwrap();
        assert_eq!(a.results, b.results);

        let mut other_seed = small_config();
        other_seed.rng_master_seed = 1234;
        let c = run_analysis(&inputs, &other_seed, &cancel).unwrap();
        assert_ne!(a.results, c.results);
    }

    #[test]
    fn test_missing_schedule_hours_are_dropped() {
        let mut inputs = test_inputs();
        let mut map = std::collections::BTreeMap::new();
        map.insert(hour(11), 450.0);
        inputs.schedule = CurrentSchedule::Hourly(map);

        let outcome = run_analysis(&inputs, &small_config(), &AtomicBool::new(false)).unwrap();
        assert_eq!(outcome.diagnostics.hours_dropped_schedule, 1);
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results.iter().all(|r| r.timestamp == hour(11)));
        assert!(outcome.results.iter().all(|r| r.current_a == 450.0));
    }

    #[test]
    fn test_duplicate_station_locations_drop_hours() {
        let mut inputs = test_inputs();
        {
            let stations = inputs.stations.stations_mut();
            let (x, y) = (stations[0].x_m, stations[0].y_m);
            stations[1].x_m = x;
            stations[1].y_m = y;
        }

        let outcome = run_analysis(&inputs, &small_config(), &AtomicBool::new(false)).unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.diagnostics.hours_dropped_interpolation, 2);
        assert!(outcome.diagnostics.error_count() == 0);
    }

    #[test]
    fn test_pre_set_cancellation_produces_nothing() {
        let inputs = test_inputs();
        let cancel = AtomicBool::new(true);
        let outcome = run_analysis(&inputs, &small_config(), &cancel).unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.diagnostics.cancelled);
    }

    #[test]
    fn test_ampacity_at_point() {
        let inputs = test_inputs();
        let mut config = small_config();
        config.mc_iterations = 64;

        let rating = ampacity_at(&inputs, &config, hour(10), PointId::new(1)).unwrap();
        // A 75 °C design limit sits well above the 500 A operating point.
        assert!(rating.value() > 500.0, "rating = {}", rating.value());
        assert!(rating.value() < 5000.0);

        let missing = ampacity_at(&inputs, &config, hour(9), PointId::new(1));
        assert!(matches!(missing, Err(TlrError::DataShape(_))));
    }

    #[test]
    fn test_unprojected_stations_are_fatal() {
        let mut inputs = test_inputs();
        inputs.stations.stations_mut()[0].x_m = f64::NAN;
        let err = run_analysis(&inputs, &small_config(), &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, TlrError::DataShape(_)));
    }
}
