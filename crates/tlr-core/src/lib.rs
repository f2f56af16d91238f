//! # tlr-core: Transmission Line Thermal Risk Core Model
//!
//! Provides the typed records shared by every TLR crate: conductor
//! parameters, route geometry, station meteorology, current schedules,
//! and the hourly result rows produced by the analysis.
//!
//! ## Design Philosophy
//!
//! - Typed records instead of ad-hoc maps: [`ConductorParams`],
//!   [`LinePoint`], [`Station`], [`HourlyResult`] are owned structs with
//!   invariants enforced at construction.
//! - Meteorological series are columnar: [`StationSet`] keeps one
//!   `Vec<f64>` per (station, variable) aligned on a single strictly
//!   increasing hourly index, which keeps per-hour kriging gathers
//!   cache-friendly.
//! - Read-only after load: conductor, geometry, and station series are
//!   built once and shared freely across worker threads.
//!
//! ## Modules
//!
//! - [`config`] - Run configuration record and variogram model selection
//! - [`diagnostics`] - Counters for recovered errors, surfaced with results
//! - [`error`] - Unified [`TlrError`] / [`TlrResult`]
//! - [`units`] - Newtype wrappers for physical quantities

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod units;

pub use config::{AnalysisConfig, VariogramKind};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{TlrError, TlrResult};
pub use units::{Amperes, Celsius, Degrees, Meters, MetersPerSecond, WattsPerSquareMeter};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(usize);

impl PointId {
    #[inline]
    pub fn new(value: usize) -> Self {
        PointId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl StationId {
    #[inline]
    pub fn new(value: usize) -> Self {
        StationId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

/// Physical parameters of the conductor, immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConductorParams {
    /// Conductor designation (e.g., "Grosbeak 636 MCM")
    #[serde(default)]
    pub name: String,
    /// Outer diameter
    pub diameter: Meters,
    /// AC resistance at 25 °C (Ω/m)
    pub r_ac_25: f64,
    /// AC resistance at 75 °C (Ω/m)
    pub r_ac_75: f64,
    /// Emissivity ε ∈ (0, 1]
    pub emissivity: f64,
    /// Solar absorptivity α ∈ (0, 1]
    pub absorptivity: f64,
    /// Maximum design operating temperature
    pub t_max: Celsius,
    /// Mean line elevation above sea level, for air properties
    #[serde(default)]
    pub elevation: Meters,
}

impl ConductorParams {
    /// Validate physical ranges. Violations are fatal.
    pub fn validate(&self) -> TlrResult<()> {
        if !(self.diameter.value() > 0.0) {
            return Err(TlrError::Config(format!(
                "conductor diameter must be positive, got {}",
                self.diameter
            )));
        }
        if !(self.r_ac_25 > 0.0) || !(self.r_ac_75 > 0.0) {
            return Err(TlrError::Config(
                "conductor AC resistances must be positive".into(),
            ));
        }
        if self.r_ac_75 < self.r_ac_25 {
            return Err(TlrError::Config(format!(
                "r_ac_75 ({}) must be >= r_ac_25 ({})",
                self.r_ac_75, self.r_ac_25
            )));
        }
        if !(self.emissivity > 0.0 && self.emissivity <= 1.0) {
            return Err(TlrError::Config(format!(
                "emissivity must be in (0, 1], got {}",
                self.emissivity
            )));
        }
        if !(self.absorptivity > 0.0 && self.absorptivity <= 1.0) {
            return Err(TlrError::Config(format!(
                "absorptivity must be in (0, 1], got {}",
                self.absorptivity
            )));
        }
        if !self.t_max.value().is_finite() {
            return Err(TlrError::Config("t_max must be finite".into()));
        }
        if !(self.elevation.value() >= 0.0) || !self.elevation.value().is_finite() {
            return Err(TlrError::Config(format!(
                "elevation must be non-negative, got {}",
                self.elevation
            )));
        }
        Ok(())
    }
}

/// A vertex of the raw line route, before discretization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteVertex {
    /// Arc length along the route from its origin (m)
    pub progressive_m: f64,
    /// Geographic latitude (degrees, source CRS)
    pub lat_deg: f64,
    /// Geographic longitude (degrees, source CRS)
    pub lon_deg: f64,
    /// Bearing of the segment starting at this vertex
    pub azimuth: Degrees,
}

/// A discretized point of the line route in the projected frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinePoint {
    pub id: PointId,
    /// Arc length along the route (m)
    pub progressive_m: f64,
    /// Projected easting (m)
    pub x_m: f64,
    /// Projected northing (m)
    pub y_m: f64,
    /// Conductor axis bearing at this point
    pub azimuth: Degrees,
}

/// A weather station with fixed geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    /// Station code as it appears in the input data
    pub code: String,
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Projected easting (m); NaN until projected
    #[serde(default = "nan")]
    pub x_m: f64,
    /// Projected northing (m); NaN until projected
    #[serde(default = "nan")]
    pub y_m: f64,
}

fn nan() -> f64 {
    f64::NAN
}

/// One raw hourly observation as ingested, before the U/V split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawObservation {
    /// UTC-naive hourly timestamp
    pub timestamp: NaiveDateTime,
    /// Air temperature (°C)
    pub t_air_c: f64,
    /// Horizontal global irradiance (W/m²)
    pub q_solar_wm2: f64,
    /// Wind speed (m/s)
    pub wind_speed_ms: f64,
    /// Meteorological wind-from direction (degrees from north)
    pub wind_dir_deg: f64,
}

impl RawObservation {
    fn is_complete(&self) -> bool {
        self.t_air_c.is_finite()
            && self.q_solar_wm2.is_finite()
            && self.wind_speed_ms.is_finite()
            && self.wind_speed_ms >= 0.0
            && self.wind_dir_deg.is_finite()
    }
}

/// Meteorological variable identifiers for the kriged scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeteoVar {
    AirTemperature,
    SolarIrradiance,
    WindU,
    WindV,
}

impl MeteoVar {
    /// All variables, in storage order
    pub const ALL: [MeteoVar; 4] = [
        MeteoVar::AirTemperature,
        MeteoVar::SolarIrradiance,
        MeteoVar::WindU,
        MeteoVar::WindV,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeteoVar::AirTemperature => "t_air",
            MeteoVar::SolarIrradiance => "q_solar",
            MeteoVar::WindU => "wind_u",
            MeteoVar::WindV => "wind_v",
        }
    }
}

/// Statistics from joining station series on the common hour index.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct JoinStats {
    /// Hours present in at least one station series
    pub hours_union: usize,
    /// Hours complete for every station (kept)
    pub hours_common: usize,
}

/// All stations with their hourly series, joined on one common index.
///
/// Series are columnar: `values[var][station][hour]` with wind already
/// decomposed into U/V components, so kriging only ever sees scalar
/// fields. Hours where any station misses any variable are discarded at
/// construction (the whole hour, globally).
#[derive(Debug, Clone)]
pub struct StationSet {
    stations: Vec<Station>,
    hours: Vec<NaiveDateTime>,
    /// [station][hour]
    t_air: Vec<Vec<f64>>,
    q_solar: Vec<Vec<f64>>,
    wind_u: Vec<Vec<f64>>,
    wind_v: Vec<Vec<f64>>,
}

impl StationSet {
    /// Join per-station observation series on the common valid hour set.
    ///
    /// Duplicate timestamps within one station are a schema violation.
    pub fn from_observations(
        series: Vec<(Station, Vec<RawObservation>)>,
    ) -> TlrResult<(Self, JoinStats)> {
        if series.is_empty() {
            return Err(TlrError::DataShape("no station series provided".into()));
        }

        let mut maps: Vec<BTreeMap<NaiveDateTime, RawObservation>> = Vec::with_capacity(series.len());
        let mut stations = Vec::with_capacity(series.len());
        let mut union: BTreeSet<NaiveDateTime> = BTreeSet::new();

        for (station, observations) in series {
            let mut map = BTreeMap::new();
            for obs in observations {
                union.insert(obs.timestamp);
                if map.insert(obs.timestamp, obs).is_some() {
                    return Err(TlrError::DataShape(format!(
                        "station '{}' has duplicate timestamp {}",
                        station.code, obs.timestamp
                    )));
                }
            }
            maps.push(map);
            stations.push(station);
        }

        // Keep only hours complete for every station.
        let hours: Vec<NaiveDateTime> = union
            .iter()
            .copied()
            .filter(|ts| maps.iter().all(|m| m.get(ts).is_some_and(|o| o.is_complete())))
            .collect();

        let stats = JoinStats {
            hours_union: union.len(),
            hours_common: hours.len(),
        };

        let n = stations.len();
        let mut t_air = vec![Vec::with_capacity(hours.len()); n];
        let mut q_solar = vec![Vec::with_capacity(hours.len()); n];
        let mut wind_u = vec![Vec::with_capacity(hours.len()); n];
        let mut wind_v = vec![Vec::with_capacity(hours.len()); n];

        for (s, map) in maps.iter().enumerate() {
            for ts in &hours {
                let obs = map[ts];
                let dir = obs.wind_dir_deg.to_radians();
                t_air[s].push(obs.t_air_c);
                q_solar[s].push(obs.q_solar_wm2);
                wind_u[s].push(obs.wind_speed_ms * dir.sin());
                wind_v[s].push(obs.wind_speed_ms * dir.cos());
            }
        }

        Ok((
            Self {
                stations,
                hours,
                t_air,
                q_solar,
                wind_u,
                wind_v,
            },
            stats,
        ))
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn stations_mut(&mut self) -> &mut [Station] {
        &mut self.stations
    }

    /// The common valid hour index, strictly increasing.
    pub fn hours(&self) -> &[NaiveDateTime] {
        &self.hours
    }

    pub fn n_stations(&self) -> usize {
        self.stations.len()
    }

    pub fn n_hours(&self) -> usize {
        self.hours.len()
    }

    /// Gather one variable across stations for a given hour index.
    pub fn values_at(&self, var: MeteoVar, hour_idx: usize) -> Vec<f64> {
        let columns = match var {
            MeteoVar::AirTemperature => &self.t_air,
            MeteoVar::SolarIrradiance => &self.q_solar,
            MeteoVar::WindU => &self.wind_u,
            MeteoVar::WindV => &self.wind_v,
        };
        columns.iter().map(|series| series[hour_idx]).collect()
    }
}

/// Current schedule: either one constant current or an hourly mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CurrentSchedule {
    /// Same current for every hour
    Constant(Amperes),
    /// Explicit per-hour currents; hours absent from the map are dropped
    Hourly(BTreeMap<NaiveDateTime, f64>),
}

impl CurrentSchedule {
    /// Current applicable at the given hour, if any.
    pub fn current_at(&self, hour: NaiveDateTime) -> Option<Amperes> {
        match self {
            CurrentSchedule::Constant(current) => Some(*current),
            CurrentSchedule::Hourly(map) => map.get(&hour).copied().map(Amperes),
        }
    }
}

/// One risk classification band: applies to risks below `max_risk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBand {
    pub max_risk: f64,
    pub label: String,
}

/// Ordered risk classification bands, with a label for everything above
/// the last threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBands {
    pub bands: Vec<RiskBand>,
    pub above: String,
}

impl Default for RiskBands {
    fn default() -> Self {
        // NBR 5422-style operating bands
        Self {
            bands: vec![
                RiskBand {
                    max_risk: 0.01,
                    label: "Low".to_string(),
                },
                RiskBand {
                    max_risk: 0.05,
                    label: "Moderate".to_string(),
                },
                RiskBand {
                    max_risk: 0.10,
                    label: "High".to_string(),
                },
            ],
            above: "Critical".to_string(),
        }
    }
}

impl RiskBands {
    /// Classify an exceedance probability into a band label.
    pub fn classify(&self, risk: f64) -> &str {
        for band in &self.bands {
            if risk < band.max_risk {
                return &band.label;
            }
        }
        &self.above
    }

    pub fn validate(&self) -> TlrResult<()> {
        if self.bands.is_empty() {
            return Err(TlrError::Config("risk_bands must not be empty".into()));
        }
        let mut last = 0.0;
        for band in &self.bands {
            if !(band.max_risk > last && band.max_risk <= 1.0) {
                return Err(TlrError::Config(format!(
                    "risk band thresholds must be strictly increasing in (0, 1], got {}",
                    band.max_risk
                )));
            }
            if band.label.is_empty() {
                return Err(TlrError::Config("risk band label must not be empty".into()));
            }
            last = band.max_risk;
        }
        Ok(())
    }
}

/// One row of the output table: the thermal state of one line point at
/// one hour, reduced from its Monte Carlo sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyResult {
    pub timestamp: NaiveDateTime,
    pub point_id: PointId,
    pub progressive_m: f64,
    /// Sample mean conductor temperature (°C)
    pub t_c_mean: f64,
    /// 90th percentile conductor temperature (°C)
    pub t_c_p90: f64,
    /// 95th percentile conductor temperature (°C)
    pub t_c_p95: f64,
    /// P(T_c > T_max), strict
    pub risk: f64,
    pub risk_class: String,
    /// Sampled-ambient means for reporting
    pub t_a_mean: f64,
    pub q_s_mean: f64,
    pub w_s_mean: f64,
    pub attack_angle_mean: f64,
    /// Current applied for this hour (A)
    pub current_a: f64,
    /// Valid draws behind the sample statistics
    pub iterations_used: usize,
    /// True when ≥ 1% of draws were discarded
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn obs(h: u32, t: f64) -> RawObservation {
        RawObservation {
            timestamp: hour(h),
            t_air_c: t,
            q_solar_wm2: 800.0,
            wind_speed_ms: 2.0,
            wind_dir_deg: 90.0,
        }
    }

    fn station(id: usize, code: &str) -> Station {
        Station {
            id: StationId::new(id),
            code: code.to_string(),
            lat_deg: -15.0,
            lon_deg: -47.9,
            x_m: f64::NAN,
            y_m: f64::NAN,
        }
    }

    #[test]
    fn test_conductor_validation() {
        let conductor = ConductorParams {
            name: "Grosbeak".into(),
            diameter: Meters(0.02814),
            r_ac_25: 7.28e-5,
            r_ac_75: 9.09e-5,
            emissivity: 0.8,
            absorptivity: 0.8,
            t_max: Celsius(75.0),
            elevation: Meters(0.0),
        };
        assert!(conductor.validate().is_ok());

        let mut bad = conductor.clone();
        bad.r_ac_75 = 5.0e-5;
        assert!(bad.validate().is_err());

        let mut bad = conductor.clone();
        bad.emissivity = 0.0;
        assert!(bad.validate().is_err());

        let mut bad = conductor;
        bad.diameter = Meters(-1.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_station_join_drops_incomplete_hours() {
        // Station A covers hours 0..3, station B is missing hour 1 and has
        // a NaN temperature at hour 2. Only hour 0 survives.
        let a = vec![obs(0, 20.0), obs(1, 21.0), obs(2, 22.0)];
        let mut b2 = obs(2, 23.0);
        b2.t_air_c = f64::NAN;
        let b = vec![obs(0, 19.0), b2];

        let (set, stats) =
            StationSet::from_observations(vec![(station(0, "A"), a), (station(1, "B"), b)])
                .unwrap();
        assert_eq!(set.n_hours(), 1);
        assert_eq!(set.hours()[0], hour(0));
        assert_eq!(stats.hours_union, 3);
        assert_eq!(stats.hours_common, 1);

        let temps = set.values_at(MeteoVar::AirTemperature, 0);
        assert_eq!(temps, vec![20.0, 19.0]);
    }

    #[test]
    fn test_station_join_rejects_duplicate_timestamps() {
        let a = vec![obs(0, 20.0), obs(0, 21.0)];
        let err = StationSet::from_observations(vec![(station(0, "A"), a)]).unwrap_err();
        assert!(matches!(err, TlrError::DataShape(_)));
    }

    #[test]
    fn test_wind_decomposition_round_trip() {
        // Wind from 30° at 3 m/s must survive the U/V split.
        let mut o = obs(0, 20.0);
        o.wind_speed_ms = 3.0;
        o.wind_dir_deg = 30.0;
        let (set, _) = StationSet::from_observations(vec![(station(0, "A"), vec![o])]).unwrap();
        let u = set.values_at(MeteoVar::WindU, 0)[0];
        let v = set.values_at(MeteoVar::WindV, 0)[0];
        let speed = (u * u + v * v).sqrt();
        let dir = u.atan2(v).to_degrees().rem_euclid(360.0);
        assert!((speed - 3.0).abs() < 1e-6);
        assert!((dir - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_current_schedule() {
        let constant = CurrentSchedule::Constant(Amperes(500.0));
        assert_eq!(constant.current_at(hour(0)).unwrap().value(), 500.0);

        let mut map = BTreeMap::new();
        map.insert(hour(0), 400.0);
        let hourly = CurrentSchedule::Hourly(map);
        assert_eq!(hourly.current_at(hour(0)).unwrap().value(), 400.0);
        assert!(hourly.current_at(hour(1)).is_none());
    }

    #[test]
    fn test_risk_band_classification() {
        let bands = RiskBands::default();
        assert_eq!(bands.classify(0.001), "Low");
        assert_eq!(bands.classify(0.03), "Moderate");
        assert_eq!(bands.classify(0.07), "High");
        assert_eq!(bands.classify(0.16), "Critical");
    }

    #[test]
    fn test_hourly_result_serde_round_trip() {
        let row = HourlyResult {
            timestamp: hour(12),
            point_id: PointId::new(7),
            progressive_m: 7000.0,
            t_c_mean: 51.2,
            t_c_p90: 55.8,
            t_c_p95: 57.1,
            risk: 0.004,
            risk_class: "Low".into(),
            t_a_mean: 26.0,
            q_s_mean: 750.0,
            w_s_mean: 2.1,
            attack_angle_mean: 58.0,
            current_a: 500.0,
            iterations_used: 10_000,
            degraded: false,
        };
        let json = serde_json::to_string(&row).unwrap();
        let back: HourlyResult = serde_json::from_str(&json).unwrap();
        assert_eq!(row, back);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"mc_iterations": 500, "rng_master_seed": 9}"#).unwrap();
        assert_eq!(config.mc_iterations, 500);
        assert_eq!(config.rng_master_seed, 9);
        assert_eq!(config.discretization_step_m, 1000.0);
        assert_eq!(config.risk_bands.classify(0.2), "Critical");
    }
}
