//! Monte Carlo propagation of meteorological uncertainty.
//!
//! Per (point, hour), draws N independent samples from the kriging
//! posterior of each variable, recomposes wind speed and attack angle
//! from the U/V components, and evaluates the thermal solver per draw.
//! Failed draws are discarded; a (point, hour) whose discard fraction
//! reaches 1% is flagged degraded.
//!
//! Reproducibility: every task seeds its own `StdRng` from a fixed mix
//! of (master seed, hour, point id), so results do not depend on
//! execution order across threads.

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::thermal::{AmbientState, CigreThermalModel};
use tlr_core::{Amperes, Celsius, Degrees, MetersPerSecond, PointId, TlrError, TlrResult,
    WattsPerSquareMeter};

/// Discard fraction at which a result is flagged degraded.
const DEGRADED_THRESHOLD: f64 = 0.01;

/// Kriging posterior (mean, std) per variable at one (point, hour).
#[derive(Debug, Clone, Copy)]
pub struct EnvDistributions {
    pub t_air: (f64, f64),
    pub q_solar: (f64, f64),
    pub wind_u: (f64, f64),
    pub wind_v: (f64, f64),
}

/// One batch of ambient realizations, index-aligned across fields.
#[derive(Debug, Clone)]
pub struct AmbientDraws {
    pub t_air: Vec<f64>,
    pub q_solar: Vec<f64>,
    pub wind_speed: Vec<f64>,
    pub attack_angle: Vec<f64>,
}

impl AmbientDraws {
    pub fn len(&self) -> usize {
        self.t_air.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t_air.is_empty()
    }

    fn state(&self, i: usize) -> AmbientState {
        AmbientState {
            t_air: Celsius(self.t_air[i]),
            q_solar: WattsPerSquareMeter(self.q_solar[i]),
            wind_speed: MetersPerSecond(self.wind_speed[i]),
            attack_angle: Degrees(self.attack_angle[i]),
        }
    }
}

/// Sampled-ambient means carried onto the result row.
#[derive(Debug, Clone, Copy)]
pub struct AmbientMeans {
    pub t_air: f64,
    pub q_solar: f64,
    pub wind_speed: f64,
    pub attack_angle: f64,
}

/// Outcome of one (point, hour) propagation.
#[derive(Debug, Clone)]
pub struct McOutcome {
    /// Valid conductor temperature realizations
    pub samples: Vec<f64>,
    /// Draws discarded on solver or numeric failure
    pub discarded: usize,
    /// True when the discard fraction reached 1%
    pub degraded: bool,
    pub ambient_means: AmbientMeans,
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fixed subseed mix of (master seed, hour, point id); makes parallel
/// execution order-independent.
pub fn subseed(master_seed: u64, hour: NaiveDateTime, point: PointId) -> u64 {
    let ts = hour.and_utc().timestamp() as u64;
    splitmix64(master_seed ^ splitmix64(ts ^ splitmix64(point.value() as u64)))
}

/// Wind-to-line attack angle in [0°, 90°] from the wind-from azimuth and
/// the conductor axis bearing.
pub fn wind_attack_angle(wind_from_deg: f64, line_azimuth_deg: f64) -> f64 {
    let diff = (wind_from_deg - line_azimuth_deg).to_radians();
    diff.sin().abs().asin().to_degrees()
}

/// Recompose wind speed and wind-from direction from U/V components.
pub fn recompose_wind(u: f64, v: f64) -> (f64, f64) {
    let speed = (u * u + v * v).sqrt();
    let direction = u.atan2(v).to_degrees().rem_euclid(360.0);
    (speed, direction)
}

/// Draw N ambient realizations from the per-variable posteriors.
///
/// Q_s is clamped at zero; wind speed is non-negative by construction
/// after the U/V recomposition.
pub fn draw_ambient(
    env: &EnvDistributions,
    line_azimuth_deg: f64,
    iterations: usize,
    seed: u64,
) -> TlrResult<AmbientDraws> {
    let mut rng = StdRng::seed_from_u64(seed);

    let normal = |label: &str, (mean, std): (f64, f64)| -> TlrResult<Normal<f64>> {
        Normal::new(mean, std).map_err(|err| {
            TlrError::Numeric(format!("invalid {label} distribution ({mean}, {std}): {err}"))
        })
    };
    let t_air_dist = normal("t_air", env.t_air)?;
    let q_solar_dist = normal("q_solar", env.q_solar)?;
    let wind_u_dist = normal("wind_u", env.wind_u)?;
    let wind_v_dist = normal("wind_v", env.wind_v)?;

    let mut draws = AmbientDraws {
        t_air: Vec::with_capacity(iterations),
        q_solar: Vec::with_capacity(iterations),
        wind_speed: Vec::with_capacity(iterations),
        attack_angle: Vec::with_capacity(iterations),
    };

    for _ in 0..iterations {
        let t_air = t_air_dist.sample(&mut rng);
        let q_solar = q_solar_dist.sample(&mut rng).max(0.0);
        let u = wind_u_dist.sample(&mut rng);
        let v = wind_v_dist.sample(&mut rng);
        let (speed, direction) = recompose_wind(u, v);

        draws.t_air.push(t_air);
        draws.q_solar.push(q_solar);
        draws.wind_speed.push(speed);
        draws
            .attack_angle
            .push(wind_attack_angle(direction, line_azimuth_deg));
    }

    Ok(draws)
}

/// Evaluate the thermal solver over a batch of ambient draws.
///
/// Returns an error only when every draw failed; partial failure is
/// reported through `discarded`/`degraded`.
pub fn propagate(
    model: &CigreThermalModel,
    draws: &AmbientDraws,
    current: Amperes,
) -> TlrResult<McOutcome> {
    let n = draws.len();
    if n == 0 {
        return Err(TlrError::Numeric("empty ambient draw batch".into()));
    }

    let mut samples = Vec::with_capacity(n);
    let mut discarded = 0usize;
    for i in 0..n {
        match model.solve(&draws.state(i), current) {
            Ok(t_c) if t_c.value().is_finite() => samples.push(t_c.value()),
            _ => discarded += 1,
        }
    }

    if samples.is_empty() {
        return Err(TlrError::Solver(format!(
            "all {n} draws failed the thermal solve"
        )));
    }

    let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
    Ok(McOutcome {
        degraded: discarded as f64 / n as f64 >= DEGRADED_THRESHOLD,
        discarded,
        samples,
        ambient_means: AmbientMeans {
            t_air: mean(&draws.t_air),
            q_solar: mean(&draws.q_solar),
            wind_speed: mean(&draws.wind_speed),
            attack_angle: mean(&draws.attack_angle),
        },
    })
}
