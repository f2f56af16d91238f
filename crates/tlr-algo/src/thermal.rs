//! CIGRE TB-601 steady-state thermal balance.
//!
//! Finds the conductor temperature T_c satisfying
//!
//! ```text
//! P_J(T_c) + P_S = P_c(T_c) + P_r(T_c)
//! ```
//!
//! with Joule heating, solar gain, convective cooling, and radiative
//! cooling per unit length (W/m). Air properties are evaluated at the
//! film temperature T_f = (T_c + T_a)/2; forced convection uses the
//! TB-601 Nusselt correlations with the wind-attack-angle correction,
//! and natural convection is the lower bound at calm wind.
//!
//! The residual is strictly decreasing in T_c and changes sign on
//! [T_a, T_a + 200] for physical inputs, so a bracketed Brent solve
//! converges without derivatives.
//!
//! Reference: CIGRE Technical Brochure 601, "Guide for thermal rating
//! calculations of overhead lines" (2014).

use crate::roots;
use tlr_core::{
    Amperes, Celsius, ConductorParams, Degrees, MetersPerSecond, TlrResult, WattsPerSquareMeter,
};

/// Stefan-Boltzmann constant (W/m²·K⁴)
const SIGMA_SB: f64 = 5.670_374_419e-8;
/// Gravitational acceleration (m/s²)
const GRAVITY: f64 = 9.806_65;
/// Solver bracket width above ambient (°C)
const BRACKET_SPAN: f64 = 200.0;
/// Interval tolerance for the root find (°C)
const SOLVE_TOL: f64 = 1e-4;

/// One ambient realization seen by the solver.
#[derive(Debug, Clone, Copy)]
pub struct AmbientState {
    /// Air temperature
    pub t_air: Celsius,
    /// Effective horizontal global irradiance
    pub q_solar: WattsPerSquareMeter,
    /// Wind speed
    pub wind_speed: MetersPerSecond,
    /// Wind-to-conductor attack angle, 0° parallel .. 90° perpendicular
    pub attack_angle: Degrees,
}

/// Steady-state CIGRE heat-balance model for one conductor.
///
/// Stateless after construction; safe to call from multiple threads.
#[derive(Debug, Clone)]
pub struct CigreThermalModel {
    conductor: ConductorParams,
}

impl CigreThermalModel {
    pub fn new(conductor: ConductorParams) -> TlrResult<Self> {
        conductor.validate()?;
        Ok(Self { conductor })
    }

    pub fn conductor(&self) -> &ConductorParams {
        &self.conductor
    }

    /// AC resistance at conductor temperature, linear in T with the
    /// (R₂₅, R₇₅) anchor points; extrapolation keeps the same slope.
    pub fn resistance(&self, t_c: f64) -> f64 {
        let per_degree = (self.conductor.r_ac_75 - self.conductor.r_ac_25) / 50.0;
        self.conductor.r_ac_25 + (t_c - 25.0) * per_degree
    }

    /// Joule heating I²·R(T_c) (W/m)
    pub fn joule_gain(&self, t_c: f64, current_a: f64) -> f64 {
        current_a * current_a * self.resistance(t_c)
    }

    /// Solar gain α·D·Q_s (W/m); Q_s is the effective irradiance on the
    /// conductor (sin β = 1 contract).
    pub fn solar_gain(&self, q_solar: f64) -> f64 {
        self.conductor.absorptivity * self.conductor.diameter.value() * q_solar
    }

    /// Convective cooling (W/m): max of forced (angle-corrected) and
    /// natural Nusselt numbers.
    pub fn convective_loss(&self, t_c: f64, t_a: f64, wind_speed: f64, attack_angle_deg: f64) -> f64 {
        let t_film = 0.5 * (t_c + t_a);
        let lambda_f = air_conductivity(t_film);
        let nu_forced = self.forced_nusselt(t_film, wind_speed) * angle_factor(attack_angle_deg);
        let nu_natural = self.natural_nusselt(t_c, t_a);
        let nu = nu_forced.max(nu_natural);
        std::f64::consts::PI * lambda_f * nu * (t_c - t_a)
    }

    /// Radiative cooling ε·σ·π·D·(T_c⁴ − T_a⁴) in kelvin (W/m)
    pub fn radiative_loss(&self, t_c: f64, t_a: f64) -> f64 {
        let tk_c = t_c + 273.15;
        let tk_a = t_a + 273.15;
        std::f64::consts::PI
            * self.conductor.diameter.value()
            * self.conductor.emissivity
            * SIGMA_SB
            * (tk_c.powi(4) - tk_a.powi(4))
    }

    /// Heat-balance residual P_J + P_S − P_c − P_r at a trial T_c.
    pub fn balance_residual(&self, t_c: f64, state: &AmbientState, current: Amperes) -> f64 {
        self.joule_gain(t_c, current.value()) + self.solar_gain(state.q_solar.value())
            - self.convective_loss(
                t_c,
                state.t_air.value(),
                state.wind_speed.value(),
                state.attack_angle.value(),
            )
            - self.radiative_loss(t_c, state.t_air.value())
    }

    /// Solve for the steady-state conductor temperature.
    pub fn solve(&self, state: &AmbientState, current: Amperes) -> TlrResult<Celsius> {
        let t_a = state.t_air.value();
        let t_c = roots::brent(
            |t| self.balance_residual(t, state, current),
            t_a,
            t_a + BRACKET_SPAN,
            SOLVE_TOL,
            100,
        )?;
        Ok(Celsius(t_c))
    }

    /// Forced-convection Nusselt number at perpendicular attack,
    /// TB-601 banded power law for stranded conductors.
    fn forced_nusselt(&self, t_film: f64, wind_speed: f64) -> f64 {
        if wind_speed <= 0.0 {
            return 0.0;
        }
        let rho = air_density(t_film, self.conductor.elevation.value());
        let mu = air_viscosity(t_film);
        let re = rho * wind_speed * self.conductor.diameter.value() / mu;
        let (b1, n) = if re < 2.65e3 {
            (0.641, 0.471)
        } else {
            (0.178, 0.633)
        };
        b1 * re.powf(n)
    }

    /// Natural-convection Nusselt number from the Grashof-Prandtl product.
    fn natural_nusselt(&self, t_c: f64, t_a: f64) -> f64 {
        if t_c <= t_a {
            return 0.0;
        }
        let t_film = 0.5 * (t_c + t_a);
        let rho = air_density(t_film, self.conductor.elevation.value());
        let mu = air_viscosity(t_film);
        let nu_kinematic = mu / rho;
        let d = self.conductor.diameter.value();
        let gr = d * d * d * (t_c - t_a) * GRAVITY / ((t_film + 273.15) * nu_kinematic * nu_kinematic);
        let pr = 0.715 - 2.5e-4 * t_film;
        let gr_pr = gr * pr;
        if gr_pr <= 0.0 {
            return 0.0;
        }
        let (a2, m2) = if gr_pr < 1e4 {
            (0.850, 0.188)
        } else {
            (0.480, 0.250)
        };
        a2 * gr_pr.powf(m2)
    }
}

/// Thermal conductivity of air at film temperature (W/m·K)
fn air_conductivity(t_film: f64) -> f64 {
    2.368e-2 + 7.23e-5 * t_film - 2.763e-8 * t_film * t_film
}

/// Dynamic viscosity of air at film temperature (kg/m·s)
fn air_viscosity(t_film: f64) -> f64 {
    (17.239 + 4.635e-2 * t_film - 2.03e-5 * t_film * t_film) * 1e-6
}

/// Air density at film temperature and elevation (kg/m³)
fn air_density(t_film: f64, elevation_m: f64) -> f64 {
    (1.293 - 1.525e-4 * elevation_m + 6.379e-9 * elevation_m * elevation_m)
        / (1.0 + 0.00367 * t_film)
}

/// Wind attack-angle correction on the perpendicular Nusselt number.
/// δ = 0° is parallel flow, δ = 90° perpendicular (factor 1).
fn angle_factor(attack_angle_deg: f64) -> f64 {
    let delta = attack_angle_deg.clamp(0.0, 90.0).to_radians();
    let sin_delta = delta.sin();
    if attack_angle_deg <= 24.0 {
        0.42 + 0.68 * sin_delta.powf(1.08)
    } else {
        0.42 + 0.58 * sin_delta.powf(0.90)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlr_core::Meters;

    fn grosbeak() -> ConductorParams {
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

    fn model() -> CigreThermalModel {
        CigreThermalModel::new(grosbeak()).unwrap()
    }

    fn baseline_state() -> AmbientState {
        AmbientState {
            t_air: Celsius(25.0),
            q_solar: WattsPerSquareMeter(0.0),
            wind_speed: MetersPerSecond(0.5),
            attack_angle: Degrees(90.0),
        }
    }

    #[test]
    fn test_resistance_interpolation_and_extrapolation() {
        let m = model();
        assert!((m.resistance(25.0) - 7.28e-5).abs() < 1e-12);
        assert!((m.resistance(75.0) - 9.09e-5).abs() < 1e-12);
        let mid = 0.5 * (7.28e-5 + 9.09e-5);
        assert!((m.resistance(50.0) - mid).abs() < 1e-12);
        // Same slope outside the anchor interval
        assert!(m.resistance(100.0) > 9.09e-5);
        assert!(m.resistance(0.0) < 7.28e-5);
    }

    #[test]
    fn test_angle_factor_limits() {
        assert!((angle_factor(90.0) - 1.0).abs() < 1e-12);
        assert!((angle_factor(0.0) - 0.42).abs() < 1e-12);
        assert!(angle_factor(45.0) > angle_factor(10.0));
    }

    #[test]
    fn test_no_sun_baseline_solution() {
        // Scenario: 500 A, no sun, light perpendicular wind. The solution
        // must sit above ambient and satisfy the balance to 1e-2 W/m.
        let m = model();
        let state = baseline_state();
        let t_c = m.solve(&state, Amperes(500.0)).unwrap().value();
        assert!(t_c > 25.0 && t_c < 70.0, "t_c = {t_c}");
        let residual = m.balance_residual(t_c, &state, Amperes(500.0));
        assert!(residual.abs() < 1e-2, "residual = {residual}");
    }

    #[test]
    fn test_high_sun_runs_hotter() {
        let m = model();
        let calm = baseline_state();
        let sunny = AmbientState {
            t_air: Celsius(30.0),
            q_solar: WattsPerSquareMeter(1000.0),
            wind_speed: MetersPerSecond(1.0),
            attack_angle: Degrees(90.0),
        };
        let t_base = m.solve(&calm, Amperes(500.0)).unwrap().value();
        let t_sunny = m.solve(&sunny, Amperes(500.0)).unwrap().value();
        assert!(t_sunny > t_base, "{t_sunny} vs {t_base}");
        let residual = m.balance_residual(t_sunny, &sunny, Amperes(500.0));
        assert!(residual.abs() < 1e-2);
    }

    #[test]
    fn test_monotonic_in_current() {
        let m = model();
        let state = baseline_state();
        let mut last = 0.0;
        for current in [100.0, 300.0, 500.0, 700.0, 900.0] {
            let t_c = m.solve(&state, Amperes(current)).unwrap().value();
            assert!(t_c > last, "t_c({current}) = {t_c} not above {last}");
            last = t_c;
        }
    }

    #[test]
    fn test_monotonic_in_ambient_temperature() {
        let m = model();
        let mut last = 0.0;
        for t_air in [10.0, 20.0, 30.0, 40.0] {
            let state = AmbientState {
                t_air: Celsius(t_air),
                ..baseline_state()
            };
            let t_c = m.solve(&state, Amperes(500.0)).unwrap().value();
            assert!(t_c > last);
            last = t_c;
        }
    }

    #[test]
    fn test_monotonic_decreasing_in_wind() {
        let m = model();
        let mut last = f64::INFINITY;
        for wind in [0.5, 1.0, 2.0, 4.0, 8.0] {
            let state = AmbientState {
                wind_speed: MetersPerSecond(wind),
                ..baseline_state()
            };
            let t_c = m.solve(&state, Amperes(500.0)).unwrap().value();
            assert!(t_c < last, "t_c at {wind} m/s = {t_c} not below {last}");
            last = t_c;
        }
    }

    #[test]
    fn test_monotonic_in_irradiance() {
        let m = model();
        let mut last = 0.0;
        for q in [0.0, 300.0, 600.0, 1000.0] {
            let state = AmbientState {
                q_solar: WattsPerSquareMeter(q),
                ..baseline_state()
            };
            let t_c = m.solve(&state, Amperes(500.0)).unwrap().value();
            assert!(t_c > last);
            last = t_c;
        }
    }

    #[test]
    fn test_zero_current_no_sun_stays_at_ambient() {
        let m = model();
        let state = baseline_state();
        let t_c = m.solve(&state, Amperes(0.0)).unwrap().value();
        assert!((t_c - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_calm_wind_uses_natural_convection() {
        // Near-zero wind must still cool: natural convection bounds Nu
        // from below and the solve stays bracketed.
        let m = model();
        let state = AmbientState {
            wind_speed: MetersPerSecond(0.0),
            ..baseline_state()
        };
        let t_c = m.solve(&state, Amperes(500.0)).unwrap().value();
        assert!(t_c > 25.0 && t_c < 120.0, "t_c = {t_c}");
        let residual = m.balance_residual(t_c, &state, Amperes(500.0));
        assert!(residual.abs() < 1e-2);
    }
}
