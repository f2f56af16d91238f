//! Risk reduction of a conductor temperature sample.
//!
//! Percentiles use linear interpolation on the sorted sample; the
//! thermal risk is the strict exceedance fraction P(T_c > T_max); the
//! qualitative class comes from the configured band table.

use crate::monte_carlo::AmbientDraws;
use crate::thermal::CigreThermalModel;
use tlr_core::{Amperes, RiskBands, TlrError, TlrResult};

/// Ampacity search interval (A) and tolerance
const AMPACITY_LO_A: f64 = 1.0;
const AMPACITY_HI_A: f64 = 5000.0;
const AMPACITY_TOL_A: f64 = 0.5;

/// Statistics reduced from one temperature sample.
#[derive(Debug, Clone)]
pub struct RiskSummary {
    pub mean: f64,
    pub p90: f64,
    pub p95: f64,
    /// Percentile at the configured confidence level
    pub confidence: f64,
    /// P(T_c > T_max), strict
    pub risk: f64,
    pub class: String,
}

/// Linear-interpolated percentile of a sorted sample, p in [0, 100].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let t = rank - lo as f64;
        sorted[lo] + t * (sorted[hi] - sorted[lo])
    }
}

/// Strict exceedance fraction |{x > threshold}| / n.
pub fn exceedance(samples: &[f64], threshold: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().filter(|&&x| x > threshold).count() as f64 / samples.len() as f64
}

/// Reduce a temperature sample against the design temperature.
pub fn analyze(
    samples: &[f64],
    t_max: f64,
    confidence_percentile: f64,
    bands: &RiskBands,
) -> TlrResult<RiskSummary> {
    if samples.is_empty() {
        return Err(TlrError::Numeric("empty temperature sample".into()));
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite samples"));

    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    let risk = exceedance(&sorted, t_max);
    Ok(RiskSummary {
        mean,
        p90: percentile(&sorted, 90.0),
        p95: percentile(&sorted, 95.0),
        confidence: percentile(&sorted, confidence_percentile),
        risk,
        class: bands.classify(risk).to_string(),
    })
}

/// Invert the current that puts the confidence-percentile temperature at
/// the design limit, under a fixed ambient sample set.
///
/// Reusing the same draws for every candidate current makes the target
/// function deterministic and monotone in I, so a bisection on
/// [1 A, 5000 A] converges to within 0.5 A.
pub fn ampacity(
    model: &CigreThermalModel,
    draws: &AmbientDraws,
    t_max: f64,
    confidence_percentile: f64,
) -> TlrResult<Amperes> {
    if draws.is_empty() {
        return Err(TlrError::Numeric("empty ambient draw batch".into()));
    }

    // "Too hot" also covers currents where the solver no longer brackets
    // within its 200 °C span; those are far beyond the design limit.
    let too_hot = |current: f64| -> bool {
        let outcome = match crate::monte_carlo::propagate(model, draws, Amperes(current)) {
            Ok(outcome) => outcome,
            Err(_) => return true,
        };
        if outcome.samples.len() * 2 < draws.len() {
            return true;
        }
        let mut sorted = outcome.samples;
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite samples"));
        percentile(&sorted, confidence_percentile) > t_max
    };

    if too_hot(AMPACITY_LO_A) {
        return Err(TlrError::Solver(format!(
            "ambient conditions alone exceed the design temperature {t_max} °C"
        )));
    }
    if !too_hot(AMPACITY_HI_A) {
        return Err(TlrError::Solver(format!(
            "design temperature {t_max} °C not reached below {AMPACITY_HI_A} A"
        )));
    }

    let mut lo = AMPACITY_LO_A;
    let mut hi = AMPACITY_HI_A;
    while hi - lo > AMPACITY_TOL_A {
        let mid = 0.5 * (lo + hi);
        if too_hot(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(Amperes(lo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::{draw_ambient, EnvDistributions};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use tlr_core::{Celsius, ConductorParams, Meters};

    #[test]
    fn test_percentile_interpolates() {
        let sorted = vec![10.0, 20.0];
        assert!((percentile(&sorted, 50.0) - 15.0).abs() < 1e-12);
        assert_eq!(percentile(&sorted, 0.0), 10.0);
        assert_eq!(percentile(&sorted, 100.0), 20.0);

        let sorted: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        assert!((percentile(&sorted, 90.0) - 90.0).abs() < 1e-12);
        assert!((percentile(&sorted, 42.5) - 42.5).abs() < 1e-12);
    }

    #[test]
    fn test_exceedance_is_strict() {
        let samples = vec![70.0, 75.0, 80.0];
        assert!((exceedance(&samples, 75.0) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(exceedance(&samples, 80.0), 0.0);
    }

    #[test]
    fn test_risk_non_increasing_in_t_max() {
        let samples: Vec<f64> = (0..1000).map(|i| 40.0 + 0.05 * i as f64).collect();
        let mut last = 1.0;
        for t_max in [45.0, 55.0, 65.0, 75.0, 85.0] {
            let risk = exceedance(&samples, t_max);
            assert!(risk <= last);
            last = risk;
        }
    }

    #[test]
    fn test_percentile_ordering() {
        let samples: Vec<f64> = (0..500)
            .map(|i| 50.0 + 10.0 * ((i * 37 % 97) as f64 / 97.0))
            .collect();
        let bands = RiskBands::default();
        let summary = analyze(&samples, 75.0, 90.0, &bands).unwrap();
        assert!(summary.p95 >= summary.p90);
        assert!(summary.p90 >= summary.mean - 1e-9);
        assert!((summary.confidence - summary.p90).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_sample_risk_classification() {
        // Scenario: T_c ~ N(70, 5) against T_max = 75 gives
        // P(Z > 1) ≈ 0.1587, which classifies Critical.
        let mut rng = StdRng::seed_from_u64(1234);
        let dist = Normal::new(70.0, 5.0).unwrap();
        let samples: Vec<f64> = (0..10_000).map(|_| dist.sample(&mut rng)).collect();

        let bands = RiskBands::default();
        let summary = analyze(&samples, 75.0, 90.0, &bands).unwrap();
        assert!((summary.risk - 0.1587).abs() < 0.012, "risk = {}", summary.risk);
        assert_eq!(summary.class, "Critical");
        assert!((summary.mean - 70.0).abs() < 0.2);
    }

    fn model() -> CigreThermalModel {
        CigreThermalModel::new(ConductorParams {
            name: "Grosbeak".into(),
            diameter: Meters(0.02814),
            r_ac_25: 7.28e-5,
            r_ac_75: 9.09e-5,
            emissivity: 0.8,
            absorptivity: 0.8,
            t_max: Celsius(75.0),
            elevation: Meters(0.0),
        })
        .unwrap()
    }

    #[test]
    fn test_ampacity_inversion() {
        // Deterministic ambient: the inverted current must reproduce the
        // design temperature through a forward solve.
        let env = EnvDistributions {
            t_air: (30.0, 0.0),
            q_solar: (800.0, 0.0),
            wind_u: (1.0, 0.0),
            wind_v: (0.0, 0.0),
        };
        let draws = draw_ambient(&env, 0.0, 32, 5).unwrap();
        let model = model();
        let rating = ampacity(&model, &draws, 75.0, 90.0).unwrap();
        assert!(rating.value() > 100.0 && rating.value() < 2000.0);

        let outcome = crate::monte_carlo::propagate(&model, &draws, rating).unwrap();
        let t_c = outcome.samples[0];
        assert!((t_c - 75.0).abs() < 0.2, "t_c at rating = {t_c}");
    }

    #[test]
    fn test_ampacity_monotone_in_design_temperature() {
        let env = EnvDistributions {
            t_air: (30.0, 0.0),
            q_solar: (500.0, 0.0),
            wind_u: (2.0, 0.0),
            wind_v: (0.0, 0.0),
        };
        let draws = draw_ambient(&env, 0.0, 16, 5).unwrap();
        let model = model();
        let a60 = ampacity(&model, &draws, 60.0, 90.0).unwrap();
        let a75 = ampacity(&model, &draws, 75.0, 90.0).unwrap();
        assert!(a75.value() > a60.value());
    }
}
