//! Variogram models fitted per hour on the station values.
//!
//! The experimental variogram pairs every two stations of the hour and
//! fits the configured model. The linear model is the default and is
//! fitted by ordinary least squares; a failed or non-positive fit falls
//! back to (c₀ = 0, s = 1), which keeps the kriging system well posed for
//! any station geometry with distinct locations.

use tlr_core::VariogramKind;

/// A fitted variogram γ(h).
///
/// `sill` and `range` are only meaningful for the spherical and
/// exponential models; the linear model uses `nugget` and `slope`.
#[derive(Debug, Clone)]
pub struct Variogram {
    kind: VariogramKind,
    nugget: f64,
    slope: f64,
    sill: f64,
    range: f64,
}

impl Variogram {
    /// Linear variogram γ(h) = c₀ + s·h with explicit parameters.
    pub fn linear(nugget: f64, slope: f64) -> Self {
        Self {
            kind: VariogramKind::Linear,
            nugget: nugget.max(0.0),
            slope,
            sill: 0.0,
            range: 0.0,
        }
    }

    /// Fit the requested model to one hour of station values.
    ///
    /// `coords` are projected (x, y) in metres, `values` the observed
    /// variable at each station, index-aligned.
    pub fn fit(kind: VariogramKind, coords: &[(f64, f64)], values: &[f64]) -> Self {
        let pairs = experimental_pairs(coords, values);
        let (nugget, slope) = match ols_line(&pairs) {
            Some((intercept, slope)) if slope > 0.0 && intercept.is_finite() => {
                (intercept.max(0.0), slope)
            }
            // Fit failed or produced a non-positive slope
            _ => (0.0, 1.0),
        };

        match kind {
            VariogramKind::Linear => Self::linear(nugget, slope),
            VariogramKind::Spherical | VariogramKind::Exponential => {
                let variance = sample_variance(values);
                let h_max = pairs.iter().map(|&(h, _)| h).fold(0.0f64, f64::max);
                // Method-of-moments parameters: sample variance as the
                // sill, half the maximum separation as the range.
                let sill = variance.max(nugget + f64::MIN_POSITIVE);
                let range = if h_max > 0.0 { h_max / 2.0 } else { 1.0 };
                Self {
                    kind,
                    nugget,
                    slope: 0.0,
                    sill,
                    range,
                }
            }
        }
    }

    /// Semivariance at separation h. γ(0) = 0 by convention.
    pub fn gamma(&self, h: f64) -> f64 {
        if h <= 0.0 {
            return 0.0;
        }
        match self.kind {
            VariogramKind::Linear => self.nugget + self.slope * h,
            VariogramKind::Spherical => {
                if h >= self.range {
                    self.sill
                } else {
                    let r = h / self.range;
                    self.nugget + (self.sill - self.nugget) * (1.5 * r - 0.5 * r * r * r)
                }
            }
            VariogramKind::Exponential => {
                self.nugget + (self.sill - self.nugget) * (1.0 - (-3.0 * h / self.range).exp())
            }
        }
    }

    pub fn kind(&self) -> VariogramKind {
        self.kind
    }

    pub fn nugget(&self) -> f64 {
        self.nugget
    }
}

/// Experimental variogram cloud: (h, 0.5·(zi − zj)²) for every station pair.
fn experimental_pairs(coords: &[(f64, f64)], values: &[f64]) -> Vec<(f64, f64)> {
    let n = coords.len().min(values.len());
    if n < 2 {
        return Vec::new();
    }
    let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = coords[i].0 - coords[j].0;
            let dy = coords[i].1 - coords[j].1;
            let h = (dx * dx + dy * dy).sqrt();
            let dz = values[i] - values[j];
            pairs.push((h, 0.5 * dz * dz));
        }
    }
    pairs
}

/// Ordinary least squares line through (x, y) points; None when the
/// system is underdetermined.
fn ols_line(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.0).sum();
    let sum_y: f64 = points.iter().map(|p| p.1).sum();
    let sum_xx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = points.iter().map(|p| p.0 * p.1).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((intercept, slope))
}

fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_gamma() {
        let v = Variogram::linear(2.0, 0.5);
        assert_eq!(v.gamma(0.0), 0.0);
        assert!((v.gamma(10.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_station_fit_falls_back() {
        // A single pair cannot determine both intercept and slope.
        let coords = [(0.0, 0.0), (1000.0, 0.0)];
        let values = [20.0, 30.0];
        let v = Variogram::fit(VariogramKind::Linear, &coords, &values);
        assert_eq!(v.nugget(), 0.0);
        assert!((v.gamma(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ols_recovers_exact_line() {
        // Values along a transect whose semivariance grows linearly.
        let points = vec![(100.0, 1.0), (200.0, 2.0), (400.0, 4.0)];
        let (intercept, slope) = ols_line(&points).unwrap();
        assert!(intercept.abs() < 1e-9);
        assert!((slope - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_spherical_reaches_sill() {
        let coords = [(0.0, 0.0), (1000.0, 0.0), (0.0, 1000.0), (1000.0, 1000.0)];
        let values = [10.0, 14.0, 12.0, 18.0];
        let v = Variogram::fit(VariogramKind::Spherical, &coords, &values);
        let sill = sample_variance(&values);
        assert!((v.gamma(1e9) - sill).abs() < 1e-9);
        // Monotone up to the range
        assert!(v.gamma(100.0) < v.gamma(500.0));
    }

    #[test]
    fn test_exponential_monotone_and_bounded() {
        let coords = [(0.0, 0.0), (500.0, 0.0), (0.0, 800.0)];
        let values = [5.0, 9.0, 7.0];
        let v = Variogram::fit(VariogramKind::Exponential, &coords, &values);
        assert!(v.gamma(10.0) < v.gamma(100.0));
        let sill = sample_variance(&values);
        assert!(v.gamma(1e9) <= sill + 1e-9);
    }
}
