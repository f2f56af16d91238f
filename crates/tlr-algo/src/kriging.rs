//! Ordinary kriging per hour and per meteorological variable.
//!
//! For n stations the system is the (n+1)×(n+1) semivariance matrix
//! bordered by a row/column of ones (Lagrange multiplier for the
//! unbiasedness constraint Σλ = 1). The matrix depends only on station
//! geometry and the hour's variogram, so it is factorized once per
//! (hour, variable) and each target point costs one back-substitution.
//!
//! The estimation variance σ² = Σλᵢ·γ(dᵢ) + μ is the quantity that makes
//! downstream uncertainty propagation meaningful; it is clamped at zero
//! against round-off.

use chrono::NaiveDateTime;
use faer::{prelude::*, solvers::PartialPivLu, Mat};

use crate::variogram::Variogram;
use tlr_core::{TlrError, TlrResult};

/// Two stations closer than this are the same location (singular system).
const DUPLICATE_STATION_EPS_M: f64 = 1e-6;
/// A target closer than this to a station returns the station value exactly.
const COINCIDENT_TARGET_EPS_M: f64 = 1e-9;

/// Kriging mean and standard deviation at one target point.
#[derive(Debug, Clone, Copy)]
pub struct Estimate {
    pub mean: f64,
    pub std: f64,
}

/// A factorized ordinary-kriging system for one (hour, variable).
pub struct KrigingField {
    hour: NaiveDateTime,
    coords: Vec<(f64, f64)>,
    values: Vec<f64>,
    variogram: Variogram,
    lu: PartialPivLu<f64>,
}

impl std::fmt::Debug for KrigingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrigingField")
            .field("hour", &self.hour)
            .field("coords", &self.coords)
            .field("values", &self.values)
            .field("variogram", &self.variogram)
            .finish_non_exhaustive()
    }
}

impl KrigingField {
    /// Assemble and factorize the system for one hour of one variable.
    ///
    /// Requires at least two stations at distinct locations; duplicate
    /// locations and singular systems are diagnosed here so the caller
    /// can drop the hour.
    pub fn build(
        hour: NaiveDateTime,
        coords: Vec<(f64, f64)>,
        values: Vec<f64>,
        variogram: Variogram,
    ) -> TlrResult<Self> {
        let n = coords.len();
        if n < 2 {
            return Err(TlrError::Coverage { hour, stations: n });
        }
        if coords.len() != values.len() {
            return Err(TlrError::DataShape(format!(
                "kriging got {} coordinates but {} values",
                coords.len(),
                values.len()
            )));
        }
        if coords
            .iter()
            .any(|&(x, y)| !x.is_finite() || !y.is_finite())
            || values.iter().any(|v| !v.is_finite())
        {
            return Err(TlrError::Interpolation {
                hour,
                detail: "non-finite station coordinate or value".into(),
            });
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if distance(coords[i], coords[j]) < DUPLICATE_STATION_EPS_M {
                    return Err(TlrError::Interpolation {
                        hour,
                        detail: format!("stations {i} and {j} share the same location"),
                    });
                }
            }
        }

        // Augmented matrix: Γ bordered by ones, zero corner.
        let dim = n + 1;
        let mat = Mat::from_fn(dim, dim, |i, j| {
            if i == n && j == n {
                0.0
            } else if i == n || j == n {
                1.0
            } else {
                variogram.gamma(distance(coords[i], coords[j]))
            }
        });
        let lu = PartialPivLu::new(mat.as_ref());

        let field = Self {
            hour,
            coords,
            values,
            variogram,
            lu,
        };

        // Probe the factorization once: a singular system (e.g. collinear
        // degeneracies) surfaces as a non-finite solution.
        let probe = field.coords[0];
        field.solve_raw(probe.0, probe.1)?;

        Ok(field)
    }

    pub fn hour(&self) -> NaiveDateTime {
        self.hour
    }

    pub fn n_stations(&self) -> usize {
        self.coords.len()
    }

    /// Estimate (mean, std) at a target point.
    pub fn predict(&self, x: f64, y: f64) -> TlrResult<Estimate> {
        // A target on a station is exact: the observed value, zero variance.
        for (i, &coord) in self.coords.iter().enumerate() {
            if distance(coord, (x, y)) < COINCIDENT_TARGET_EPS_M {
                return Ok(Estimate {
                    mean: self.values[i],
                    std: 0.0,
                });
            }
        }

        let (weights, lagrange) = self.solve_raw(x, y)?;

        let mut mean = 0.0;
        let mut variance = lagrange;
        for (i, &w) in weights.iter().enumerate() {
            mean += w * self.values[i];
            variance += w * self.variogram.gamma(distance(self.coords[i], (x, y)));
        }
        if !mean.is_finite() || !variance.is_finite() {
            return Err(TlrError::Interpolation {
                hour: self.hour,
                detail: format!("non-finite estimate at ({x:.1}, {y:.1})"),
            });
        }

        Ok(Estimate {
            mean,
            std: variance.max(0.0).sqrt(),
        })
    }

    /// Interpolation weights at a target (exposed for the unbiasedness
    /// property: they must sum to 1).
    pub fn weights(&self, x: f64, y: f64) -> TlrResult<Vec<f64>> {
        Ok(self.solve_raw(x, y)?.0)
    }

    /// Solve the bordered system for one right-hand side.
    fn solve_raw(&self, x: f64, y: f64) -> TlrResult<(Vec<f64>, f64)> {
        let n = self.coords.len();
        let rhs = Mat::from_fn(n + 1, 1, |i, _| {
            if i == n {
                1.0
            } else {
                self.variogram.gamma(distance(self.coords[i], (x, y)))
            }
        });

        let sol = self.lu.solve(&rhs);
        let weights: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
        let lagrange = sol.read(n, 0);

        if weights.iter().any(|w| !w.is_finite()) || !lagrange.is_finite() {
            return Err(TlrError::Interpolation {
                hour: self.hour,
                detail: "singular kriging system".into(),
            });
        }
        Ok((weights, lagrange))
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
