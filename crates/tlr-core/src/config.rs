//! Run configuration for a thermal risk analysis.
//!
//! Replaces module-level constants with one record passed explicitly at
//! construction. Defaults match the reference operating profile; every
//! field can be overridden from a TOML file or CLI flags.

use crate::{RiskBands, TlrError, TlrResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Variogram model used by ordinary kriging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VariogramKind {
    /// γ(h) = c₀ + s·h, fitted by OLS on the experimental variogram
    #[default]
    Linear,
    /// Spherical model with nugget/sill/range
    Spherical,
    /// Exponential model with nugget/sill/range
    Exponential,
}

impl VariogramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariogramKind::Linear => "linear",
            VariogramKind::Spherical => "spherical",
            VariogramKind::Exponential => "exponential",
        }
    }
}

impl FromStr for VariogramKind {
    type Err = TlrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(VariogramKind::Linear),
            "spherical" => Ok(VariogramKind::Spherical),
            "exponential" => Ok(VariogramKind::Exponential),
            other => Err(TlrError::Config(format!(
                "unknown variogram model '{other}'; use linear, spherical, or exponential"
            ))),
        }
    }
}

/// Configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Route discretization step in metres
    pub discretization_step_m: f64,
    /// Monte Carlo iterations per (point, hour)
    pub mc_iterations: usize,
    /// Confidence percentile for the decision temperature (0-100)
    pub confidence_percentile: f64,
    /// Variogram model for kriging
    pub variogram_model: VariogramKind,
    /// Risk classification bands
    pub risk_bands: RiskBands,
    /// Master seed; per-task subseeds derive from (seed, hour, point)
    pub rng_master_seed: u64,
    /// Source CRS EPSG code (geographic)
    pub source_crs: u32,
    /// Target CRS EPSG code (projected, metres)
    pub target_crs: u32,
    /// Worker threads for the point fan-out (0 = auto-detect)
    pub threads: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            discretization_step_m: 1000.0,
            mc_iterations: 10_000,
            confidence_percentile: 90.0,
            variogram_model: VariogramKind::Linear,
            risk_bands: RiskBands::default(),
            rng_master_seed: 42,
            source_crs: 4674,
            target_crs: 5880,
            threads: 0,
        }
    }
}

impl AnalysisConfig {
    /// Validate ranges. Violations are fatal per the error policy.
    pub fn validate(&self) -> TlrResult<()> {
        if !(self.discretization_step_m > 0.0) {
            return Err(TlrError::Config(format!(
                "discretization_step_m must be positive, got {}",
                self.discretization_step_m
            )));
        }
        if self.mc_iterations == 0 {
            return Err(TlrError::Config("mc_iterations must be at least 1".into()));
        }
        if !(self.confidence_percentile > 0.0 && self.confidence_percentile < 100.0) {
            return Err(TlrError::Config(format!(
                "confidence_percentile must be in (0, 100), got {}",
                self.confidence_percentile
            )));
        }
        self.risk_bands.validate()?;
        Ok(())
    }
}
