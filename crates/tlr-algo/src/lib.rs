//! # tlr-algo: Thermal Risk Numerical Core
//!
//! The computation pipeline behind the hourly thermal risk of an overhead
//! conductor:
//!
//! 1. [`geodesy`] projects the route and stations into the working plane
//!    and discretizes the route into equidistant points.
//! 2. [`kriging`] interpolates each meteorological variable per hour,
//!    producing an estimation mean *and* variance at every line point.
//! 3. [`thermal`] solves the CIGRE TB-601 steady-state heat balance for a
//!    given current and ambient state.
//! 4. [`monte_carlo`] draws from the kriging posterior, recomposes wind
//!    from its components, and evaluates the thermal solver per draw.
//! 5. [`risk`] reduces the temperature sample into percentiles, an
//!    exceedance probability, and a classification band.
//! 6. [`workflow`] walks (hour, point), amortizing the kriging system per
//!    hour and fanning points out across rayon workers.
//!
//! All shared state is read-only during the fan-out; every (point, hour)
//! task owns its RNG, sample buffer, and solver scratch.

pub mod geodesy;
pub mod kriging;
pub mod monte_carlo;
pub mod risk;
pub mod roots;
pub mod thermal;
pub mod variogram;
pub mod workflow;

pub use geodesy::PolyconicProjection;
pub use kriging::{Estimate, KrigingField};
pub use monte_carlo::{AmbientDraws, EnvDistributions, McOutcome};
pub use risk::RiskSummary;
pub use thermal::{AmbientState, CigreThermalModel};
pub use variogram::Variogram;
pub use workflow::{ampacity_at, run_analysis, AnalysisInputs, AnalysisOutcome};
