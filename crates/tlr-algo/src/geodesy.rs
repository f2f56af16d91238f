//! Geographic projection and route discretization.
//!
//! Station and route coordinates arrive geographic (SIRGAS 2000,
//! EPSG:4674) and every distance the interpolator sees must be Euclidean
//! metres, so both are pushed through the Brazil Polyconic projection
//! (EPSG:5880) before any kriging happens.
//!
//! The forward ellipsoidal polyconic follows Snyder, "Map Projections: A
//! Working Manual" (USGS PP 1395), eq. 18-12..18-15, on the GRS80
//! ellipsoid. Only the forward direction is needed.

use tlr_core::{Degrees, LinePoint, PointId, RouteVertex, StationSet, TlrError, TlrResult};

/// GRS80 semi-major axis (m)
const GRS80_A: f64 = 6_378_137.0;
/// GRS80 first eccentricity squared
const GRS80_E2: f64 = 0.006_694_380_022_90;

/// Brazil Polyconic projection parameters (EPSG:5880)
#[derive(Debug, Clone)]
pub struct PolyconicProjection {
    /// Semi-major axis (m)
    a: f64,
    /// First eccentricity squared
    e2: f64,
    /// Central meridian (radians)
    lon0: f64,
    /// False easting (m)
    false_easting: f64,
    /// False northing (m)
    false_northing: f64,
    /// Meridian arc at the latitude of origin
    m0: f64,
}

impl PolyconicProjection {
    /// EPSG:5880 — Brazil Polyconic on GRS80: natural origin (0°, -54°),
    /// false easting 5 000 000 m, false northing 10 000 000 m.
    pub fn brazil_polyconic() -> Self {
        let mut proj = Self {
            a: GRS80_A,
            e2: GRS80_E2,
            lon0: (-54.0f64).to_radians(),
            false_easting: 5_000_000.0,
            false_northing: 10_000_000.0,
            m0: 0.0,
        };
        proj.m0 = proj.meridian_arc(0.0);
        proj
    }

    /// Build the projection for a configured CRS pair. Only the
    /// SIRGAS 2000 → Brazil Polyconic pair is supported.
    pub fn for_epsg(source: u32, target: u32) -> TlrResult<Self> {
        match (source, target) {
            (4674, 5880) => Ok(Self::brazil_polyconic()),
            _ => Err(TlrError::Config(format!(
                "unsupported CRS pair {source} -> {target}; only 4674 -> 5880 is available"
            ))),
        }
    }

    /// Meridian arc length from the equator (Snyder eq. 3-21)
    fn meridian_arc(&self, lat: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }

    /// Forward projection: geographic degrees to projected metres.
    pub fn project(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();

        if lat.abs() < 1e-12 {
            // Equator degenerates to the rectilinear case
            let x = self.a * (lon - self.lon0) + self.false_easting;
            let y = -self.m0 + self.false_northing;
            return (x, y);
        }

        let sin_lat = lat.sin();
        let n = self.a / (1.0 - self.e2 * sin_lat * sin_lat).sqrt();
        let cot_lat = lat.cos() / sin_lat;
        let e = (lon - self.lon0) * sin_lat;

        let x = n * cot_lat * e.sin() + self.false_easting;
        let y = self.meridian_arc(lat) - self.m0
            + n * cot_lat * (1.0 - e.cos())
            + self.false_northing;
        (x, y)
    }

    /// Fill in projected coordinates for every station in the set.
    pub fn project_stations(&self, stations: &mut StationSet) {
        for station in stations.stations_mut() {
            let (x, y) = self.project(station.lat_deg, station.lon_deg);
            station.x_m = x;
            station.y_m = y;
        }
    }
}

/// Discretize a route polyline into points spaced at `step_m`.
///
/// The first and last route points are always emitted; the step is a
/// target and the final segment may be shorter. Coordinates interpolate
/// linearly along each vertex chord; the azimuth is taken from the
/// segment containing the point.
pub fn discretize_route(
    vertices: &[RouteVertex],
    projection: &PolyconicProjection,
    step_m: f64,
) -> TlrResult<Vec<LinePoint>> {
    if vertices.len() < 2 {
        return Err(TlrError::DataShape(format!(
            "route needs at least 2 vertices, got {}",
            vertices.len()
        )));
    }
    if !(step_m > 0.0) {
        return Err(TlrError::Config(format!(
            "discretization step must be positive, got {step_m}"
        )));
    }
    for pair in vertices.windows(2) {
        if pair[1].progressive_m <= pair[0].progressive_m {
            return Err(TlrError::DataShape(format!(
                "route progressives must be strictly increasing ({} then {})",
                pair[0].progressive_m, pair[1].progressive_m
            )));
        }
    }

    let projected: Vec<(f64, f64)> = vertices
        .iter()
        .map(|v| projection.project(v.lat_deg, v.lon_deg))
        .collect();

    let start = vertices[0].progressive_m;
    let total = vertices.last().expect("checked above").progressive_m;

    // Target progressives: start, start+step, ..., plus the endpoint.
    let mut targets = Vec::new();
    let mut s = start;
    while s < total {
        targets.push(s);
        s += step_m;
    }
    targets.push(total);

    let mut points = Vec::with_capacity(targets.len());
    let mut segment = 0usize;
    for (idx, &target) in targets.iter().enumerate() {
        while segment + 2 < vertices.len() && vertices[segment + 1].progressive_m <= target {
            segment += 1;
        }
        let v0 = &vertices[segment];
        let v1 = &vertices[segment + 1];
        let (x0, y0) = projected[segment];
        let (x1, y1) = projected[segment + 1];
        let t = (target - v0.progressive_m) / (v1.progressive_m - v0.progressive_m);

        points.push(LinePoint {
            id: PointId::new(idx),
            progressive_m: target,
            x_m: x0 + t * (x1 - x0),
            y_m: y0 + t * (y1 - y0),
            azimuth: Degrees(v0.azimuth.value().rem_euclid(360.0)),
        });
    }

    Ok(points)
}
