//! GeoMath Module
//!
//! Great-circle geometry used by path construction and the optimizer's cost
//! functions. Everything here is a pure function over validated
//! [`Waypoint`]s: distances are nautical miles on a sphere of radius
//! 3440 nm, angles are degrees at the API boundary.
//!
//! - `distance()` - haversine distance
//! - `initial_bearing()` - forward azimuth from one point to another
//! - `intermediate_point()` - point at a fraction of the great circle
//! - `destination_point()` - point reached along a bearing
//! - `corridor_point()` - point offset laterally from the great circle
//! - `interpolate_curve()` - smooth seed path between two waypoints

mod waypoint;

pub use waypoint::{GeoError, Waypoint};

use std::f64::consts::PI;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.0;

/// Lateral bulge of [`interpolate_curve`] as a fraction of the direct distance.
pub const CURVE_BULGE_RATIO: f64 = 0.05;

/// Angular distances below this are treated as coincident points (radians).
const COINCIDENT_EPSILON: f64 = 1e-12;

// ============================================================================
// Distance & Bearing
// ============================================================================

/// Haversine great-circle distance in nautical miles.
///
/// Symmetric, and zero exactly when `a == b`.
pub fn distance(a: Waypoint, b: Waypoint) -> f64 {
    if a == b {
        return 0.0;
    }
    EARTH_RADIUS_NM * angular_distance(a, b)
}

fn angular_distance(a: Waypoint, b: Waypoint) -> f64 {
    let (lat1, lon1) = a.radians();
    let (lat2, lon2) = b.radians();
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Total length of a polyline in nautical miles.
pub fn path_length(waypoints: &[Waypoint]) -> f64 {
    waypoints.windows(2).map(|leg| distance(leg[0], leg[1])).sum()
}

/// Initial bearing (forward azimuth) from `a` towards `b`, degrees in [0, 360).
pub fn initial_bearing(a: Waypoint, b: Waypoint) -> f64 {
    let (lat1, lon1) = a.radians();
    let (lat2, lon2) = b.radians();
    let dlon = lon2 - lon1;

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

// ============================================================================
// Interpolation
// ============================================================================

/// Point at `fraction` (0 = `a`, 1 = `b`) along the great circle from `a` to `b`.
///
/// Endpoints are returned exactly for fractions 0 and 1. Antipodal pairs,
/// where the great circle is undefined, fall back to linear interpolation.
pub fn intermediate_point(a: Waypoint, b: Waypoint, fraction: f64) -> Waypoint {
    if fraction <= 0.0 {
        return a;
    }
    if fraction >= 1.0 {
        return b;
    }

    let delta = angular_distance(a, b);
    if delta < COINCIDENT_EPSILON {
        return a;
    }
    let sin_delta = delta.sin();
    if sin_delta.abs() < COINCIDENT_EPSILON {
        let lat = a.latitude() + (b.latitude() - a.latitude()) * fraction;
        let lon = a.longitude() + (b.longitude() - a.longitude()) * fraction;
        return Waypoint::from_radians(lat.to_radians(), lon.to_radians());
    }

    let (lat1, lon1) = a.radians();
    let (lat2, lon2) = b.radians();
    let wa = ((1.0 - fraction) * delta).sin() / sin_delta;
    let wb = (fraction * delta).sin() / sin_delta;

    let x = wa * lat1.cos() * lon1.cos() + wb * lat2.cos() * lon2.cos();
    let y = wa * lat1.cos() * lon1.sin() + wb * lat2.cos() * lon2.sin();
    let z = wa * lat1.sin() + wb * lat2.sin();

    Waypoint::from_radians(z.atan2((x * x + y * y).sqrt()), y.atan2(x))
}

/// Point reached from `origin` after `distance_nm` along `bearing_deg`.
pub fn destination_point(origin: Waypoint, bearing_deg: f64, distance_nm: f64) -> Waypoint {
    if distance_nm == 0.0 {
        return origin;
    }
    let (lat1, lon1) = origin.radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_nm / EARTH_RADIUS_NM;

    let sin_lat2 = lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    Waypoint::from_radians(lat2, lon2)
}

/// Point at `fraction` along the start→dest great circle, pushed
/// `offset_nm` to starboard (negative = port) of the local track.
pub fn corridor_point(start: Waypoint, dest: Waypoint, fraction: f64, offset_nm: f64) -> Waypoint {
    let base = intermediate_point(start, dest, fraction);
    if offset_nm == 0.0 {
        return base;
    }
    let track = if base == dest {
        initial_bearing(start, dest)
    } else {
        initial_bearing(base, dest)
    };
    destination_point(base, track + 90.0, offset_nm)
}

/// Sinusoidal lateral offsets for `interior` evenly spaced control points.
///
/// Point `i` (1-based) sits at fraction `i / (interior + 1)` and is offset by
/// `amplitude * sin(pi * fraction)`, so the shape is zero at both ends and
/// peaks mid-route.
pub fn lateral_profile(interior: usize, amplitude: f64) -> Vec<f64> {
    let spacing = (interior + 1) as f64;
    (1..=interior)
        .map(|i| amplitude * (PI * i as f64 / spacing).sin())
        .collect()
}

/// Smooth seed path from `start` to `dest` with `n` segments.
///
/// Returns `n + 1` waypoints; the first and last are exactly `start` and
/// `dest`. Interior points follow [`lateral_profile`] with a bulge of
/// [`CURVE_BULGE_RATIO`] times the direct distance.
pub fn interpolate_curve(start: Waypoint, dest: Waypoint, n: usize) -> Result<Vec<Waypoint>, GeoError> {
    if n == 0 {
        return Err(GeoError::EmptyCurve);
    }
    let amplitude = CURVE_BULGE_RATIO * distance(start, dest);
    let offsets = lateral_profile(n - 1, amplitude);

    let mut path = Vec::with_capacity(n + 1);
    path.push(start);
    for (i, offset) in offsets.iter().enumerate() {
        let fraction = (i + 1) as f64 / n as f64;
        path.push(corridor_point(start, dest, fraction, *offset));
    }
    path.push(dest);
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(lat, lon).unwrap()
    }

    fn chennai() -> Waypoint {
        wp(13.0827, 80.2707)
    }

    fn singapore() -> Waypoint {
        wp(1.3521, 103.8198)
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_identity() {
        let a = chennai();
        let b = singapore();
        assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
        assert_eq!(distance(a, a), 0.0);
        assert!(distance(a, b) > 0.0);
    }

    #[test]
    fn chennai_singapore_distance_is_plausible() {
        // Published great-circle distance is roughly 1,560 nm
        let d = distance(chennai(), singapore());
        assert!((1500.0..1650.0).contains(&d), "unexpected distance {d}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_sixty_nm() {
        let d = distance(wp(0.0, 0.0), wp(1.0, 0.0));
        assert!((d - 60.04).abs() < 0.1, "got {d}");
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = wp(0.0, 0.0);
        assert!((initial_bearing(origin, wp(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((initial_bearing(origin, wp(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((initial_bearing(origin, wp(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((initial_bearing(origin, wp(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn intermediate_point_midpoint_splits_distance() {
        let a = chennai();
        let b = singapore();
        let mid = intermediate_point(a, b, 0.5);
        let total = distance(a, b);
        assert!((distance(a, mid) - total / 2.0).abs() < 1e-6);
        assert!((distance(mid, b) - total / 2.0).abs() < 1e-6);
        assert_eq!(intermediate_point(a, b, 0.0), a);
        assert_eq!(intermediate_point(a, b, 1.0), b);
    }

    #[test]
    fn destination_point_travels_requested_distance() {
        let origin = chennai();
        let reached = destination_point(origin, 135.0, 250.0);
        assert!((distance(origin, reached) - 250.0).abs() < 1e-6);
        assert!((initial_bearing(origin, reached) - 135.0).abs() < 1e-6);
    }

    #[test]
    fn corridor_point_offsets_perpendicular_to_track() {
        let start = wp(0.0, 0.0);
        let dest = wp(0.0, 10.0);
        // Heading east, starboard is south
        let p = corridor_point(start, dest, 0.5, 60.0);
        assert!(p.latitude() < -0.9 && p.latitude() > -1.1, "got {p}");
        assert!((p.longitude() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn interpolate_curve_keeps_endpoints_exact() {
        let start = chennai();
        let dest = singapore();
        let curve = interpolate_curve(start, dest, 8).unwrap();
        assert_eq!(curve.len(), 9);
        assert_eq!(curve[0], start);
        assert_eq!(curve[8], dest);
        // The bulge makes the curve longer than the direct route
        assert!(path_length(&curve) > distance(start, dest));
    }

    #[test]
    fn interpolate_curve_rejects_zero_segments() {
        assert_eq!(
            interpolate_curve(chennai(), singapore(), 0),
            Err(GeoError::EmptyCurve)
        );
    }

    #[test]
    fn lateral_profile_peaks_mid_route() {
        let profile = lateral_profile(5, 10.0);
        assert_eq!(profile.len(), 5);
        assert!((profile[2] - 10.0).abs() < 1e-12);
        assert!(profile[0] < profile[1] && profile[1] < profile[2]);
        assert!((profile[0] - profile[4]).abs() < 1e-12);
    }
}
