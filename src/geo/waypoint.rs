//! Validated geographic position

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised by coordinate validation and curve construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("latitude {0} is not a finite value in [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} is not a finite value in [-180, 180]")]
    InvalidLongitude(f64),

    #[error("curve interpolation needs at least one segment")]
    EmptyCurve,
}

/// A point on the Earth's surface in decimal degrees.
///
/// Construction goes through [`Waypoint::new`], which rejects NaN, infinite
/// and out-of-range values. Positions that denote the same physical point
/// are stored identically: longitude `180` becomes `-180`, and the poles
/// carry longitude `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWaypoint")]
pub struct Waypoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawWaypoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawWaypoint> for Waypoint {
    type Error = GeoError;

    fn try_from(raw: RawWaypoint) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Waypoint {
    /// Create a waypoint, validating both coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self::canonical(latitude, longitude))
    }

    /// Build from radians produced by spherical trigonometry.
    ///
    /// Latitude is clamped and longitude wrapped into range, so results of
    /// floating-point drift never fail validation.
    pub(crate) fn from_radians(phi: f64, lambda: f64) -> Self {
        let latitude = phi.to_degrees().clamp(-90.0, 90.0);
        let longitude = wrap_longitude(lambda.to_degrees());
        Self::canonical(latitude, longitude)
    }

    fn canonical(latitude: f64, longitude: f64) -> Self {
        // -0.0 normalises to 0.0 so serialized output is stable
        let latitude = latitude + 0.0;
        let longitude = if latitude.abs() == 90.0 {
            0.0
        } else if longitude == 180.0 {
            -180.0
        } else {
            longitude + 0.0
        };
        Self { latitude, longitude }
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub(crate) fn radians(&self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Wrap a longitude into [-180, 180).
fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped.is_finite() {
        wrapped
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert_eq!(Waypoint::new(91.0, 0.0), Err(GeoError::InvalidLatitude(91.0)));
        assert_eq!(
            Waypoint::new(0.0, -180.5),
            Err(GeoError::InvalidLongitude(-180.5))
        );
        assert!(Waypoint::new(f64::NAN, 0.0).is_err());
        assert!(Waypoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn canonicalises_antimeridian_and_poles() {
        let east = Waypoint::new(10.0, 180.0).unwrap();
        let west = Waypoint::new(10.0, -180.0).unwrap();
        assert_eq!(east, west);

        let pole_a = Waypoint::new(90.0, 45.0).unwrap();
        let pole_b = Waypoint::new(90.0, -120.0).unwrap();
        assert_eq!(pole_a, pole_b);
    }

    #[test]
    fn deserialization_validates() {
        let ok: Waypoint = serde_json::from_str(r#"{"latitude": 13.08, "longitude": 80.27}"#).unwrap();
        assert_eq!(ok.latitude(), 13.08);

        let bad = serde_json::from_str::<Waypoint>(r#"{"latitude": 120.0, "longitude": 0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn wraps_longitudes() {
        assert!((wrap_longitude(190.0) - (-170.0)).abs() < 1e-12);
        assert!((wrap_longitude(-190.0) - 170.0).abs() < 1e-12);
        assert!((wrap_longitude(45.0) - 45.0).abs() < 1e-12);
    }
}
