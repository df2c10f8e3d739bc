//! Boundary validation errors

use crate::geo::GeoError;

/// Input rejected before any state was touched.
///
/// Surfaces to callers as `InvalidInput`; the caller must correct the
/// request and retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid coordinate: {0}")]
    Coordinate(#[from] GeoError),

    #[error("weight `{name}` must be a finite value >= 0 (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("optimization weights must have a positive sum (got {0})")]
    ZeroWeightSum(f64),

    #[error("telemetry field `{field}` is out of range: {value}")]
    TelemetryField { field: &'static str, value: f64 },

    #[error("route id must not be empty")]
    EmptyRouteId,

    #[error("route id must not contain control characters: {0:?}")]
    RouteIdControlChar(String),

    #[error("start and destination must be different waypoints")]
    DegenerateRoute,

    #[error("voyage step must be a finite, non-negative number of hours (got {0})")]
    InvalidStep(f64),
}

/// Reject empty, whitespace-only or control-character route identifiers.
///
/// Route ids become storage key prefixes terminated by a NUL byte.
pub fn validate_route_id(route_id: &str) -> Result<(), ValidationError> {
    if route_id.trim().is_empty() {
        return Err(ValidationError::EmptyRouteId);
    }
    if route_id.chars().any(char::is_control) {
        return Err(ValidationError::RouteIdControlChar(route_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_ids() {
        assert!(validate_route_id("chennai-singapore-01").is_ok());
        assert_eq!(validate_route_id("  "), Err(ValidationError::EmptyRouteId));
        assert!(matches!(
            validate_route_id("a\0b"),
            Err(ValidationError::RouteIdControlChar(_))
        ));
    }
}
