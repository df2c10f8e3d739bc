//! Environmental telemetry sample

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ValidationError, Waypoint};

/// Lowest accepted air/sea temperature (C)
pub const MIN_TEMPERATURE_C: f64 = -60.0;
/// Highest accepted air/sea temperature (C)
pub const MAX_TEMPERATURE_C: f64 = 60.0;

/// One environmental reading pushed by the telemetry source.
///
/// All measurements are finite; wave height, wind, current and visibility
/// are non-negative and temperature lies in [-60, 60] C. Fields are private
/// so a sample can only exist in validated form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTelemetrySample")]
pub struct TelemetrySample {
    timestamp: DateTime<Utc>,
    wave_height_m: f64,
    wind_speed_kt: f64,
    current_kt: f64,
    visibility_nm: f64,
    temperature_c: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<Waypoint>,
}

/// Wire form; the short aliases match the field names of the legacy
/// telemetry simulator feed.
#[derive(Deserialize)]
struct RawTelemetrySample {
    timestamp: DateTime<Utc>,
    #[serde(alias = "wave_height")]
    wave_height_m: f64,
    #[serde(alias = "wind_speed")]
    wind_speed_kt: f64,
    #[serde(alias = "current_speed")]
    current_kt: f64,
    #[serde(alias = "visibility")]
    visibility_nm: f64,
    #[serde(alias = "temperature")]
    temperature_c: f64,
    #[serde(default)]
    position: Option<Waypoint>,
}

impl TryFrom<RawTelemetrySample> for TelemetrySample {
    type Error = ValidationError;

    fn try_from(raw: RawTelemetrySample) -> Result<Self, Self::Error> {
        let sample = Self::new(
            raw.timestamp,
            raw.wave_height_m,
            raw.wind_speed_kt,
            raw.current_kt,
            raw.visibility_nm,
            raw.temperature_c,
        )?;
        Ok(match raw.position {
            Some(position) => sample.with_position(position),
            None => sample,
        })
    }
}

impl TelemetrySample {
    /// Validate and build a sample without a position fix.
    pub fn new(
        timestamp: DateTime<Utc>,
        wave_height_m: f64,
        wind_speed_kt: f64,
        current_kt: f64,
        visibility_nm: f64,
        temperature_c: f64,
    ) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("wave_height_m", wave_height_m),
            ("wind_speed_kt", wind_speed_kt),
            ("current_kt", current_kt),
            ("visibility_nm", visibility_nm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::TelemetryField { field, value });
            }
        }
        if !temperature_c.is_finite() || !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&temperature_c) {
            return Err(ValidationError::TelemetryField {
                field: "temperature_c",
                value: temperature_c,
            });
        }

        Ok(Self {
            timestamp,
            wave_height_m,
            wind_speed_kt,
            current_kt,
            visibility_nm,
            temperature_c,
            position: None,
        })
    }

    /// Attach the vessel's position fix at the time of the reading.
    pub fn with_position(mut self, position: Waypoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn wave_height_m(&self) -> f64 {
        self.wave_height_m
    }

    pub fn wind_speed_kt(&self) -> f64 {
        self.wind_speed_kt
    }

    pub fn current_kt(&self) -> f64 {
        self.current_kt
    }

    pub fn visibility_nm(&self) -> f64 {
        self.visibility_nm
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    pub fn position(&self) -> Option<Waypoint> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn accepts_calm_conditions() {
        let sample = TelemetrySample::new(ts(), 2.5, 20.0, 1.0, 10.0, 25.0).unwrap();
        assert_eq!(sample.wave_height_m(), 2.5);
        assert!(sample.position().is_none());
    }

    #[test]
    fn rejects_negative_and_nan_fields() {
        assert!(matches!(
            TelemetrySample::new(ts(), -0.1, 20.0, 1.0, 10.0, 25.0),
            Err(ValidationError::TelemetryField { field: "wave_height_m", .. })
        ));
        assert!(matches!(
            TelemetrySample::new(ts(), 1.0, f64::NAN, 1.0, 10.0, 25.0),
            Err(ValidationError::TelemetryField { field: "wind_speed_kt", .. })
        ));
        assert!(matches!(
            TelemetrySample::new(ts(), 1.0, 20.0, 1.0, 10.0, 75.0),
            Err(ValidationError::TelemetryField { field: "temperature_c", .. })
        ));
    }

    #[test]
    fn json_round_trip_with_position() {
        let json = r#"{
            "timestamp": "2025-03-01T06:00:00Z",
            "wave_height_m": 5.2,
            "wind_speed_kt": 45.0,
            "current_kt": 2.5,
            "visibility_nm": 3.0,
            "temperature_c": 24.0,
            "position": {"latitude": 8.5, "longitude": 90.0}
        }"#;
        let sample: TelemetrySample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.timestamp(), ts());
        assert_eq!(sample.position().unwrap().latitude(), 8.5);

        let again: TelemetrySample =
            serde_json::from_str(&serde_json::to_string(&sample).unwrap()).unwrap();
        assert_eq!(again, sample);
    }

    #[test]
    fn json_validation_rejects_bad_values() {
        let json = r#"{
            "timestamp": "2025-03-01T06:00:00Z",
            "wave_height_m": -1.0,
            "wind_speed_kt": 10.0,
            "current_kt": 1.0,
            "visibility_nm": 3.0,
            "temperature_c": 24.0
        }"#;
        assert!(serde_json::from_str::<TelemetrySample>(json).is_err());
    }

    #[test]
    fn legacy_field_names_accepted() {
        let json = r#"{
            "timestamp": "2025-03-01T06:00:00Z",
            "wave_height": 2.41,
            "wind_speed": 18.7,
            "current_speed": 0.9,
            "visibility": 11.2,
            "temperature": 25.3
        }"#;
        let sample: TelemetrySample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.wave_height_m(), 2.41);
        assert_eq!(sample.current_kt(), 0.9);
    }
}
