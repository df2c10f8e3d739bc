//! Hazard Model
//!
//! Converts telemetry into breach decisions and a spatial penalty surface.
//!
//! - `is_breach()` - does a sample exceed any configured threshold?
//! - `severity()` - scalar risk of a sample in [0, 1]
//! - `ingest()` - derive the next [`HazardField`] from a breaching sample
//!
//! All operations are pure; the supervisor owns the current field and
//! replaces it atomically after each ingest.

mod field;

pub use field::{CellKey, HazardField};

use crate::config::HazardConfig;
use crate::geo::{self, Waypoint};
use crate::types::TelemetrySample;

/// Penalties are stamped out to this many decay radii.
const STAMP_RADII: f64 = 3.0;

/// Nautical miles per degree of latitude.
const NM_PER_DEGREE: f64 = 60.0;

/// Threshold checks and field updates driven by `HazardConfig`.
#[derive(Debug, Clone)]
pub struct HazardModel {
    config: HazardConfig,
}

impl HazardModel {
    pub fn new(config: HazardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HazardConfig {
        &self.config
    }

    /// An empty field shaped by this model's grid and climatology settings.
    pub fn empty_field(&self) -> HazardField {
        HazardField::new(self.config.cell_size_deg, self.config.climatology)
    }

    /// True when any configured threshold is exceeded.
    ///
    /// Wave, wind and current breach when strictly above their threshold;
    /// visibility breaches when strictly below.
    pub fn is_breach(&self, sample: &TelemetrySample) -> bool {
        let c = &self.config;
        sample.wave_height_m() > c.wave_height_threshold_m
            || c.wind_speed_threshold_kt.is_some_and(|t| sample.wind_speed_kt() > t)
            || c.visibility_threshold_nm.is_some_and(|t| sample.visibility_nm() < t)
            || c.current_threshold_kt.is_some_and(|t| sample.current_kt() > t)
    }

    /// Risk score in [0, 1]: mean of normalized wave height and wind speed.
    pub fn severity(&self, sample: &TelemetrySample) -> f64 {
        let wave = sample.wave_height_m() / self.config.wave_severity_scale_m;
        let wind = sample.wind_speed_kt() / self.config.wind_severity_scale_kt;
        let score = (wave + wind) / 2.0;
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Derive the next field from `field` and a breaching sample.
    ///
    /// The existing field decays first. The sample's own position is
    /// preferred over `position_estimate`; with neither, the severity raises
    /// the global baseline instead of a local stamp.
    pub fn ingest(
        &self,
        field: &HazardField,
        sample: &TelemetrySample,
        position_estimate: Option<Waypoint>,
    ) -> HazardField {
        let severity = self.severity(sample);
        let mut next = field.decayed(self.config.field_decay);

        match sample.position().or(position_estimate) {
            Some(center) => self.stamp(&mut next, center, severity),
            None => next.raise_baseline(self.config.baseline_factor * severity),
        }
        next
    }

    /// Add a Gaussian penalty bump of height `severity` around `center`.
    fn stamp(&self, field: &mut HazardField, center: Waypoint, severity: f64) {
        let radius = self.config.decay_radius_nm;
        let reach_nm = STAMP_RADII * radius;
        let cell = field.cell_size_deg();

        let dlat = reach_nm / NM_PER_DEGREE;
        let cos_lat = center.latitude().to_radians().cos();
        let dlon = if cos_lat * 180.0 > dlat { dlat / cos_lat } else { 180.0 };

        let row_lo = ((center.latitude() - dlat).max(-90.0) / cell).floor() as i32;
        let row_hi = ((center.latitude() + dlat).min(90.0) / cell).floor() as i32;
        let (col_lo, col_hi) = if dlon >= 180.0 {
            ((-180.0 / cell).floor() as i32, (180.0 / cell).floor() as i32)
        } else {
            (
                ((center.longitude() - dlon) / cell).floor() as i32,
                ((center.longitude() + dlon) / cell).floor() as i32,
            )
        };

        // Collect per-cell maxima first so wrapped duplicates stamp once
        let mut bumps: std::collections::BTreeMap<CellKey, f64> = std::collections::BTreeMap::new();
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                let centre = field.cell_center((row, col));
                let d = geo::distance(center, centre);
                if d > reach_nm {
                    continue;
                }
                let bump = severity * (-(d * d) / (2.0 * radius * radius)).exp();
                let key = field.cell_of(centre);
                let slot = bumps.entry(key).or_insert(0.0);
                *slot = slot.max(bump);
            }
        }
        for (key, bump) in bumps {
            field.merge_cell(key, bump);
        }
    }
}
