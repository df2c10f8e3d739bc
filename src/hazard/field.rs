//! Gridded hazard penalty surface

use std::collections::BTreeMap;

use crate::config::defaults;
use crate::geo::Waypoint;

/// Grid cell index: (latitude row, longitude column).
pub type CellKey = (i32, i32);

/// Scalar hazard penalty over the ocean surface.
///
/// Penalties live on a regular latitude/longitude grid; every value is in
/// [0, 1]. A field is never mutated once shared: ingestion builds a new
/// field and the supervisor swaps its `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardField {
    cell_size_deg: f64,
    cells: BTreeMap<CellKey, f64>,
    baseline: f64,
    climatology: bool,
    generation: u64,
}

impl HazardField {
    /// An empty field: zero baseline, no cells.
    pub fn new(cell_size_deg: f64, climatology: bool) -> Self {
        let cell_size_deg = if cell_size_deg.is_finite() && cell_size_deg > 0.0 {
            cell_size_deg
        } else {
            defaults::HAZARD_CELL_SIZE_DEG
        };
        Self {
            cell_size_deg,
            cells: BTreeMap::new(),
            baseline: 0.0,
            climatology,
            generation: 0,
        }
    }

    /// Penalty at a point: `min(1, baseline + climatology + cell)`.
    pub fn penalty_at(&self, waypoint: Waypoint) -> f64 {
        let cell = self.cells.get(&self.cell_of(waypoint)).copied().unwrap_or(0.0);
        (self.baseline + self.climatology_at(waypoint) + cell).min(1.0)
    }

    /// Static climatology penalty: tropical cyclone band and polar waters.
    pub fn climatology_at(&self, waypoint: Waypoint) -> f64 {
        if !self.climatology {
            return 0.0;
        }
        let lat = waypoint.latitude().abs();
        if lat <= defaults::TROPICAL_BAND_LATITUDE {
            defaults::TROPICAL_BAND_PENALTY
        } else if lat > defaults::POLAR_LATITUDE {
            defaults::POLAR_PENALTY
        } else {
            0.0
        }
    }

    pub fn cell_of(&self, waypoint: Waypoint) -> CellKey {
        let row = (waypoint.latitude() / self.cell_size_deg).floor() as i32;
        let col = (waypoint.longitude() / self.cell_size_deg).floor() as i32;
        (row, col)
    }

    /// Penalty stored for a single cell (excluding baseline and climatology).
    pub fn cell_penalty(&self, key: CellKey) -> f64 {
        self.cells.get(&key).copied().unwrap_or(0.0)
    }

    pub fn cell_size_deg(&self) -> f64 {
        self.cell_size_deg
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Highest single-cell penalty, 0 for an empty grid.
    pub fn peak_cell_penalty(&self) -> f64 {
        self.cells.values().copied().fold(0.0, f64::max)
    }

    /// Number of ingests that produced this field.
    ///
    /// Two fields with equal generation derived from the same origin
    /// describe the same landscape.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Set a cell penalty directly (clamped to [0, 1]).
    pub fn with_cell_penalty(mut self, waypoint: Waypoint, penalty: f64) -> Self {
        let key = self.cell_of(waypoint);
        self.set_cell(key, penalty);
        self
    }

    /// Set the global baseline (clamped to [0, 1]).
    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = clamp_unit(baseline);
        self
    }

    // ========================================================================
    // Derivation helpers used by `HazardModel::ingest`
    // ========================================================================

    /// Copy with every cell and the baseline multiplied by `factor`.
    ///
    /// Cells that fall below the minimum penalty are dropped.
    pub(crate) fn decayed(&self, factor: f64) -> Self {
        let factor = clamp_unit(factor);
        let cells = self
            .cells
            .iter()
            .map(|(k, v)| (*k, v * factor))
            .filter(|(_, v)| *v >= defaults::HAZARD_MIN_CELL_PENALTY)
            .collect();
        Self {
            cell_size_deg: self.cell_size_deg,
            cells,
            baseline: self.baseline * factor,
            climatology: self.climatology,
            generation: self.generation + 1,
        }
    }

    /// Combine `penalty` into a cell as a probabilistic union, keeping [0, 1].
    pub(crate) fn merge_cell(&mut self, key: CellKey, penalty: f64) {
        let current = self.cell_penalty(key);
        self.set_cell(key, union(current, penalty));
    }

    pub(crate) fn raise_baseline(&mut self, amount: f64) {
        self.baseline = union(self.baseline, amount);
    }

    /// Centre of a cell, wrapped onto the globe.
    pub(crate) fn cell_center(&self, key: CellKey) -> Waypoint {
        let lat = (key.0 as f64 + 0.5) * self.cell_size_deg;
        let lon = (key.1 as f64 + 0.5) * self.cell_size_deg;
        Waypoint::from_radians(lat.to_radians(), lon.to_radians())
    }

    fn set_cell(&mut self, key: CellKey, penalty: f64) {
        let penalty = clamp_unit(penalty);
        if penalty < defaults::HAZARD_MIN_CELL_PENALTY {
            self.cells.remove(&key);
        } else {
            self.cells.insert(key, penalty);
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn union(a: f64, b: f64) -> f64 {
    let a = clamp_unit(a);
    let b = clamp_unit(b);
    1.0 - (1.0 - a) * (1.0 - b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(lat, lon).unwrap()
    }

    #[test]
    fn empty_field_only_has_climatology() {
        let field = HazardField::new(0.5, true);
        assert_eq!(field.penalty_at(wp(30.0, 40.0)), 0.0);
        assert_eq!(field.penalty_at(wp(5.0, 90.0)), 0.1);
        assert_eq!(field.penalty_at(wp(-70.0, 10.0)), 0.2);

        let plain = HazardField::new(0.5, false);
        assert_eq!(plain.penalty_at(wp(5.0, 90.0)), 0.0);
    }

    #[test]
    fn penalty_is_capped_at_one() {
        let field = HazardField::new(1.0, true)
            .with_baseline(0.6)
            .with_cell_penalty(wp(5.2, 90.3), 0.9);
        assert_eq!(field.penalty_at(wp(5.7, 90.8)), 1.0);
        // Different cell, only baseline + tropical band
        assert!((field.penalty_at(wp(7.5, 95.5)) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn decay_drops_faint_cells() {
        let field = HazardField::new(0.5, false)
            .with_cell_penalty(wp(20.0, 20.0), 0.5)
            .with_cell_penalty(wp(30.0, 30.0), 0.002);
        let decayed = field.decayed(0.4);
        assert_eq!(decayed.cell_count(), 1);
        assert!((decayed.penalty_at(wp(20.1, 20.1)) - 0.2).abs() < 1e-12);
        assert_eq!(decayed.generation(), field.generation() + 1);
        // Original untouched
        assert_eq!(field.cell_count(), 2);
    }

    #[test]
    fn merge_is_bounded_union() {
        let mut field = HazardField::new(0.5, false);
        let key = field.cell_of(wp(10.0, 10.0));
        field.merge_cell(key, 0.5);
        field.merge_cell(key, 0.5);
        assert!((field.cell_penalty(key) - 0.75).abs() < 1e-12);
        field.merge_cell(key, 1.0);
        assert_eq!(field.cell_penalty(key), 1.0);
    }

    #[test]
    fn cell_center_round_trips_to_same_cell() {
        let field = HazardField::new(0.5, false);
        for (lat, lon) in [(13.08, 80.27), (-33.9, 151.2), (0.0, -179.9), (59.9, 179.9)] {
            let key = field.cell_of(wp(lat, lon));
            assert_eq!(field.cell_of(field.cell_center(key)), key);
        }
    }
}
