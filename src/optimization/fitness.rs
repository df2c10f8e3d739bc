//! Route decoding and the weighted cost model

use crate::config::{OptimizerConfig, VesselConfig};
use crate::geo::{self, Waypoint};
use crate::hazard::HazardField;
use crate::types::{OptimizationWeights, ScoreBreakdown};

/// Costs of one decoded candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub scores: ScoreBreakdown,
    pub distance_nm: f64,
}

impl Evaluation {
    pub fn fitness(&self) -> f64 {
        self.scores.overall
    }
}

/// A start/destination pair in a fixed hazard landscape.
///
/// Maps particle positions to waypoint lists and scores them. Evaluation is
/// a pure function of the position, so it is safe to call from the rayon
/// pool.
pub struct RouteProblem<'a> {
    start: Waypoint,
    destination: Waypoint,
    direct_nm: f64,
    half_width_nm: f64,
    control_points: usize,
    weights: OptimizationWeights,
    hazard: &'a HazardField,
    config: &'a OptimizerConfig,
}

impl<'a> RouteProblem<'a> {
    pub fn new(
        start: Waypoint,
        destination: Waypoint,
        weights: OptimizationWeights,
        hazard: &'a HazardField,
        config: &'a OptimizerConfig,
    ) -> Self {
        let direct_nm = geo::distance(start, destination);
        let half_width_nm = (config.corridor_ratio * direct_nm)
            .clamp(config.min_corridor_nm, config.max_corridor_nm);
        Self {
            start,
            destination,
            direct_nm,
            half_width_nm,
            control_points: config.control_points,
            weights,
            hazard,
            config,
        }
    }

    /// Corridor half-width W; positions live in [-W, W].
    pub fn half_width_nm(&self) -> f64 {
        self.half_width_nm
    }

    pub fn direct_nm(&self) -> f64 {
        self.direct_nm
    }

    pub fn dimensions(&self) -> usize {
        self.control_points
    }

    pub fn weights(&self) -> &OptimizationWeights {
        &self.weights
    }

    /// Clamp every coordinate into the search box.
    pub fn clamp(&self, position: &mut [f64]) {
        for x in position.iter_mut() {
            *x = if x.is_finite() {
                x.clamp(-self.half_width_nm, self.half_width_nm)
            } else {
                0.0
            };
        }
    }

    /// Waypoints for a position: origin, one per control point, destination.
    pub fn decode(&self, position: &[f64]) -> Vec<Waypoint> {
        let spacing = (position.len() + 1) as f64;
        let mut waypoints = Vec::with_capacity(position.len() + 2);
        waypoints.push(self.start);
        for (i, offset) in position.iter().enumerate() {
            let fraction = (i + 1) as f64 / spacing;
            waypoints.push(geo::corridor_point(self.start, self.destination, fraction, *offset));
        }
        waypoints.push(self.destination);
        waypoints
    }

    pub fn evaluate(&self, position: &[f64]) -> Evaluation {
        self.evaluate_path(&self.decode(position))
    }

    pub fn fitness(&self, position: &[f64]) -> f64 {
        self.evaluate(position).fitness()
    }

    /// Score a decoded path.
    ///
    /// - fuel: distance inflated by rough-water exposure, over the reference distance
    /// - time: mean of relative length and detour ratio
    /// - safety: mean hazard penalty sampled along the legs
    pub fn evaluate_path(&self, waypoints: &[Waypoint]) -> Evaluation {
        let reference = self.config.reference_distance_nm;
        let distance_nm = geo::path_length(waypoints);
        let exposure = self.exposure(waypoints);

        let fuel = (distance_nm * (1.0 + self.config.rough_water_factor * exposure) / reference).min(1.0);
        let deviation = (distance_nm - self.direct_nm).max(0.0) / self.direct_nm.max(1.0);
        let time = ((distance_nm / reference + deviation) / 2.0).min(1.0);

        Evaluation {
            scores: ScoreBreakdown::from_costs(&self.weights, fuel, time, exposure),
            distance_nm,
        }
    }

    /// Mean hazard penalty over `samples_per_leg` midpoints of every leg.
    fn exposure(&self, waypoints: &[Waypoint]) -> f64 {
        let per_leg = self.config.samples_per_leg.max(1);
        let mut total = 0.0;
        let mut count = 0usize;
        for leg in waypoints.windows(2) {
            for k in 0..per_leg {
                let fraction = (k as f64 + 0.5) / per_leg as f64;
                total += self.hazard.penalty_at(geo::intermediate_point(leg[0], leg[1], fraction));
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            (total / count as f64).clamp(0.0, 1.0)
        }
    }
}

/// Voyage estimates for a finished path.
pub fn eta_hours(distance_nm: f64, vessel: &VesselConfig) -> f64 {
    distance_nm / vessel.service_speed_kt
}

/// Bunker estimate: base consumption reduced by the fuel priority.
pub fn fuel_estimate_tons(distance_nm: f64, weights: &OptimizationWeights, vessel: &VesselConfig) -> f64 {
    distance_nm * vessel.base_consumption_t_per_nm * (1.0 - vessel.fuel_efficiency_gain * weights.fuel())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(lat, lon).unwrap()
    }

    fn problem<'a>(hazard: &'a HazardField, config: &'a OptimizerConfig) -> RouteProblem<'a> {
        RouteProblem::new(
            wp(13.0827, 80.2707),
            wp(1.3521, 103.8198),
            OptimizationWeights::default(),
            hazard,
            config,
        )
    }

    #[test]
    fn decode_keeps_endpoints_exact() {
        let hazard = HazardField::new(0.5, false);
        let config = OptimizerConfig::default();
        let p = problem(&hazard, &config);
        let path = p.decode(&vec![25.0; config.control_points]);
        assert_eq!(path.len(), config.control_points + 2);
        assert_eq!(path[0], wp(13.0827, 80.2707));
        assert_eq!(*path.last().unwrap(), wp(1.3521, 103.8198));
    }

    #[test]
    fn straight_path_beats_detour_in_calm_water() {
        let hazard = HazardField::new(0.5, false);
        let config = OptimizerConfig::default();
        let p = problem(&hazard, &config);
        let straight = p.evaluate(&vec![0.0; config.control_points]);
        let detour = p.evaluate(&vec![200.0; config.control_points]);
        assert!(straight.fitness() < detour.fitness());
        assert!((straight.distance_nm - p.direct_nm()).abs() < 1e-6);
        assert_eq!(straight.scores.safety, 0.0);
    }

    #[test]
    fn costs_stay_in_unit_interval() {
        let hazard = HazardField::new(0.5, true).with_baseline(0.95);
        let config = OptimizerConfig::default();
        let p = problem(&hazard, &config);
        let e = p.evaluate(&vec![p.half_width_nm(); config.control_points]);
        for cost in [e.scores.fuel, e.scores.time, e.scores.safety, e.scores.overall] {
            assert!((0.0..=1.0).contains(&cost), "cost {cost} out of range");
        }
    }

    #[test]
    fn corridor_width_is_clamped() {
        let hazard = HazardField::new(0.5, false);
        let config = OptimizerConfig::default();
        let short = RouteProblem::new(wp(0.0, 0.0), wp(0.0, 0.5), OptimizationWeights::default(), &hazard, &config);
        assert_eq!(short.half_width_nm(), config.min_corridor_nm);
        let long = RouteProblem::new(wp(0.0, 0.0), wp(0.0, 170.0), OptimizationWeights::default(), &hazard, &config);
        assert_eq!(long.half_width_nm(), config.max_corridor_nm);
    }

    #[test]
    fn fuel_priority_reduces_estimate() {
        let vessel = VesselConfig::default();
        let balanced = fuel_estimate_tons(1000.0, &OptimizationWeights::default(), &vessel);
        let frugal = fuel_estimate_tons(1000.0, &OptimizationWeights::new(1.0, 0.0, 0.0).unwrap(), &vessel);
        assert!(frugal < balanced);
        assert!((frugal - 350.0).abs() < 1e-9);
        assert!((eta_hours(1500.0, &vessel) - 100.0).abs() < 1e-12);
    }
}
