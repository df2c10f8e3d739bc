//! Planned route produced by the optimizer

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{OptimizationWeights, Waypoint};

// ============================================================================
// Score Breakdown
// ============================================================================

/// Normalized per-objective costs of a route (lower is better).
///
/// `fuel`, `time` and `safety` are each in [0, 1]; `overall` is the
/// weighted composite, identical to the fitness of the particle the route
/// was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub fuel: f64,
    pub time: f64,
    pub safety: f64,
    pub overall: f64,
}

impl ScoreBreakdown {
    /// Compose a breakdown from raw costs; the overall score is derived.
    pub fn from_costs(weights: &OptimizationWeights, fuel: f64, time: f64, safety: f64) -> Self {
        Self {
            fuel,
            time,
            safety,
            overall: weights.combine(fuel, time, safety),
        }
    }
}

// ============================================================================
// Route
// ============================================================================

/// One committed (or candidate) plan for a route id.
///
/// Immutable once returned by the optimizer. Later plans for the same id
/// carry a higher `revision`. No wall-clock data is stored here so that two
/// runs with the same seed serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: String,
    /// Incremented per committed plan for this route id, starting at 1
    pub revision: u32,
    /// First entry is the origin, last is the destination; at least two
    pub waypoints: Vec<Waypoint>,
    /// Total polyline length (nm)
    pub distance_nm: f64,
    /// Estimated sailing time at service speed (hours)
    pub eta_hours: f64,
    /// Estimated bunker consumption (metric tons)
    pub fuel_estimate_tons: f64,
    pub scores: ScoreBreakdown,
    /// Normalized weights the route was optimized against
    pub weights: OptimizationWeights,
    /// False when the iteration budget ran out before the swarm stalled
    pub converged: bool,
    pub iterations: u32,
    pub quantum_mode: bool,
}

impl Route {
    pub fn origin(&self) -> Option<Waypoint> {
        self.waypoints.first().copied()
    }

    pub fn destination(&self) -> Option<Waypoint> {
        self.waypoints.last().copied()
    }

    /// Position after sailing `distance_nm` along the route from the origin.
    ///
    /// Clamped to the destination once the full length has been covered.
    pub fn position_along(&self, distance_nm: f64) -> Option<Waypoint> {
        let mut remaining = distance_nm.max(0.0);
        for leg in self.waypoints.windows(2) {
            let leg_length = crate::geo::distance(leg[0], leg[1]);
            if remaining <= leg_length {
                let fraction = if leg_length > 0.0 { remaining / leg_length } else { 1.0 };
                return Some(crate::geo::intermediate_point(leg[0], leg[1], fraction));
            }
            remaining -= leg_length;
        }
        self.destination()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rev {}: {} waypoints, {:.1} nm, ETA {:.1} h, fuel {:.1} t, score {:.4}",
            self.route_id,
            self.revision,
            self.waypoints.len(),
            self.distance_nm,
            self.eta_hours,
            self.fuel_estimate_tons,
            self.scores.overall
        )
    }
}
