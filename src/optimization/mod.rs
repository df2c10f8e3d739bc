//! Swarm Route Optimizer
//!
//! Hybrid adaptive chaotic opposition-based particle swarm optimization
//! (HACOPSO) over lateral offsets from the great-circle track. Entirely
//! algorithmic and deterministic for a given seed.
//!
//! - `swarm` - particle and swarm state, retained between runs as warm-start seeds
//! - `fitness` - decoding positions to waypoints and the fuel/time/safety cost model
//! - `operators` - logistic-map chaos, opposition-based learning, quantum superposition
//! - `optimizer` - the run loop with cooperative cancellation

mod fitness;
mod operators;
mod optimizer;
mod swarm;

pub use fitness::{eta_hours, fuel_estimate_tons, Evaluation, RouteProblem};
pub use operators::LogisticMap;
pub use optimizer::{OptimizationOutcome, OptimizationRequest, SwarmOptimizer};
pub use swarm::{Particle, Swarm};
