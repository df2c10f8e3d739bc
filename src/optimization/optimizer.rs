//! Core SwarmOptimizer: HACOPSO route search

use std::sync::Arc;

use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{defaults, BluepathConfig, OptimizerConfig, VesselConfig};
use crate::geo::{self, Waypoint};
use crate::hazard::HazardField;
use crate::types::{validate_route_id, OptimizationWeights, Route, ValidationError};

use super::fitness::{eta_hours, fuel_estimate_tons, RouteProblem};
use super::operators::{metropolis_accept, opposite, superpose, LogisticMap};
use super::swarm::{Particle, Swarm};

// ============================================================================
// Request / Outcome
// ============================================================================

/// Everything one optimization run needs besides the RNG.
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub route_id: String,
    /// Revision stamped on the produced route
    pub revision: u32,
    pub start: Waypoint,
    pub destination: Waypoint,
    pub weights: OptimizationWeights,
    pub quantum_mode: bool,
    /// Landscape snapshot; shared, never mutated during the run
    pub hazard: Arc<HazardField>,
}

impl OptimizationRequest {
    /// Validate the route id and endpoints. The hazard field starts empty.
    pub fn new(
        route_id: impl Into<String>,
        start: Waypoint,
        destination: Waypoint,
        weights: OptimizationWeights,
    ) -> Result<Self, ValidationError> {
        let route_id = route_id.into();
        validate_route_id(&route_id)?;
        if start == destination {
            return Err(ValidationError::DegenerateRoute);
        }
        Ok(Self {
            route_id,
            revision: 1,
            start,
            destination,
            weights,
            quantum_mode: false,
            hazard: Arc::new(HazardField::new(defaults::HAZARD_CELL_SIZE_DEG, true)),
        })
    }

    pub fn with_hazard(mut self, hazard: Arc<HazardField>) -> Self {
        self.hazard = hazard;
        self
    }

    pub fn with_quantum_mode(mut self, quantum_mode: bool) -> Self {
        self.quantum_mode = quantum_mode;
        self
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }
}

/// Result of one run. Never an error: budget exhaustion and cancellation
/// are reported through the flags.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// Route decoded from the global best
    pub route: Route,
    /// Global best stalled within tolerance before the budget ran out
    pub converged: bool,
    /// The cancellation token fired between iterations
    pub cancelled: bool,
    pub iterations: u32,
    /// Final swarm, suitable as a warm-start seed
    pub swarm: Swarm,
    /// Global best fitness after initialization and after each iteration;
    /// non-increasing
    pub best_fitness_history: Vec<f64>,
}

// ============================================================================
// Optimizer
// ============================================================================

/// Adaptive PSO coefficients at a point in the run.
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    inertia: f64,
    cognitive: f64,
    social: f64,
}

impl Coefficients {
    fn at(config: &OptimizerConfig, progress: f64) -> Self {
        let lerp = |start: f64, end: f64| start + (end - start) * progress;
        Self {
            inertia: lerp(config.inertia_start, config.inertia_end),
            cognitive: lerp(config.cognitive_start, config.cognitive_end),
            social: lerp(config.social_start, config.social_end),
        }
    }
}

/// Hybrid adaptive chaotic opposition-based particle swarm optimizer.
///
/// Stateless between runs; all randomness comes from the injected RNG, so
/// a seeded `StdRng` reproduces a run exactly.
#[derive(Debug, Clone)]
pub struct SwarmOptimizer {
    config: OptimizerConfig,
    vessel: VesselConfig,
}

impl SwarmOptimizer {
    pub fn new(config: OptimizerConfig, vessel: VesselConfig) -> Self {
        Self { config, vessel }
    }

    pub fn from_config(config: &BluepathConfig) -> Self {
        Self::new(config.optimizer.clone(), config.vessel.clone())
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Search for the route minimizing the weighted cost.
    ///
    /// `warm_start` seeds the population from a previous swarm of the same
    /// dimensionality; its global best becomes particle 0. Cancellation is
    /// checked between iterations and returns the best-so-far.
    pub fn optimize<R: Rng>(
        &self,
        request: &OptimizationRequest,
        warm_start: Option<&Swarm>,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> OptimizationOutcome {
        let cfg = &self.config;
        let problem = RouteProblem::new(
            request.start,
            request.destination,
            request.weights,
            &request.hazard,
            cfg,
        );
        let span = 2.0 * problem.half_width_nm();
        let v_max = cfg.max_velocity_ratio * span;

        // 1. Initialize (cold or warm) and evaluate
        let mut swarm = self.initial_swarm(&problem, warm_start, v_max, rng);
        self.evaluate_positions(&problem, &mut swarm);
        let mut history = vec![swarm.global_best_fitness];

        let mut chaos = LogisticMap::seeded(rng);
        let jitter = Normal::new(0.0, cfg.quantum_jitter * span).ok();

        // A zero interval runs the pass every iteration
        let obl_interval = cfg.obl_interval.max(1);
        let quantum_interval = cfg.quantum_interval.max(1);

        let mut converged = false;
        let mut cancelled = false;
        let mut completed = 0u32;

        for iter in 0..cfg.iterations {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let progress = if cfg.iterations > 1 {
                iter as f64 / (cfg.iterations - 1) as f64
            } else {
                1.0
            };

            // 2. Velocity/position update with chaotic kicks
            let kick = cfg.chaos_factor * span * (1.0 - progress);
            self.move_particles(&problem, &mut swarm, Coefficients::at(cfg, progress), &mut chaos, kick, v_max, rng);

            // 3. Evaluate (parallel barrier) and update bests
            self.evaluate_positions(&problem, &mut swarm);

            // 4. Opposition-based learning on the worst particles
            if (iter + 1) % obl_interval == 0 {
                self.opposition_pass(&problem, &mut swarm);
            }

            // 5. Quantum superposition with Metropolis acceptance
            if request.quantum_mode && (iter + 1) % quantum_interval == 0 {
                let temperature = cfg.quantum_temperature * (1.0 - progress);
                self.quantum_pass(&problem, &mut swarm, jitter.as_ref(), temperature, rng);
            }

            swarm.iteration += 1;
            completed += 1;
            history.push(swarm.global_best_fitness);

            // 6. Early exit once the global best has stalled
            if stalled(&history, cfg.stall_window, cfg.tolerance) {
                converged = true;
                break;
            }
        }

        let route = self.decode_route(&problem, request, &swarm, converged && !cancelled, completed);
        debug!(
            route_id = %request.route_id,
            iterations = completed,
            fitness = swarm.global_best_fitness,
            converged = route.converged,
            cancelled,
            quantum = request.quantum_mode,
            "Optimization finished"
        );

        OptimizationOutcome {
            route,
            converged: converged && !cancelled,
            cancelled,
            iterations: completed,
            swarm,
            best_fitness_history: history,
        }
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    fn initial_swarm<R: Rng>(
        &self,
        problem: &RouteProblem<'_>,
        warm_start: Option<&Swarm>,
        v_max: f64,
        rng: &mut R,
    ) -> Swarm {
        match warm_start {
            Some(prior) if !prior.is_empty() && prior.dimensions() == problem.dimensions() => {
                self.warm_swarm(problem, prior, v_max, rng)
            }
            Some(prior) => {
                warn!(
                    seed_dimensions = prior.dimensions(),
                    expected = problem.dimensions(),
                    "Warm-start swarm does not match the problem, starting cold"
                );
                self.cold_swarm(problem, v_max, rng)
            }
            None => self.cold_swarm(problem, v_max, rng),
        }
    }

    /// Great-circle particle, two mirrored sinusoidal bulges, then uniform
    /// random particles.
    fn cold_swarm<R: Rng>(&self, problem: &RouteProblem<'_>, v_max: f64, rng: &mut R) -> Swarm {
        let n = self.config.particles.max(1);
        let dims = problem.dimensions();
        let bound = problem.half_width_nm();

        let amplitude = (geo::CURVE_BULGE_RATIO * problem.direct_nm()).min(bound);
        let profile = geo::lateral_profile(dims, amplitude);
        let mirrored: Vec<f64> = profile.iter().map(|x| -x).collect();

        let mut particles: Vec<Particle> = [vec![0.0; dims], profile, mirrored]
            .into_iter()
            .take(n)
            .map(|seed| Particle::new(seed, vec![0.0; dims]))
            .collect();
        while particles.len() < n {
            particles.push(Particle::new(
                uniform_vec(rng, dims, bound),
                uniform_vec(rng, dims, v_max),
            ));
        }
        Swarm::new(particles)
    }

    /// Reuse a previous swarm. Personal bests are re-scored against the
    /// current landscape so stale fitness values never mask a new hazard.
    fn warm_swarm<R: Rng>(&self, problem: &RouteProblem<'_>, prior: &Swarm, v_max: f64, rng: &mut R) -> Swarm {
        let n = self.config.particles.max(1);
        let dims = problem.dimensions();
        let bound = problem.half_width_nm();

        let mut particles: Vec<Particle> = prior
            .particles
            .iter()
            .take(n)
            .map(|p| {
                let mut position = p.position.clone();
                problem.clamp(&mut position);
                let mut best_position = p.best_position.clone();
                problem.clamp(&mut best_position);
                let velocity = p.velocity.iter().map(|v| v.clamp(-v_max, v_max)).collect();
                Particle {
                    position,
                    velocity,
                    best_position,
                    best_fitness: f64::INFINITY,
                    fitness: f64::INFINITY,
                }
            })
            .collect();

        let mut seed = prior.global_best_position.clone();
        problem.clamp(&mut seed);
        let injected = Particle::new(seed, vec![0.0; dims]);
        match particles.first_mut() {
            Some(first) => *first = injected,
            None => particles.push(injected),
        }
        while particles.len() < n {
            particles.push(Particle::new(
                uniform_vec(rng, dims, bound),
                uniform_vec(rng, dims, v_max),
            ));
        }

        let bests: Vec<&[f64]> = particles.iter().map(|p| p.best_position.as_slice()).collect();
        let scores = self.evaluate_batch(problem, &bests);
        for (particle, score) in particles.iter_mut().zip(scores) {
            particle.best_fitness = score;
        }
        Swarm::new(particles)
    }

    // ========================================================================
    // Iteration steps
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn move_particles<R: Rng>(
        &self,
        problem: &RouteProblem<'_>,
        swarm: &mut Swarm,
        coefficients: Coefficients,
        chaos: &mut LogisticMap,
        kick: f64,
        v_max: f64,
        rng: &mut R,
    ) {
        let n = swarm.len();
        let kicked_count = ((self.config.chaos_fraction * n as f64).round() as usize).min(n);
        let mut kicked = vec![false; n];
        for i in index::sample(rng, n, kicked_count).iter() {
            kicked[i] = true;
        }

        let bound = problem.half_width_nm();
        let Swarm {
            particles,
            global_best_position,
            ..
        } = swarm;

        for (i, p) in particles.iter_mut().enumerate() {
            for d in 0..p.position.len() {
                let r1: f64 = rng.gen();
                let r2: f64 = rng.gen();
                let mut v = coefficients.inertia * p.velocity[d]
                    + coefficients.cognitive * r1 * (p.best_position[d] - p.position[d])
                    + coefficients.social * r2 * (global_best_position[d] - p.position[d]);
                if kicked[i] {
                    v += kick * (2.0 * chaos.next_value() - 1.0);
                }
                v = v.clamp(-v_max, v_max);

                let x = p.position[d] + v;
                if x.abs() >= bound {
                    p.position[d] = x.clamp(-bound, bound);
                    p.velocity[d] = 0.0;
                } else {
                    p.position[d] = x;
                    p.velocity[d] = v;
                }
            }
        }
    }

    fn evaluate_positions(&self, problem: &RouteProblem<'_>, swarm: &mut Swarm) {
        let positions: Vec<&[f64]> = swarm.particles.iter().map(|p| p.position.as_slice()).collect();
        let scores = self.evaluate_batch(problem, &positions);
        for (particle, score) in swarm.particles.iter_mut().zip(scores) {
            particle.record(score);
        }
        swarm.refresh_global_best();
    }

    /// Reflect the worst `obl_fraction` through the box centre; keep the
    /// opposite only when it beats the particle's personal best.
    fn opposition_pass(&self, problem: &RouteProblem<'_>, swarm: &mut Swarm) {
        let n = swarm.len();
        let count = ((self.config.obl_fraction * n as f64).round() as usize).min(n);
        if count == 0 {
            return;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            swarm.particles[b]
                .fitness
                .total_cmp(&swarm.particles[a].fitness)
                .then(a.cmp(&b))
        });
        let worst = &order[..count];

        let bound = problem.half_width_nm();
        let candidates: Vec<Vec<f64>> = worst
            .iter()
            .map(|&i| {
                let mut o = opposite(&swarm.particles[i].position, -bound, bound);
                problem.clamp(&mut o);
                o
            })
            .collect();
        let refs: Vec<&[f64]> = candidates.iter().map(Vec::as_slice).collect();
        let scores = self.evaluate_batch(problem, &refs);

        for ((&i, candidate), score) in worst.iter().zip(candidates).zip(scores) {
            let particle = &mut swarm.particles[i];
            if score < particle.best_fitness {
                particle.position = candidate;
                particle.record(score);
            }
        }
        swarm.refresh_global_best();
    }

    /// Neighbouring pairs collapse to a random superposition plus jitter;
    /// the worse partner takes the candidate under Metropolis acceptance.
    fn quantum_pass<R: Rng>(
        &self,
        problem: &RouteProblem<'_>,
        swarm: &mut Swarm,
        jitter: Option<&Normal<f64>>,
        temperature: f64,
        rng: &mut R,
    ) {
        let n = swarm.len();
        let pairs: Vec<(usize, usize)> = (0..n.saturating_sub(1)).step_by(2).map(|i| (i, i + 1)).collect();
        if pairs.is_empty() {
            return;
        }

        let candidates: Vec<Vec<f64>> = pairs
            .iter()
            .map(|&(a, b)| {
                let alpha: f64 = rng.gen();
                let mut c = superpose(&swarm.particles[a].position, &swarm.particles[b].position, alpha);
                if let Some(normal) = jitter {
                    for x in c.iter_mut() {
                        *x += normal.sample(rng);
                    }
                }
                problem.clamp(&mut c);
                c
            })
            .collect();
        let refs: Vec<&[f64]> = candidates.iter().map(Vec::as_slice).collect();
        let scores = self.evaluate_batch(problem, &refs);

        for ((&(a, b), candidate), score) in pairs.iter().zip(candidates).zip(scores) {
            let target = if swarm.particles[a].fitness >= swarm.particles[b].fitness { a } else { b };
            let delta = score - swarm.particles[target].fitness;
            if metropolis_accept(delta, temperature, rng) {
                let particle = &mut swarm.particles[target];
                particle.position = candidate;
                particle.record(score);
            }
        }
        swarm.refresh_global_best();
    }

    /// Score positions, on the rayon pool when `parallel` is set. Results
    /// come back in input order either way.
    fn evaluate_batch(&self, problem: &RouteProblem<'_>, positions: &[&[f64]]) -> Vec<f64> {
        if self.config.parallel {
            positions.par_iter().map(|x| problem.fitness(x)).collect()
        } else {
            positions.iter().map(|x| problem.fitness(x)).collect()
        }
    }

    fn decode_route(
        &self,
        problem: &RouteProblem<'_>,
        request: &OptimizationRequest,
        swarm: &Swarm,
        converged: bool,
        iterations: u32,
    ) -> Route {
        let waypoints = problem.decode(&swarm.global_best_position);
        let evaluation = problem.evaluate_path(&waypoints);
        Route {
            route_id: request.route_id.clone(),
            revision: request.revision,
            distance_nm: evaluation.distance_nm,
            eta_hours: eta_hours(evaluation.distance_nm, &self.vessel),
            fuel_estimate_tons: fuel_estimate_tons(evaluation.distance_nm, &request.weights, &self.vessel),
            scores: evaluation.scores,
            weights: request.weights,
            converged,
            iterations,
            quantum_mode: request.quantum_mode,
            waypoints,
        }
    }
}

/// True once the best fitness improved by less than `tolerance` over the
/// last `window` iterations.
fn stalled(history: &[f64], window: u32, tolerance: f64) -> bool {
    let window = window as usize;
    if window == 0 || history.len() <= window {
        return false;
    }
    let latest = history[history.len() - 1];
    let earlier = history[history.len() - 1 - window];
    earlier - latest < tolerance
}

fn uniform_vec<R: Rng>(rng: &mut R, dims: usize, bound: f64) -> Vec<f64> {
    (0..dims).map(|_| rng.gen_range(-bound..=bound)).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(lat, lon).unwrap()
    }

    fn small_config() -> OptimizerConfig {
        OptimizerConfig {
            particles: 16,
            iterations: 40,
            control_points: 6,
            ..OptimizerConfig::default()
        }
    }

    fn request() -> OptimizationRequest {
        OptimizationRequest::new(
            "chennai-singapore",
            wp(13.0827, 80.2707),
            wp(1.3521, 103.8198),
            OptimizationWeights::default(),
        )
        .unwrap()
    }

    #[test]
    fn request_rejects_degenerate_input() {
        let a = wp(10.0, 10.0);
        assert_eq!(
            OptimizationRequest::new("r", a, a, OptimizationWeights::default()).unwrap_err(),
            ValidationError::DegenerateRoute
        );
        assert_eq!(
            OptimizationRequest::new(" ", a, wp(11.0, 10.0), OptimizationWeights::default()).unwrap_err(),
            ValidationError::EmptyRouteId
        );
    }

    #[test]
    fn route_endpoints_are_exact_and_history_non_increasing() {
        let optimizer = SwarmOptimizer::new(small_config(), VesselConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let outcome = optimizer.optimize(&request(), None, &mut rng, &CancellationToken::new());

        let route = &outcome.route;
        assert_eq!(route.waypoints.first().copied(), Some(wp(13.0827, 80.2707)));
        assert_eq!(route.waypoints.last().copied(), Some(wp(1.3521, 103.8198)));
        assert_eq!(route.waypoints.len(), small_config().control_points + 2);
        assert!(outcome
            .best_fitness_history
            .windows(2)
            .all(|w| w[1] <= w[0]));
        assert_eq!(route.scores.overall, outcome.swarm.global_best_fitness);
        assert_eq!(outcome.best_fitness_history.len() as u32, outcome.iterations + 1);
    }

    #[test]
    fn zero_pass_intervals_run_every_iteration() {
        let config = OptimizerConfig {
            obl_interval: 0,
            quantum_interval: 0,
            iterations: 5,
            ..small_config()
        };
        let optimizer = SwarmOptimizer::new(config, VesselConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = optimizer.optimize(
            &request().with_quantum_mode(true),
            None,
            &mut rng,
            &CancellationToken::new(),
        );
        assert!(outcome.iterations >= 1);
        assert!(outcome.route.scores.overall.is_finite());
    }

    #[test]
    fn seeded_runs_are_identical() {
        let optimizer = SwarmOptimizer::new(small_config(), VesselConfig::default());
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome = optimizer.optimize(
                &request().with_quantum_mode(true),
                None,
                &mut rng,
                &CancellationToken::new(),
            );
            serde_json::to_string(&outcome.route).unwrap()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let parallel = SwarmOptimizer::new(small_config(), VesselConfig::default());
        let sequential = SwarmOptimizer::new(
            OptimizerConfig {
                parallel: false,
                ..small_config()
            },
            VesselConfig::default(),
        );
        let a = parallel.optimize(&request(), None, &mut StdRng::seed_from_u64(3), &CancellationToken::new());
        let b = sequential.optimize(&request(), None, &mut StdRng::seed_from_u64(3), &CancellationToken::new());
        assert_eq!(a.route, b.route);
    }

    #[test]
    fn budget_exhaustion_is_not_convergence() {
        let config = OptimizerConfig {
            iterations: 3,
            stall_window: 15,
            ..small_config()
        };
        let optimizer = SwarmOptimizer::new(config, VesselConfig::default());
        let outcome = optimizer.optimize(&request(), None, &mut StdRng::seed_from_u64(1), &CancellationToken::new());
        assert!(!outcome.converged);
        assert!(!outcome.route.converged);
        assert_eq!(outcome.iterations, 3);
    }

    #[test]
    fn stall_window_triggers_early_exit() {
        let config = OptimizerConfig {
            iterations: 500,
            stall_window: 5,
            tolerance: 1.0,
            ..small_config()
        };
        let optimizer = SwarmOptimizer::new(config, VesselConfig::default());
        let outcome = optimizer.optimize(&request(), None, &mut StdRng::seed_from_u64(1), &CancellationToken::new());
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 5);
    }

    #[test]
    fn cancelled_run_returns_best_so_far() {
        let optimizer = SwarmOptimizer::new(small_config(), VesselConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = optimizer.optimize(&request(), None, &mut StdRng::seed_from_u64(9), &cancel);
        assert!(outcome.cancelled);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.route.waypoints.len(), small_config().control_points + 2);
        assert!(outcome.swarm.global_best_fitness.is_finite());
    }

    #[test]
    fn warm_start_does_not_regress_on_same_landscape() {
        let optimizer = SwarmOptimizer::new(small_config(), VesselConfig::default());
        let first = optimizer.optimize(&request(), None, &mut StdRng::seed_from_u64(5), &CancellationToken::new());
        let second = optimizer.optimize(
            &request(),
            Some(&first.swarm),
            &mut StdRng::seed_from_u64(6),
            &CancellationToken::new(),
        );
        assert!(second.route.scores.overall <= first.route.scores.overall);
        assert!(second.best_fitness_history[0] <= first.swarm.global_best_fitness);
    }

    #[test]
    fn warm_start_beats_seed_under_new_hazard() {
        let optimizer = SwarmOptimizer::new(small_config(), VesselConfig::default());
        let first = optimizer.optimize(&request(), None, &mut StdRng::seed_from_u64(5), &CancellationToken::new());

        // Storm sitting on the first plan's midpoint
        let mid = first.route.waypoints[first.route.waypoints.len() / 2];
        let hazard = HazardField::new(0.5, true).with_cell_penalty(mid, 0.9);
        let stormy = request().with_hazard(Arc::new(hazard));

        let seed_fitness = RouteProblem::new(
            stormy.start,
            stormy.destination,
            stormy.weights,
            &stormy.hazard,
            optimizer.config(),
        )
        .fitness(&first.swarm.global_best_position);

        let replan = optimizer.optimize(&stormy, Some(&first.swarm), &mut StdRng::seed_from_u64(6), &CancellationToken::new());
        assert!(replan.route.scores.overall <= seed_fitness);
    }

    #[test]
    fn mismatched_warm_start_falls_back_to_cold() {
        let optimizer = SwarmOptimizer::new(small_config(), VesselConfig::default());
        let foreign = Swarm::new(vec![Particle::new(vec![0.0; 3], vec![0.0; 3])]);
        let outcome = optimizer.optimize(&request(), Some(&foreign), &mut StdRng::seed_from_u64(2), &CancellationToken::new());
        assert_eq!(outcome.swarm.dimensions(), small_config().control_points);
        assert_eq!(outcome.swarm.len(), small_config().particles);
    }

    #[test]
    fn hazard_pushes_route_away() {
        let config = OptimizerConfig {
            particles: 30,
            iterations: 60,
            control_points: 6,
            ..OptimizerConfig::default()
        };
        let optimizer = SwarmOptimizer::new(config, VesselConfig::default());
        let start = wp(20.0, 60.0);
        let dest = wp(20.0, 70.0);
        let mut hazard = HazardField::new(0.5, false);
        // Wall of hazard along the direct track
        for i in 1..20 {
            let p = geo::intermediate_point(start, dest, i as f64 / 20.0);
            hazard = hazard.with_cell_penalty(p, 1.0);
        }
        let weights = OptimizationWeights::new(0.1, 0.1, 0.8).unwrap();
        let req = OptimizationRequest::new("detour", start, dest, weights)
            .unwrap()
            .with_hazard(Arc::new(hazard));

        let outcome = optimizer.optimize(&req, None, &mut StdRng::seed_from_u64(42), &CancellationToken::new());
        let direct = RouteProblem::new(start, dest, weights, &req.hazard, optimizer.config())
            .evaluate(&[0.0; 6]);
        assert!(outcome.route.scores.safety < direct.scores.safety);
        assert!(outcome.route.distance_nm > geo::distance(start, dest));
    }
}
