//! System-wide default constants.
//!
//! Every tunable in `BluepathConfig` falls back to one of these values when
//! the TOML file omits it. Grouped by subsystem for easy discovery.

// ============================================================================
// Swarm Optimizer
// ============================================================================

/// Particles per swarm.
pub const SWARM_PARTICLES: usize = 50;

/// Iteration budget per optimization run.
pub const SWARM_ITERATIONS: u32 = 100;

/// Intermediate control points between origin and destination.
pub const SWARM_CONTROL_POINTS: usize = 10;

/// Inertia weight at the first iteration, decaying linearly to `INERTIA_END`.
pub const INERTIA_START: f64 = 0.9;
pub const INERTIA_END: f64 = 0.4;

/// Cognitive coefficient c1 decays 2.5 -> 1.5 over the run.
pub const COGNITIVE_START: f64 = 2.5;
pub const COGNITIVE_END: f64 = 1.5;

/// Social coefficient c2 rises 1.5 -> 2.5 over the run.
pub const SOCIAL_START: f64 = 1.5;
pub const SOCIAL_END: f64 = 2.5;

/// Share of particles whose velocity receives a chaotic kick each iteration.
pub const CHAOS_FRACTION: f64 = 0.2;

/// Chaotic kick magnitude as a fraction of the search span.
pub const CHAOS_FACTOR: f64 = 0.1;

/// Iterations between opposition-based learning passes.
pub const OBL_INTERVAL: u32 = 10;

/// Share of worst particles reflected by opposition-based learning.
pub const OBL_FRACTION: f64 = 0.25;

/// Iterations between quantum superposition passes.
pub const QUANTUM_INTERVAL: u32 = 5;

/// Quantum exploration jitter as a fraction of the search span.
pub const QUANTUM_JITTER: f64 = 0.1;

/// Initial Metropolis temperature for quantum candidates (fitness units).
pub const QUANTUM_TEMPERATURE: f64 = 0.05;

/// Iterations without meaningful global-best improvement before stopping.
pub const STALL_WINDOW: u32 = 15;

/// Minimum global-best improvement across the stall window.
pub const STALL_TOLERANCE: f64 = 1e-6;

/// Velocity clamp as a fraction of the search span.
pub const MAX_VELOCITY_RATIO: f64 = 0.2;

/// Corridor half-width as a fraction of the direct distance.
pub const CORRIDOR_RATIO: f64 = 0.25;

/// Corridor half-width floor (nm).
pub const MIN_CORRIDOR_NM: f64 = 30.0;

/// Corridor half-width ceiling (nm).
pub const MAX_CORRIDOR_NM: f64 = 600.0;

/// Distance that saturates the fuel and time costs (nm).
pub const REFERENCE_DISTANCE_NM: f64 = 5_000.0;

/// Extra fuel cost per unit of hazard exposure (rough water burns more fuel).
pub const ROUGH_WATER_FACTOR: f64 = 0.5;

/// Hazard samples taken along each leg when scoring exposure.
pub const SAMPLES_PER_LEG: usize = 4;

// ============================================================================
// Hazard Model
// ============================================================================

/// Significant wave height that triggers re-optimization (m).
pub const WAVE_HEIGHT_THRESHOLD_M: f64 = 4.5;

/// Wave height that maps to full wave severity (m).
pub const WAVE_SEVERITY_SCALE_M: f64 = 10.0;

/// Wind speed that maps to full wind severity (kt).
pub const WIND_SEVERITY_SCALE_KT: f64 = 50.0;

/// Hazard grid resolution (degrees).
pub const HAZARD_CELL_SIZE_DEG: f64 = 0.5;

/// Gaussian radius of a stamped hazard (nm).
///
/// Penalties are stamped out to three radii; beyond that the contribution
/// is negligible.
pub const HAZARD_DECAY_RADIUS_NM: f64 = 150.0;

/// Multiplier applied to every existing cell before a new stamp.
pub const HAZARD_FIELD_DECAY: f64 = 0.8;

/// Share of severity added to the global baseline when no position is known.
pub const HAZARD_BASELINE_FACTOR: f64 = 0.5;

/// Cells whose penalty decays below this are dropped from the field.
pub const HAZARD_MIN_CELL_PENALTY: f64 = 1e-3;

/// Climatology penalty inside the tropical cyclone band |lat| <= 10.
pub const TROPICAL_BAND_PENALTY: f64 = 0.1;
pub const TROPICAL_BAND_LATITUDE: f64 = 10.0;

/// Climatology penalty in polar waters |lat| > 60.
pub const POLAR_PENALTY: f64 = 0.2;
pub const POLAR_LATITUDE: f64 = 60.0;

// ============================================================================
// Vessel
// ============================================================================

/// Service speed used for ETA and voyage progress (kt).
pub const SERVICE_SPEED_KT: f64 = 15.0;

/// Base bunker consumption (t/nm).
pub const BASE_CONSUMPTION_T_PER_NM: f64 = 0.5;

/// Fuel saved at full fuel priority: consumption scales by `1 - gain * w.fuel`.
pub const FUEL_EFFICIENCY_GAIN: f64 = 0.3;

// ============================================================================
// Audit
// ============================================================================

/// Environment variable holding the audit HMAC key.
pub const AUDIT_SECRET_ENV: &str = "BLUEPATH_AUDIT_SECRET";

/// Shortest accepted audit key (bytes).
pub const MIN_AUDIT_SECRET_LEN: usize = 16;

// ============================================================================
// Storage
// ============================================================================

/// Default directory for sled databases and the process lock.
pub const DATA_DIR: &str = "./bluepath_data";

// ============================================================================
// Telemetry Simulation
// ============================================================================

/// Interval between simulated telemetry samples (minutes).
pub const SIM_SAMPLE_INTERVAL_MINUTES: i64 = 60;

/// Simulated samples emitted per voyage.
pub const SIM_SAMPLES: usize = 20;

/// Fraction of the voyage where the simulated storm begins.
pub const SIM_STORM_START: f64 = 0.3;

/// Fraction of the voyage where the simulated storm subsides.
pub const SIM_STORM_END: f64 = 0.6;
