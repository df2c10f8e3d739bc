//! Per-route session state

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::audit::AuditChain;
use crate::geo::Waypoint;
use crate::hazard::HazardField;
use crate::optimization::Swarm;
use crate::types::{OptimizationWeights, Route};

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle of one route id.
///
/// `Idle -> Optimizing -> Ready -> Optimizing { replan: true } -> Ready ...`,
/// with `Closed` reachable from any state through `close_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Optimizing { replan: bool },
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Optimizing { replan: false } => write!(f, "Optimizing"),
            SessionState::Optimizing { replan: true } => write!(f, "Optimizing(replan)"),
            SessionState::Ready => write!(f, "Ready"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// What the caller asked for; replans reuse it.
///
/// Recorded with every `RouteComputed` entry so a resumed session replans
/// with the caller's weights rather than a boosted revision's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlanSpec {
    pub start: Waypoint,
    pub destination: Waypoint,
    pub weights: OptimizationWeights,
    pub quantum_mode: bool,
}

impl PlanSpec {
    /// Best effort for routes committed without a recorded plan.
    pub fn from_route(route: &Route) -> Option<Self> {
        Some(Self {
            start: route.origin()?,
            destination: route.destination()?,
            weights: route.weights,
            quantum_mode: route.quantum_mode,
        })
    }

    pub fn same_endpoints(&self, start: Waypoint, destination: Waypoint) -> bool {
        self.start == start && self.destination == destination
    }
}

/// Handle on the optimizer run currently executing outside the lock.
#[derive(Debug)]
pub(crate) struct ActiveRun {
    pub cancel: CancellationToken,
    pub replan: bool,
}

/// Progress along the committed route, stepped by `advance`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct VoyageProgress {
    pub distance_travelled_nm: f64,
    pub elapsed_hours: f64,
}

/// Externally visible voyage state after an `advance` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageSnapshot {
    pub route_id: String,
    pub revision: u32,
    pub state: SessionState,
    /// Estimated vessel position on the current route
    pub position: Waypoint,
    pub distance_travelled_nm: f64,
    pub remaining_nm: f64,
    pub elapsed_hours: f64,
    /// Fraction of the route covered, in [0, 1]
    pub progress: f64,
    pub arrived: bool,
}

// ============================================================================
// Session
// ============================================================================

/// Everything the supervisor owns for one route id, guarded by one mutex.
pub(crate) struct SessionInner {
    pub state: SessionState,
    pub run: Option<ActiveRun>,
    /// Replans waiting for the in-flight run to stop, or running
    pub pending_replans: u32,
    pub plan: Option<PlanSpec>,
    /// Final swarm of the latest run, committed or not
    pub seed_swarm: Option<Swarm>,
    pub hazard: Arc<HazardField>,
    pub last_telemetry: Option<chrono::DateTime<chrono::Utc>>,
    pub rng: StdRng,
    pub chain: AuditChain,
    pub route: Option<Route>,
    pub voyage: VoyageProgress,
}

impl SessionInner {
    pub fn new(chain: AuditChain, hazard: HazardField, rng: StdRng) -> Self {
        Self {
            state: SessionState::Idle,
            run: None,
            pending_replans: 0,
            plan: None,
            seed_swarm: None,
            hazard: Arc::new(hazard),
            last_telemetry: None,
            rng,
            chain,
            route: None,
            voyage: VoyageProgress::default(),
        }
    }

    /// A run is executing or a replan is queued behind one.
    pub fn busy(&self) -> bool {
        self.run.is_some() || self.pending_replans > 0
    }

    /// State to fall back to when a run ends without committing.
    pub fn settled_state(&self) -> SessionState {
        if self.route.is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }

    /// Revision the next committed route will carry.
    pub fn next_revision(&self) -> u32 {
        self.route.as_ref().map_or(1, |r| r.revision + 1)
    }

    /// Independent RNG for one optimizer run, drawn from the session stream.
    pub fn run_rng(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.rng.gen())
    }

    /// Estimated position on the current route.
    pub fn position_estimate(&self) -> Option<Waypoint> {
        self.route
            .as_ref()
            .and_then(|r| r.position_along(self.voyage.distance_travelled_nm))
    }
}

pub(crate) struct RouteSession {
    pub route_id: String,
    inner: Mutex<SessionInner>,
    /// Signalled whenever a run finishes
    run_finished: Condvar,
}

impl RouteSession {
    pub fn new(route_id: String, inner: SessionInner) -> Self {
        Self {
            route_id,
            inner: Mutex::new(inner),
            run_finished: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until no optimizer run is active. Bounded by one iteration of
    /// the run once its token has been cancelled.
    pub fn wait_idle<'a>(&self, mut guard: MutexGuard<'a, SessionInner>) -> MutexGuard<'a, SessionInner> {
        while guard.run.is_some() {
            guard = self.run_finished.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
        guard
    }

    pub fn notify_run_finished(&self) {
        self.run_finished.notify_all();
    }
}

/// Per-route RNG: the master seed mixed with a stable digest of the route id,
/// or OS entropy when no seed is configured.
pub(crate) fn session_rng(seed: Option<u64>, route_id: &str) -> StdRng {
    match seed {
        Some(seed) => {
            let digest = Sha256::digest(route_id.as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            StdRng::seed_from_u64(seed ^ u64::from_be_bytes(bytes))
        }
        None => StdRng::from_entropy(),
    }
}
