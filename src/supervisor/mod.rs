//! Voyage Supervisor
//!
//! Owns one session per route id and is the only component that mutates a
//! route's swarm, hazard field, audit chain or committed route.
//!
//! ```text
//! compute_route ──► Optimizing ──► Ready ──► RouteComputed
//!                                    │
//! push_telemetry ──► TelemetryRecorded
//!        │ breach
//!        ▼
//!   ingest hazard ─► cancel in-flight run ─► ReplanTriggered
//!        ─► warm-started re-optimization ─► RouteComputed
//! ```
//!
//! Each session has one mutex; the optimizer always runs with it released
//! so different route ids progress in parallel and a breach can cancel an
//! in-flight run of the same id. At most one run per route id executes at
//! any time.

mod session;

pub use session::{SessionState, VoyageSnapshot};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audit::{
    AuditAction, AuditChain, AuditEntry, AuditError, ChainVerification, Clock, EnvSecret, SecretProvider,
    SystemClock,
};
use crate::config::BluepathConfig;
use crate::geo::Waypoint;
use crate::hazard::HazardModel;
use crate::optimization::{OptimizationRequest, SwarmOptimizer};
use crate::storage::{AuditStore, RouteStore, StoreError, Stores};
use crate::types::{validate_route_id, OptimizationWeights, Route, TelemetrySample, ValidationError};

use session::{session_rng, ActiveRun, PlanSpec, RouteSession, SessionInner, VoyageProgress};

// ============================================================================
// Errors and Results
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("route '{route_id}' is already optimizing")]
    AlreadyOptimizing { route_id: String },

    #[error("telemetry for route '{route_id}' at {received} is not after last recorded sample at {last}")]
    TelemetryOutOfOrder {
        route_id: String,
        last: DateTime<Utc>,
        received: DateTime<Utc>,
    },

    #[error("session for route '{route_id}' is closed")]
    SessionClosed { route_id: String },

    #[error("route '{route_id}' has no committed route")]
    NoRoute { route_id: String },

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("route store failure: {0}")]
    Store(#[from] StoreError),
}

/// Result of `compute_route`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub route: Route,
    /// The run was superseded by a telemetry-triggered replan; `route` is
    /// its best-so-far and was not committed
    pub cancelled: bool,
}

/// Result of `push_telemetry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryAck {
    pub route_id: String,
    /// Index of the `TelemetryRecorded` audit entry
    pub entry_id: u64,
    pub breach: bool,
    pub severity: f64,
    /// A replan ran to completion and was committed
    pub replanned: bool,
    /// Committed route revision after the sample was processed
    pub revision: Option<u32>,
}

// ============================================================================
// Audit Payloads
// ============================================================================

#[derive(Serialize)]
struct RouteComputedRecord<'a> {
    replan: bool,
    warm_start: bool,
    plan: Option<&'a PlanSpec>,
    route: &'a Route,
}

/// Fields read back from a restored chain.
#[derive(Deserialize)]
struct RecordedPlan {
    plan: Option<PlanSpec>,
}

#[derive(Deserialize)]
struct RecordedSample {
    timestamp: DateTime<Utc>,
}

/// Timestamp of the newest `TelemetryRecorded` entry.
fn last_recorded_sample(entries: &[AuditEntry]) -> Option<DateTime<Utc>> {
    entries
        .iter()
        .rev()
        .filter(|e| e.action == AuditAction::TelemetryRecorded)
        .find_map(|e| serde_json::from_str::<RecordedSample>(&e.payload).ok())
        .map(|s| s.timestamp)
}

/// Plan recorded with the newest `RouteComputed` entry that carries one.
fn last_recorded_plan(entries: &[AuditEntry]) -> Option<PlanSpec> {
    entries
        .iter()
        .rev()
        .filter(|e| e.action == AuditAction::RouteComputed)
        .find_map(|e| serde_json::from_str::<RecordedPlan>(&e.payload).ok()?.plan)
}

#[derive(Serialize)]
struct ReplanRecord {
    trigger_timestamp: DateTime<Utc>,
    severity: f64,
    wave_height_m: f64,
    wind_speed_kt: f64,
    position_estimate: Option<Waypoint>,
    cancelled_in_flight: bool,
    hazard_generation: u64,
    weights: OptimizationWeights,
}

// ============================================================================
// Supervisor
// ============================================================================

/// Per-route session owner.
///
/// Construct once and share by reference (or `Arc`); there is no global
/// instance.
pub struct VoyageSupervisor {
    config: BluepathConfig,
    optimizer: SwarmOptimizer,
    hazard: HazardModel,
    sessions: DashMap<String, Arc<RouteSession>>,
    routes: Arc<dyn RouteStore>,
    audit: Arc<dyn AuditStore>,
    secret: Arc<dyn SecretProvider>,
    clock: Arc<dyn Clock>,
}

impl VoyageSupervisor {
    /// Supervisor with in-memory stores, the environment audit key and
    /// the system clock.
    pub fn new(config: BluepathConfig) -> Self {
        let stores = Stores::in_memory();
        Self {
            optimizer: SwarmOptimizer::from_config(&config),
            hazard: HazardModel::new(config.hazard.clone()),
            sessions: DashMap::new(),
            routes: stores.routes,
            audit: stores.audit,
            secret: Arc::new(EnvSecret::from_config(&config.audit)),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.routes = stores.routes;
        self.audit = stores.audit;
        self
    }

    pub fn with_secret(mut self, secret: Arc<dyn SecretProvider>) -> Self {
        self.secret = secret;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BluepathConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------------

    /// Open a session explicitly. Reopening a closed id starts a fresh
    /// session whose audit chain continues from the store.
    pub fn open_session(&self, route_id: &str) -> Result<(), SupervisorError> {
        validate_route_id(route_id)?;
        match self.sessions.entry(route_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().lock().state == SessionState::Closed {
                    occupied.insert(Arc::new(self.new_session(route_id)?));
                    info!(route_id, "Session reopened");
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(self.new_session(route_id)?));
                info!(route_id, "Session opened");
            }
        }
        Ok(())
    }

    /// Close a session, cancelling any in-flight run. Terminal for the
    /// session; later calls for the id fail with `SessionClosed` until it is
    /// reopened.
    pub fn close_session(&self, route_id: &str) -> Result<(), SupervisorError> {
        let session = self.existing(route_id)?;
        let mut inner = session.lock();
        if let Some(run) = &inner.run {
            run.cancel.cancel();
        }
        inner.state = SessionState::Closed;
        info!(route_id, entries = inner.chain.len(), "Session closed");
        Ok(())
    }

    pub fn session_state(&self, route_id: &str) -> Option<SessionState> {
        self.sessions.get(route_id).map(|s| s.lock().state)
    }

    pub fn current_route(&self, route_id: &str) -> Option<Route> {
        self.sessions.get(route_id).and_then(|s| s.lock().route.clone())
    }

    /// Route ids with a live or closed session, sorted
    pub fn route_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    // ------------------------------------------------------------------------
    // ComputeRoute
    // ------------------------------------------------------------------------

    /// Plan a route and commit it as the session's next revision.
    ///
    /// Rejected with `AlreadyOptimizing` while a run is active or a replan is
    /// queued for the id. Re-requesting identical endpoints warm-starts from
    /// the retained swarm.
    pub fn compute_route(
        &self,
        route_id: &str,
        start: Waypoint,
        destination: Waypoint,
        weights: OptimizationWeights,
        quantum_mode: bool,
    ) -> Result<PlannedRoute, SupervisorError> {
        // 1. Validate before touching any session
        let request = OptimizationRequest::new(route_id, start, destination, weights)?.with_quantum_mode(quantum_mode);
        let key = self.audit_key()?;
        let session = self.session(route_id)?;

        // 2. Claim the single run slot
        let (request, warm_start, cancel, mut rng) = {
            let mut inner = session.lock();
            self.ensure_open(&session, &inner)?;
            if inner.busy() {
                return Err(SupervisorError::AlreadyOptimizing {
                    route_id: route_id.to_string(),
                });
            }

            let warm_start = match &inner.plan {
                Some(plan) if plan.same_endpoints(start, destination) => inner.seed_swarm.clone(),
                _ => None,
            };
            inner.plan = Some(PlanSpec {
                start,
                destination,
                weights,
                quantum_mode,
            });
            let cancel = CancellationToken::new();
            inner.run = Some(ActiveRun {
                cancel: cancel.clone(),
                replan: false,
            });
            inner.state = SessionState::Optimizing { replan: false };
            let request = request
                .with_revision(inner.next_revision())
                .with_hazard(inner.hazard.clone());
            (request, warm_start, cancel, inner.run_rng())
        };

        info!(
            route_id,
            revision = request.revision,
            warm_start = warm_start.is_some(),
            quantum_mode,
            "Computing route"
        );

        // 3. Optimize with the lock released
        let outcome = self.optimizer.optimize(&request, warm_start.as_ref(), &mut rng, &cancel);

        // 4. Commit unless superseded
        let mut inner = session.lock();
        inner.run = None;
        inner.seed_swarm = Some(outcome.swarm);
        session.notify_run_finished();

        if outcome.cancelled || inner.state == SessionState::Closed {
            if inner.state != SessionState::Closed {
                inner.state = inner.settled_state();
            }
            info!(route_id, iterations = outcome.iterations, "Route computation cancelled before commit");
            return Ok(PlannedRoute {
                route: outcome.route,
                cancelled: true,
            });
        }

        inner.voyage = VoyageProgress::default();
        let route = self.commit(&session, &mut inner, outcome.route, false, warm_start.is_some(), &key)?;
        Ok(PlannedRoute {
            route,
            cancelled: false,
        })
    }

    // ------------------------------------------------------------------------
    // PushTelemetry
    // ------------------------------------------------------------------------

    /// Record a telemetry sample and replan on a hazard breach.
    ///
    /// Samples must arrive in strictly increasing timestamp order per route;
    /// older or equal timestamps are rejected without touching the chain.
    /// On a breach the hazard field is updated, any in-flight run is
    /// cancelled and awaited, and a warm-started replan is committed after a
    /// `ReplanTriggered` entry. Sessions without planned endpoints only
    /// update their hazard field.
    pub fn push_telemetry(&self, route_id: &str, sample: TelemetrySample) -> Result<TelemetryAck, SupervisorError> {
        validate_route_id(route_id)?;
        let key = self.audit_key()?;
        let session = self.session(route_id)?;
        let mut inner = session.lock();
        self.ensure_open(&session, &inner)?;

        // 1. Monotonic timestamps
        if let Some(last) = inner.last_telemetry {
            if sample.timestamp() <= last {
                warn!(
                    target: "bluepath::telemetry",
                    route_id,
                    last = %last,
                    received = %sample.timestamp(),
                    "Rejected out-of-order telemetry sample"
                );
                return Err(SupervisorError::TelemetryOutOfOrder {
                    route_id: route_id.to_string(),
                    last,
                    received: sample.timestamp(),
                });
            }
        }

        // 2. Record
        let entry = inner
            .chain
            .append(AuditAction::TelemetryRecorded, &sample, self.clock.now(), &key)?;
        inner.last_telemetry = Some(sample.timestamp());

        let breach = self.hazard.is_breach(&sample);
        let severity = self.hazard.severity(&sample);
        let mut ack = TelemetryAck {
            route_id: route_id.to_string(),
            entry_id: entry.id,
            breach,
            severity,
            replanned: false,
            revision: inner.route.as_ref().map(|r| r.revision),
        };
        if !breach {
            return Ok(ack);
        }

        // 3. Update the hazard field
        let position_estimate = inner.position_estimate();
        let field = self.hazard.ingest(&inner.hazard, &sample, position_estimate);
        info!(
            route_id,
            severity,
            wave_height_m = sample.wave_height_m(),
            generation = field.generation(),
            "Hazard breach ingested"
        );
        inner.hazard = Arc::new(field);

        let Some(plan) = inner.plan.clone() else {
            debug!(route_id, "No planned endpoints, hazard field updated only");
            return Ok(ack);
        };
        let weights = if self.config.supervisor.safety_boost_on_replan {
            plan.weights.with_safety_boost(severity)
        } else {
            plan.weights
        };
        let request = OptimizationRequest::new(route_id, plan.start, plan.destination, weights)?
            .with_quantum_mode(plan.quantum_mode);

        // 4. Stop the in-flight run, if any, and wait for its swarm
        inner.pending_replans += 1;
        let cancelled_in_flight = match &inner.run {
            Some(run) => {
                debug!(route_id, replan = run.replan, "Cancelling in-flight optimization");
                run.cancel.cancel();
                true
            }
            None => false,
        };
        let mut inner = session.wait_idle(inner);

        if inner.state == SessionState::Closed {
            inner.pending_replans -= 1;
            return Err(SupervisorError::SessionClosed {
                route_id: route_id.to_string(),
            });
        }

        // 5. Log the trigger, then replan from the retained swarm
        let record = ReplanRecord {
            trigger_timestamp: sample.timestamp(),
            severity,
            wave_height_m: sample.wave_height_m(),
            wind_speed_kt: sample.wind_speed_kt(),
            position_estimate,
            cancelled_in_flight,
            hazard_generation: inner.hazard.generation(),
            weights,
        };
        if let Err(e) = inner.chain.append(AuditAction::ReplanTriggered, &record, self.clock.now(), &key) {
            inner.pending_replans -= 1;
            return Err(e.into());
        }

        let request = request
            .with_revision(inner.next_revision())
            .with_hazard(inner.hazard.clone());
        let warm_start = inner.seed_swarm.clone();
        let cancel = CancellationToken::new();
        inner.run = Some(ActiveRun {
            cancel: cancel.clone(),
            replan: true,
        });
        inner.state = SessionState::Optimizing { replan: true };
        let mut rng = inner.run_rng();
        drop(inner);

        info!(route_id, revision = request.revision, severity, "Replanning after hazard breach");
        let outcome = self.optimizer.optimize(&request, warm_start.as_ref(), &mut rng, &cancel);

        // 6. Commit
        let mut inner = session.lock();
        inner.run = None;
        inner.pending_replans -= 1;
        inner.seed_swarm = Some(outcome.swarm);
        session.notify_run_finished();

        if outcome.cancelled || inner.state == SessionState::Closed {
            if inner.state != SessionState::Closed {
                inner.state = inner.settled_state();
            }
            info!(route_id, "Replan superseded by a newer breach");
            ack.revision = inner.route.as_ref().map(|r| r.revision);
            return Ok(ack);
        }

        let route = self.commit(&session, &mut inner, outcome.route, true, warm_start.is_some(), &key)?;
        ack.replanned = true;
        ack.revision = Some(route.revision);
        Ok(ack)
    }

    // ------------------------------------------------------------------------
    // Voyage progress
    // ------------------------------------------------------------------------

    /// Step the voyage forward by `delta_hours` at service speed.
    ///
    /// The resulting position estimate locates later breaching samples that
    /// carry no position of their own.
    pub fn advance(&self, route_id: &str, delta_hours: f64) -> Result<VoyageSnapshot, SupervisorError> {
        if !delta_hours.is_finite() || delta_hours < 0.0 {
            return Err(ValidationError::InvalidStep(delta_hours).into());
        }
        let session = self.existing(route_id)?;
        let mut inner = session.lock();
        self.ensure_open(&session, &inner)?;

        let Some(route) = inner.route.clone() else {
            return Err(SupervisorError::NoRoute {
                route_id: route_id.to_string(),
            });
        };

        let step_nm = delta_hours * self.config.vessel.service_speed_kt;
        inner.voyage.distance_travelled_nm = (inner.voyage.distance_travelled_nm + step_nm).min(route.distance_nm);
        inner.voyage.elapsed_hours += delta_hours;

        let travelled = inner.voyage.distance_travelled_nm;
        let arrived = travelled >= route.distance_nm;
        let position = if arrived {
            route.destination()
        } else {
            route.position_along(travelled)
        };
        let Some(position) = position else {
            return Err(ValidationError::DegenerateRoute.into());
        };
        let progress = if route.distance_nm > 0.0 {
            (travelled / route.distance_nm).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Ok(VoyageSnapshot {
            route_id: route_id.to_string(),
            revision: route.revision,
            state: inner.state,
            position,
            distance_travelled_nm: travelled,
            remaining_nm: (route.distance_nm - travelled).max(0.0),
            elapsed_hours: inner.voyage.elapsed_hours,
            progress,
            arrived,
        })
    }

    // ------------------------------------------------------------------------
    // VerifyChain
    // ------------------------------------------------------------------------

    /// Verify a route's chain. Sessions are snapshotted under their lock;
    /// ids without a session are verified from the audit store.
    pub fn verify_chain(&self, route_id: &str) -> Result<ChainVerification, SupervisorError> {
        let key = self.audit_key()?;
        let entries = self.audit_entries(route_id)?;
        let verification = crate::audit::verify(&entries, &key);
        if verification.valid {
            debug!(route_id, entries = verification.entries_checked, "Audit chain verified");
        } else {
            warn!(
                route_id,
                broken_at = ?verification.broken_at_index,
                reason = ?verification.reason,
                "Audit chain verification failed"
            );
        }
        Ok(verification)
    }

    pub fn audit_entries(&self, route_id: &str) -> Result<Vec<AuditEntry>, SupervisorError> {
        match self.sessions.get(route_id) {
            Some(session) => Ok(session.lock().chain.entries().to_vec()),
            None => Ok(self.audit.load_chain(route_id)?),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn audit_key(&self) -> Result<Vec<u8>, SupervisorError> {
        self.secret
            .audit_key()
            .map_err(|e| SupervisorError::Audit(AuditError::from(e)))
    }

    fn new_session(&self, route_id: &str) -> Result<RouteSession, SupervisorError> {
        let chain = AuditChain::restore(route_id, self.audit.clone())?;
        let route = self.routes.load(route_id)?;
        let mut inner = SessionInner::new(
            chain,
            self.hazard.empty_field(),
            session_rng(self.config.supervisor.seed, route_id),
        );
        inner.last_telemetry = last_recorded_sample(inner.chain.entries());
        if let Some(route) = route {
            debug!(route_id, revision = route.revision, "Resuming committed route");
            inner.plan = last_recorded_plan(inner.chain.entries()).or_else(|| PlanSpec::from_route(&route));
            inner.state = SessionState::Ready;
            inner.route = Some(route);
        }
        Ok(RouteSession::new(route_id.to_string(), inner))
    }

    /// Existing session or a freshly opened one.
    fn session(&self, route_id: &str) -> Result<Arc<RouteSession>, SupervisorError> {
        if let Some(session) = self.sessions.get(route_id) {
            return Ok(session.clone());
        }
        match self.sessions.entry(route_id.to_string()) {
            Entry::Occupied(occupied) => Ok(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let session = Arc::new(self.new_session(route_id)?);
                vacant.insert(session.clone());
                info!(route_id, "Session opened");
                Ok(session)
            }
        }
    }

    fn existing(&self, route_id: &str) -> Result<Arc<RouteSession>, SupervisorError> {
        self.sessions
            .get(route_id)
            .map(|s| s.clone())
            .ok_or_else(|| SupervisorError::NoRoute {
                route_id: route_id.to_string(),
            })
    }

    fn ensure_open(&self, session: &RouteSession, inner: &SessionInner) -> Result<(), SupervisorError> {
        if inner.state == SessionState::Closed {
            return Err(SupervisorError::SessionClosed {
                route_id: session.route_id.clone(),
            });
        }
        Ok(())
    }

    /// Append `RouteComputed`, make the route current and persist it.
    ///
    /// An audit failure leaves the previous route current. A route store
    /// failure after a successful append keeps the new route current and
    /// surfaces the error.
    fn commit(
        &self,
        session: &RouteSession,
        inner: &mut SessionInner,
        route: Route,
        replan: bool,
        warm_start: bool,
        key: &[u8],
    ) -> Result<Route, SupervisorError> {
        let record = RouteComputedRecord {
            replan,
            warm_start,
            plan: inner.plan.as_ref(),
            route: &route,
        };
        if let Err(e) = inner.chain.append(AuditAction::RouteComputed, &record, self.clock.now(), key) {
            if inner.state != SessionState::Closed {
                inner.state = inner.settled_state();
            }
            return Err(e.into());
        }

        inner.route = Some(route.clone());
        if inner.state != SessionState::Closed {
            inner.state = SessionState::Ready;
        }
        info!(
            route_id = %session.route_id,
            revision = route.revision,
            distance_nm = route.distance_nm,
            overall = route.scores.overall,
            converged = route.converged,
            iterations = route.iterations,
            replan,
            "Route committed"
        );

        if let Err(e) = self.routes.save(&route) {
            error!(
                route_id = %session.route_id,
                backend = self.routes.backend_name(),
                error = %e,
                "Failed to store committed route"
            );
            return Err(e.into());
        }
        Ok(route)
    }
}

impl std::fmt::Debug for VoyageSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoyageSupervisor")
            .field("sessions", &self.sessions.len())
            .field("routes", &self.routes.backend_name())
            .field("audit", &self.audit.backend_name())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{ManualClock, StaticSecret};
    use chrono::{Duration, TimeZone};

    fn config() -> BluepathConfig {
        let mut config = BluepathConfig::default();
        config.optimizer.particles = 12;
        config.optimizer.iterations = 25;
        config.optimizer.control_points = 4;
        config.optimizer.parallel = false;
        config.supervisor.seed = Some(7);
        config
    }

    fn supervisor() -> VoyageSupervisor {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        VoyageSupervisor::new(config())
            .with_secret(Arc::new(StaticSecret::new("supervisor-test-secret")))
            .with_clock(Arc::new(ManualClock::new(start)))
    }

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(lat, lon).unwrap()
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn calm(minutes: i64) -> TelemetrySample {
        TelemetrySample::new(t(minutes), 2.0, 15.0, 1.0, 10.0, 26.0).unwrap()
    }

    fn storm(minutes: i64) -> TelemetrySample {
        TelemetrySample::new(t(minutes), 5.2, 45.0, 2.5, 3.0, 24.0).unwrap()
    }

    fn plan(sup: &VoyageSupervisor, id: &str) -> Route {
        sup.compute_route(id, wp(13.08, 80.27), wp(1.29, 103.85), OptimizationWeights::default(), false)
            .unwrap()
            .route
    }

    fn actions(sup: &VoyageSupervisor, id: &str) -> Vec<AuditAction> {
        sup.audit_entries(id).unwrap().iter().map(|e| e.action).collect()
    }

    #[test]
    fn compute_route_commits_revision_one() {
        let sup = supervisor();
        let route = plan(&sup, "r1");
        assert_eq!(route.revision, 1);
        assert_eq!(sup.session_state("r1"), Some(SessionState::Ready));
        assert_eq!(sup.current_route("r1"), Some(route));
        assert_eq!(actions(&sup, "r1"), vec![AuditAction::RouteComputed]);
        assert!(sup.verify_chain("r1").unwrap().valid);
    }

    #[test]
    fn invalid_input_touches_nothing() {
        let sup = supervisor();
        let err = sup
            .compute_route("r1", wp(0.0, 0.0), wp(0.0, 0.0), OptimizationWeights::default(), false)
            .unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidInput(ValidationError::DegenerateRoute)));
        assert_eq!(sup.session_state("r1"), None);
    }

    #[test]
    fn calm_sample_is_recorded_without_replan() {
        let sup = supervisor();
        plan(&sup, "r1");
        let ack = sup.push_telemetry("r1", calm(10)).unwrap();
        assert!(!ack.breach);
        assert!(!ack.replanned);
        assert_eq!(ack.revision, Some(1));
        assert_eq!(
            actions(&sup, "r1"),
            vec![AuditAction::RouteComputed, AuditAction::TelemetryRecorded]
        );
    }

    #[test]
    fn breach_triggers_single_replan() {
        let sup = supervisor();
        plan(&sup, "r1");
        let ack = sup.push_telemetry("r1", storm(10)).unwrap();
        assert!(ack.breach);
        assert!(ack.replanned);
        assert_eq!(ack.revision, Some(2));
        assert!((ack.severity - 0.71).abs() < 1e-9);
        assert_eq!(
            actions(&sup, "r1"),
            vec![
                AuditAction::RouteComputed,
                AuditAction::TelemetryRecorded,
                AuditAction::ReplanTriggered,
                AuditAction::RouteComputed,
            ]
        );
        let route = sup.current_route("r1").unwrap();
        assert!(route.weights.safety() > OptimizationWeights::default().safety());
        assert!(sup.verify_chain("r1").unwrap().valid);
    }

    #[test]
    fn out_of_order_sample_leaves_chain_unchanged() {
        let sup = supervisor();
        plan(&sup, "r1");
        sup.push_telemetry("r1", calm(10)).unwrap();
        let before = sup.audit_entries("r1").unwrap();

        for minutes in [10, 5] {
            let err = sup.push_telemetry("r1", calm(minutes)).unwrap_err();
            assert!(matches!(err, SupervisorError::TelemetryOutOfOrder { .. }));
        }
        assert_eq!(sup.audit_entries("r1").unwrap(), before);
    }

    #[test]
    fn breach_without_plan_only_updates_hazard() {
        let sup = supervisor();
        let ack = sup.push_telemetry("fresh", storm(0)).unwrap();
        assert!(ack.breach);
        assert!(!ack.replanned);
        assert_eq!(ack.revision, None);
        assert_eq!(sup.session_state("fresh"), Some(SessionState::Idle));
        assert_eq!(actions(&sup, "fresh"), vec![AuditAction::TelemetryRecorded]);
    }

    #[test]
    fn advance_moves_along_route() {
        let sup = supervisor();
        let route = plan(&sup, "r1");
        let snap = sup.advance("r1", 10.0).unwrap();
        assert!((snap.distance_travelled_nm - 150.0).abs() < 1e-9);
        assert!(snap.progress > 0.0 && snap.progress < 1.0);
        assert!(!snap.arrived);

        let snap = sup.advance("r1", 10_000.0).unwrap();
        assert!(snap.arrived);
        assert_eq!(snap.position, route.destination().unwrap());
        assert_eq!(snap.remaining_nm, 0.0);

        assert!(matches!(
            sup.advance("r1", -1.0),
            Err(SupervisorError::InvalidInput(ValidationError::InvalidStep(_)))
        ));
    }

    #[test]
    fn closed_session_rejects_work_until_reopened() {
        let sup = supervisor();
        plan(&sup, "r1");
        sup.close_session("r1").unwrap();
        assert_eq!(sup.session_state("r1"), Some(SessionState::Closed));
        assert!(matches!(
            sup.push_telemetry("r1", calm(1)),
            Err(SupervisorError::SessionClosed { .. })
        ));

        sup.open_session("r1").unwrap();
        assert_eq!(sup.session_state("r1"), Some(SessionState::Ready));
        sup.push_telemetry("r1", calm(1)).unwrap();
        assert_eq!(sup.audit_entries("r1").unwrap().len(), 2);
        assert!(sup.verify_chain("r1").unwrap().valid);
    }

    #[test]
    fn replan_request_with_same_endpoints_warm_starts() {
        let sup = supervisor();
        let first = plan(&sup, "r1");
        let second = plan(&sup, "r1");
        assert_eq!(second.revision, 2);
        assert!(second.scores.overall <= first.scores.overall + 1e-12);
    }

    #[test]
    fn reopened_session_keeps_its_telemetry_watermark() {
        let sup = supervisor();
        plan(&sup, "r1");
        sup.push_telemetry("r1", calm(10)).unwrap();
        sup.close_session("r1").unwrap();
        sup.open_session("r1").unwrap();

        for minutes in [5, 10] {
            assert!(matches!(
                sup.push_telemetry("r1", calm(minutes)),
                Err(SupervisorError::TelemetryOutOfOrder { .. })
            ));
        }
        assert_eq!(
            actions(&sup, "r1"),
            vec![AuditAction::RouteComputed, AuditAction::TelemetryRecorded]
        );
        sup.push_telemetry("r1", calm(11)).unwrap();
        assert!(sup.verify_chain("r1").unwrap().valid);
    }

    #[test]
    fn reopened_session_replans_on_breach() {
        let sup = supervisor();
        let first = plan(&sup, "r1");
        sup.close_session("r1").unwrap();
        sup.open_session("r1").unwrap();
        assert_eq!(sup.session_state("r1"), Some(SessionState::Ready));

        let ack = sup.push_telemetry("r1", storm(5)).unwrap();
        assert!(ack.replanned);
        assert_eq!(ack.revision, Some(2));
        assert_eq!(
            actions(&sup, "r1"),
            vec![
                AuditAction::RouteComputed,
                AuditAction::TelemetryRecorded,
                AuditAction::ReplanTriggered,
                AuditAction::RouteComputed,
            ]
        );
        let replanned = sup.current_route("r1").unwrap();
        assert_eq!(replanned.origin(), first.origin());
        assert_eq!(replanned.destination(), first.destination());
    }

    #[test]
    fn resumed_replan_boosts_the_requested_weights() {
        let sup = supervisor();
        plan(&sup, "r1");
        sup.push_telemetry("r1", storm(5)).unwrap();
        sup.close_session("r1").unwrap();
        sup.open_session("r1").unwrap();
        sup.push_telemetry("r1", storm(10)).unwrap();

        let boosted: Vec<f64> = sup
            .audit_entries("r1")
            .unwrap()
            .iter()
            .filter(|e| e.action == AuditAction::ReplanTriggered)
            .map(|e| e.payload_json().unwrap()["weights"]["safety"].as_f64().unwrap())
            .collect();
        assert_eq!(boosted.len(), 2);
        assert!(boosted[0] > 1.0 / 3.0);
        assert!((boosted[0] - boosted[1]).abs() < 1e-9);
    }
}
