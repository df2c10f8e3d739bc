//! Persistence traits - pluggable storage backends
//!
//! Route and audit persistence are abstracted so the supervisor can run
//! against different backends without code changes:
//! - `InMemoryRouteStore` / `InMemoryAuditStore`: tests and ephemeral sessions
//! - `SledStore`: durable embedded database (see `sled_store`)

use std::collections::HashMap;
use std::sync::RwLock;

use crate::audit::AuditEntry;
use crate::types::Route;

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    /// An entry with the same (route id, index) is already stored, or the
    /// index does not extend the stored chain
    #[error("audit entry {index} for route '{route_id}' conflicts with stored chain")]
    Conflict { route_id: String, index: u64 },
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Committed routes, keyed by route id and revision.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across sessions.
pub trait RouteStore: Send + Sync {
    /// Store a committed route revision
    fn save(&self, route: &Route) -> Result<(), StoreError>;

    /// Latest revision for a route id
    fn load(&self, route_id: &str) -> Result<Option<Route>, StoreError>;

    /// All stored revisions for a route id, oldest first
    fn revisions(&self, route_id: &str) -> Result<Vec<Route>, StoreError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Append-only audit entries, keyed by route id and entry index.
pub trait AuditStore: Send + Sync {
    /// Persist the next entry of a route's chain. Fails with
    /// [`StoreError::Conflict`] unless `entry.id` equals the stored length.
    fn persist(&self, route_id: &str, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Full chain for a route id, ordered by index
    fn load_chain(&self, route_id: &str) -> Result<Vec<AuditEntry>, StoreError>;

    /// Route ids with at least one stored entry, sorted
    fn route_ids(&self) -> Result<Vec<String>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// In-memory backends
// ============================================================================

/// In-memory route store. Not durable, data is lost on restart.
#[derive(Default)]
pub struct InMemoryRouteStore {
    routes: RwLock<HashMap<String, Vec<Route>>>,
}

impl InMemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RouteStore for InMemoryRouteStore {
    fn save(&self, route: &Route) -> Result<(), StoreError> {
        let mut store = self
            .routes
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let revisions = store.entry(route.route_id.clone()).or_default();
        // Same revision overwrites, matching the keyed sled layout
        revisions.retain(|r| r.revision != route.revision);
        revisions.push(route.clone());
        revisions.sort_by_key(|r| r.revision);
        Ok(())
    }

    fn load(&self, route_id: &str) -> Result<Option<Route>, StoreError> {
        let store = self
            .routes
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(store.get(route_id).and_then(|r| r.last().cloned()))
    }

    fn revisions(&self, route_id: &str) -> Result<Vec<Route>, StoreError> {
        let store = self
            .routes
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(store.get(route_id).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

/// In-memory audit store. Not durable, data is lost on restart.
#[derive(Default)]
pub struct InMemoryAuditStore {
    chains: RwLock<HashMap<String, Vec<AuditEntry>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn persist(&self, route_id: &str, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut store = self
            .chains
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let chain = store.entry(route_id.to_string()).or_default();
        if entry.id != chain.len() as u64 {
            return Err(StoreError::Conflict {
                route_id: route_id.to_string(),
                index: entry.id,
            });
        }
        chain.push(entry.clone());
        Ok(())
    }

    fn load_chain(&self, route_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let store = self
            .chains
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(store.get(route_id).cloned().unwrap_or_default())
    }

    fn route_ids(&self) -> Result<Vec<String>, StoreError> {
        let store = self
            .chains
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let mut ids: Vec<String> = store
            .iter()
            .filter(|(_, chain)| !chain.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};

    use crate::audit::{AuditAction, AuditEntry, GENESIS_HASH};
    use crate::geo::Waypoint;
    use crate::types::{OptimizationWeights, Route, ScoreBreakdown};

    pub fn route(route_id: &str, revision: u32) -> Route {
        let weights = OptimizationWeights::default();
        let a = Waypoint::new(13.08, 80.27).unwrap();
        let b = Waypoint::new(1.29, 103.85).unwrap();
        Route {
            route_id: route_id.to_string(),
            revision,
            waypoints: vec![a, b],
            distance_nm: 1590.0,
            eta_hours: 106.0,
            fuel_estimate_tons: 700.0,
            scores: ScoreBreakdown::from_costs(&weights, 0.3, 0.2, 0.1),
            weights,
            converged: true,
            iterations: 40,
            quantum_mode: false,
        }
    }

    /// Chain of `n` sealed entries with valid linkage.
    pub fn entries(n: usize) -> Vec<AuditEntry> {
        let mut prev = GENESIS_HASH.to_string();
        (0..n)
            .map(|i| {
                let ts = Utc.with_ymd_and_hms(2025, 3, 1, 0, i as u32, 0).unwrap();
                let entry = AuditEntry::seal(
                    i as u64,
                    AuditAction::TelemetryRecorded,
                    format!(r#"{{"seq":{i}}}"#),
                    ts,
                    &prev,
                    b"store-test-key",
                )
                .unwrap();
                prev = entry.hash.clone();
                entry
            })
            .collect()
    }
}
