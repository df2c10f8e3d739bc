//! Sled-backed Route and Audit Storage
//!
//! Two trees in one database:
//! - `routes`: key `route_id 0x00 revision(u32 BE)`, value JSON `Route`
//! - `audit`:  key `route_id 0x00 index(u64 BE)`,   value JSON `AuditEntry`
//!
//! Big-endian suffixes keep each route's records in natural order under
//! `scan_prefix`, so loading a chain is a single ordered range scan.

use std::path::Path;
use std::sync::Arc;

use super::persistence::{AuditStore, RouteStore, StoreError};
use crate::audit::AuditEntry;
use crate::types::Route;

const ROUTES_TREE: &str = "routes";
const AUDIT_TREE: &str = "audit";
const KEY_SEPARATOR: u8 = 0x00;

/// Durable store implementing both [`RouteStore`] and [`AuditStore`].
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    routes: sled::Tree,
    audit: sled::Tree,
}

impl SledStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let routes = db.open_tree(ROUTES_TREE)?;
        let audit = db.open_tree(AUDIT_TREE)?;
        tracing::info!("Sled store opened at {:?}", path);
        Ok(Self {
            db: Arc::new(db),
            routes,
            audit,
        })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

fn prefix(route_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(route_id.len() + 1);
    key.extend_from_slice(route_id.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

fn route_key(route_id: &str, revision: u32) -> Vec<u8> {
    let mut key = prefix(route_id);
    key.extend_from_slice(&revision.to_be_bytes());
    key
}

fn audit_key(route_id: &str, index: u64) -> Vec<u8> {
    let mut key = prefix(route_id);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// Route id portion of a key (everything before the last separator + suffix).
fn route_id_of(key: &[u8], suffix_len: usize) -> Option<String> {
    let id_len = key.len().checked_sub(suffix_len + 1)?;
    if key.get(id_len) != Some(&KEY_SEPARATOR) {
        return None;
    }
    String::from_utf8(key[..id_len].to_vec()).ok()
}

impl RouteStore for SledStore {
    fn save(&self, route: &Route) -> Result<(), StoreError> {
        let value = serde_json::to_vec(route)?;
        self.routes.insert(route_key(&route.route_id, route.revision), value)?;
        self.routes.flush()?;
        tracing::debug!(route_id = %route.route_id, revision = route.revision, "Stored route");
        Ok(())
    }

    fn load(&self, route_id: &str) -> Result<Option<Route>, StoreError> {
        match self.routes.scan_prefix(prefix(route_id)).next_back() {
            Some(item) => {
                let (_key, value) = item?;
                Ok(Some(serde_json::from_slice(&value)?))
            }
            None => Ok(None),
        }
    }

    fn revisions(&self, route_id: &str) -> Result<Vec<Route>, StoreError> {
        let mut routes = Vec::new();
        for item in self.routes.scan_prefix(prefix(route_id)) {
            let (_key, value) = item?;
            routes.push(serde_json::from_slice(&value)?);
        }
        Ok(routes)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}

impl AuditStore for SledStore {
    fn persist(&self, route_id: &str, entry: &AuditEntry) -> Result<(), StoreError> {
        let conflict = || StoreError::Conflict {
            route_id: route_id.to_string(),
            index: entry.id,
        };

        // The predecessor must already be stored
        if entry.id > 0 && !self.audit.contains_key(audit_key(route_id, entry.id - 1))? {
            return Err(conflict());
        }

        let value = serde_json::to_vec(entry)?;
        self.audit
            .compare_and_swap(audit_key(route_id, entry.id), None as Option<&[u8]>, Some(value))?
            .map_err(|_| conflict())?;
        self.audit.flush()?;
        Ok(())
    }

    fn load_chain(&self, route_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let mut entries = Vec::new();
        for item in self.audit.scan_prefix(prefix(route_id)) {
            let (_key, value) = item?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }

    fn route_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = Vec::new();
        for item in self.audit.iter() {
            let (key, _value) = item?;
            if let Some(id) = route_id_of(&key, std::mem::size_of::<u64>()) {
                if ids.last() != Some(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
