//! Route and Audit Storage
//!
//! Committed routes and audit chains are persisted through two traits,
//! [`RouteStore`] and [`AuditStore`], so the supervisor does not care which
//! backend is in use. In-memory backends serve tests and ephemeral runs; the
//! sled backend is the durable option and is guarded by a [`ProcessLock`].

pub mod lockfile;
pub mod persistence;
mod sled_store;

pub use lockfile::{LockError, ProcessLock};
pub use persistence::{AuditStore, InMemoryAuditStore, InMemoryRouteStore, RouteStore, StoreError};
pub use sled_store::SledStore;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

/// Database directory name inside `storage.data_dir`
const DB_DIR_NAME: &str = "bluepath.db";

/// Route and audit backends selected by configuration.
#[derive(Clone)]
pub struct Stores {
    pub routes: Arc<dyn RouteStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            routes: Arc::new(InMemoryRouteStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.audit.backend_name()
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("routes", &self.routes.backend_name())
            .field("audit", &self.audit.backend_name())
            .finish()
    }
}

/// Open the backends named by `config`.
///
/// The sled backend shares one database between both stores. Callers that
/// run as a long-lived process should hold a [`ProcessLock`] on
/// `config.data_dir` first.
pub fn open_stores(config: &StorageConfig) -> Result<Stores, StoreError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory route and audit storage");
            Ok(Stores::in_memory())
        }
        StorageBackend::Sled => {
            std::fs::create_dir_all(&config.data_dir)
                .map_err(|e| StoreError::Storage(format!("{}: {}", config.data_dir.display(), e)))?;
            let store = Arc::new(SledStore::open(config.data_dir.join(DB_DIR_NAME))?);
            Ok(Stores {
                routes: store.clone(),
                audit: store,
            })
        }
    }
}
