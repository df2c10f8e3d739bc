//! BluePath: Closed-loop Maritime Route Planning
//!
//! Plans routes with a stochastic multi-objective optimizer, replans them
//! when telemetry reports hazardous conditions, and records every decision
//! in a signed, hash-linked audit chain.
//!
//! ## Architecture
//!
//! - **GeoMath** (`geo`): great-circle distance, bearings and interpolation
//! - **Swarm Optimizer** (`optimization`): HACOPSO over lateral corridor offsets
//! - **Hazard Model** (`hazard`): threshold breaches and the spatial penalty field
//! - **Voyage Supervisor** (`supervisor`): per-route sessions, warm-started replans, cancellation
//! - **Audit Chain** (`audit`): tamper-evident log with HMAC-SHA256 signatures
//! - **Storage** (`storage`): in-memory and sled route/audit stores
//! - **Telemetry** (`telemetry`): stdin JSON lines and the seeded voyage simulator

pub mod audit;
pub mod config;
pub mod geo;
pub mod hazard;
pub mod optimization;
pub mod storage;
pub mod supervisor;
pub mod telemetry;
pub mod types;

// Re-export configuration
pub use config::BluepathConfig;

// Re-export commonly used types
pub use types::{OptimizationWeights, Route, ScoreBreakdown, TelemetrySample, ValidationError, Waypoint};

// Re-export the supervisor surface
pub use supervisor::{PlannedRoute, SessionState, SupervisorError, TelemetryAck, VoyageSnapshot, VoyageSupervisor};

// Re-export audit verification
pub use audit::{AuditAction, AuditEntry, ChainVerification, IntegrityError};
