//! Shared data structures for closed-loop route planning
//!
//! This module defines the value types that cross component boundaries:
//! - OptimizationWeights: fuel/time/safety priorities, normalized on construction
//! - Route + ScoreBreakdown: optimizer output, immutable once returned
//! - TelemetrySample: environmental reading pushed by the telemetry source
//! - ValidationError: boundary rejections (`InvalidInput`)
//!
//! Every type validates at construction and on deserialization, so values
//! that reach the supervisor or optimizer are always well formed.

mod error;
mod route;
mod telemetry;
mod weights;

pub use error::*;
pub use route::*;
pub use telemetry::*;
pub use weights::*;

pub use crate::geo::Waypoint;
