//! Telemetry sources for sample ingestion.
//!
//! Provides a unified trait for reading environmental samples from different
//! sources: stdin (JSON lines) and the seeded voyage simulator.

mod lines;
mod simulator;

pub use lines::{LineSource, StdinSource};
pub use simulator::{ConditionProfile, SimulatedSource, TelemetrySimulator};

use anyhow::Result;
use async_trait::async_trait;

use crate::types::TelemetrySample;

/// Events produced by a telemetry source.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A validated sample was read.
    Sample(TelemetrySample),
    /// Source reached end of data.
    Eof,
}

/// Trait abstracting where telemetry samples come from.
///
/// Implementations handle format parsing and pacing internally. Samples
/// that fail validation are skipped with a warning, never surfaced.
#[async_trait]
pub trait TelemetrySource: Send + 'static {
    /// Read the next sample, or `TelemetryEvent::Eof` when no more data is
    /// available. Returns `Err` on unrecoverable I/O errors.
    async fn next_sample(&mut self) -> Result<TelemetryEvent>;

    /// Human-readable name for logging (e.g. "stdin", "simulator").
    fn source_name(&self) -> &str;
}
