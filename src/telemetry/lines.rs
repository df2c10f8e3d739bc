//! JSON-lines telemetry source

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use super::{TelemetryEvent, TelemetrySource};
use crate::types::TelemetrySample;

/// Reads one JSON `TelemetrySample` per line from any async reader.
///
/// Blank lines are ignored; malformed or out-of-range samples are logged
/// and skipped.
pub struct LineSource<R> {
    reader: R,
    line_buffer: String,
    name: &'static str,
    skipped: u64,
}

/// Used with the simulator:
/// `voyage-sim --seed 42 | bluepath plan ... --stdin`
pub type StdinSource = LineSource<BufReader<Stdin>>;

impl StdinSource {
    pub fn stdin() -> Self {
        LineSource::new(BufReader::new(tokio::io::stdin()), "stdin")
    }
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, name: &'static str) -> Self {
        Self {
            reader,
            line_buffer: String::with_capacity(512),
            name,
            skipped: 0,
        }
    }

    /// Lines dropped because they did not parse or validate
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[async_trait]
impl<R> TelemetrySource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_sample(&mut self) -> Result<TelemetryEvent> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(TelemetryEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<TelemetrySample>(line) {
                Ok(sample) => return Ok(TelemetryEvent::Sample(sample)),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!("[{}] Skipping malformed telemetry line: {}", self.name, e);
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        self.name
    }
}
