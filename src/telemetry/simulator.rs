//! Seeded voyage telemetry simulator
//!
//! Normal conditions with Gaussian noise, a storm from 30% to 60% of the
//! voyage, then recovery. Used by the `voyage-sim` binary and as an
//! in-process source for the `bluepath` runner.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::{TelemetryEvent, TelemetrySource};
use crate::config::defaults;
use crate::types::{Route, TelemetrySample, ValidationError, MAX_TEMPERATURE_C, MIN_TEMPERATURE_C};

/// Mean conditions the noise is applied around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionProfile {
    pub wave_height_m: f64,
    pub wind_speed_kt: f64,
    pub current_kt: f64,
    pub visibility_nm: f64,
    pub temperature_c: f64,
}

impl ConditionProfile {
    pub const NORMAL: Self = Self {
        wave_height_m: 2.5,
        wind_speed_kt: 20.0,
        current_kt: 1.0,
        visibility_nm: 10.0,
        temperature_c: 25.0,
    };

    pub const STORM: Self = Self {
        wave_height_m: 6.0,
        wind_speed_kt: 45.0,
        current_kt: 2.5,
        visibility_nm: 3.0,
        temperature_c: 25.0,
    };
}

// Noise standard deviations
const WAVE_SD: f64 = 1.0;
const WIND_SD: f64 = 5.0;
const CURRENT_SD: f64 = 0.5;
const VISIBILITY_SD: f64 = 3.0;
const TEMPERATURE_SD: f64 = 2.0;

// Physical floors applied after noise
const MIN_WAVE_M: f64 = 0.5;
const MIN_WIND_KT: f64 = 5.0;
const MIN_VISIBILITY_NM: f64 = 1.0;

/// Deterministic sample generator for one voyage.
#[derive(Debug, Clone)]
pub struct TelemetrySimulator {
    rng: StdRng,
    start: DateTime<Utc>,
    interval: Duration,
    total: usize,
    emitted: usize,
    storm_start: f64,
    storm_end: f64,
    /// Route and speed used to attach position fixes
    track: Option<(Route, f64)>,
}

impl TelemetrySimulator {
    pub fn new(seed: u64, start: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            start,
            interval: Duration::minutes(defaults::SIM_SAMPLE_INTERVAL_MINUTES),
            total: defaults::SIM_SAMPLES,
            emitted: 0,
            storm_start: defaults::SIM_STORM_START,
            storm_end: defaults::SIM_STORM_END,
            track: None,
        }
    }

    pub fn with_samples(mut self, total: usize) -> Self {
        self.total = total;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Storm window as fractions of the voyage; `start >= end` disables it.
    pub fn with_storm(mut self, start: f64, end: f64) -> Self {
        self.storm_start = start;
        self.storm_end = end;
        self
    }

    /// Attach position fixes along `route` sailed at `speed_kt`.
    pub fn with_track(mut self, route: Route, speed_kt: f64) -> Self {
        self.track = Some((route, speed_kt));
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.emitted)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when sample `index` falls inside the storm window.
    pub fn in_storm(&self, index: usize) -> bool {
        let begin = (self.total as f64 * self.storm_start) as usize;
        let end = (self.total as f64 * self.storm_end) as usize;
        (begin..end).contains(&index)
    }

    /// Next sample, or `None` once the voyage is complete.
    pub fn next_sample(&mut self) -> Option<Result<TelemetrySample, ValidationError>> {
        if self.emitted >= self.total {
            return None;
        }
        let index = self.emitted;
        self.emitted += 1;
        Some(self.sample_at(index))
    }

    fn sample_at(&mut self, index: usize) -> Result<TelemetrySample, ValidationError> {
        let base = if self.in_storm(index) {
            ConditionProfile::STORM
        } else {
            ConditionProfile::NORMAL
        };

        let wave = (base.wave_height_m + self.noise(WAVE_SD)).max(MIN_WAVE_M);
        let wind = (base.wind_speed_kt + self.noise(WIND_SD)).max(MIN_WIND_KT);
        let current = (base.current_kt + self.noise(CURRENT_SD)).max(0.0);
        let visibility = (base.visibility_nm + self.noise(VISIBILITY_SD)).max(MIN_VISIBILITY_NM);
        let temperature = (base.temperature_c + self.noise(TEMPERATURE_SD)).clamp(MIN_TEMPERATURE_C, MAX_TEMPERATURE_C);

        let elapsed = self.interval * index as i32;
        let sample = TelemetrySample::new(
            self.start + elapsed,
            round2(wave),
            round2(wind),
            round2(current),
            round2(visibility),
            round2(temperature),
        )?;

        let hours = elapsed.num_seconds() as f64 / 3600.0;
        let position = self
            .track
            .as_ref()
            .and_then(|(route, speed_kt)| route.position_along(hours * speed_kt));
        Ok(match position {
            Some(position) => sample.with_position(position),
            None => sample,
        })
    }

    fn noise(&mut self, sd: f64) -> f64 {
        Normal::new(0.0, sd).map_or(0.0, |n| n.sample(&mut self.rng))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Simulated Source
// ============================================================================

/// [`TelemetrySource`] over a simulator with optional pacing.
pub struct SimulatedSource {
    simulator: TelemetrySimulator,
    delay_ms: u64,
    yielded_first: bool,
}

impl SimulatedSource {
    pub fn new(simulator: TelemetrySimulator, delay_ms: u64) -> Self {
        Self {
            simulator,
            delay_ms,
            yielded_first: false,
        }
    }
}

#[async_trait]
impl TelemetrySource for SimulatedSource {
    async fn next_sample(&mut self) -> Result<TelemetryEvent> {
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.simulator.next_sample() {
            Some(sample) => {
                self.yielded_first = true;
                Ok(TelemetryEvent::Sample(sample?))
            }
            None => Ok(TelemetryEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    fn drain(mut sim: TelemetrySimulator) -> Vec<TelemetrySample> {
        std::iter::from_fn(|| sim.next_sample()).map(|s| s.unwrap()).collect()
    }

    #[test]
    fn same_seed_same_voyage() {
        let a = drain(TelemetrySimulator::new(42, start()));
        let b = drain(TelemetrySimulator::new(42, start()));
        let c = drain(TelemetrySimulator::new(43, start()));
        assert_eq!(a.len(), defaults::SIM_SAMPLES);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn timestamps_strictly_increase() {
        let samples = drain(TelemetrySimulator::new(1, start()).with_samples(10));
        for pair in samples.windows(2) {
            assert!(pair[1].timestamp() > pair[0].timestamp());
        }
    }

    #[test]
    fn storm_window_is_rougher() {
        let sim = TelemetrySimulator::new(7, start()).with_samples(100);
        assert!(!sim.in_storm(29));
        assert!(sim.in_storm(30));
        assert!(sim.in_storm(59));
        assert!(!sim.in_storm(60));

        let samples = drain(sim);
        let mean = |range: std::ops::Range<usize>| {
            let n = range.len() as f64;
            samples[range].iter().map(TelemetrySample::wave_height_m).sum::<f64>() / n
        };
        assert!(mean(30..60) > mean(0..30) + 2.0);
        assert!(mean(30..60) > mean(60..100) + 2.0);
    }

    #[test]
    fn floors_hold() {
        for s in drain(TelemetrySimulator::new(3, start()).with_samples(200)) {
            assert!(s.wave_height_m() >= MIN_WAVE_M);
            assert!(s.wind_speed_kt() >= MIN_WIND_KT);
            assert!(s.visibility_nm() >= MIN_VISIBILITY_NM);
        }
    }

    #[tokio::test]
    async fn source_ends_with_eof() {
        let sim = TelemetrySimulator::new(5, start()).with_samples(2);
        let mut source = SimulatedSource::new(sim, 0);
        assert!(matches!(source.next_sample().await.unwrap(), TelemetryEvent::Sample(_)));
        assert!(matches!(source.next_sample().await.unwrap(), TelemetryEvent::Sample(_)));
        assert_eq!(source.next_sample().await.unwrap(), TelemetryEvent::Eof);
    }

    #[test]
    fn paced_source_matches_simulator() {
        let expected = drain(TelemetrySimulator::new(11, start()).with_samples(3));
        let mut source = SimulatedSource::new(TelemetrySimulator::new(11, start()).with_samples(3), 1);
        assert_eq!(source.source_name(), "simulator");
        for sample in expected {
            let event = tokio_test::block_on(source.next_sample()).unwrap();
            assert_eq!(event, TelemetryEvent::Sample(sample));
        }
    }
}
