//! Voyage Telemetry Simulation
//!
//! Emits seeded environmental telemetry as JSON lines for driving BluePath:
//! - Normal conditions (wave ~2.5 m, wind ~20 kt)
//! - Storm from 30% to 60% of the voyage (wave ~6 m, wind ~45 kt)
//! - Recovery to normal conditions
//!
//! # Usage
//! ```bash
//! voyage-sim --seed 42 --samples 48 | bluepath --stdin
//! ```

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use tracing::info;

use bluepath::config::defaults;
use bluepath::telemetry::TelemetrySimulator;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "voyage-sim")]
#[command(about = "Seeded maritime telemetry simulation for BluePath")]
#[command(version)]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of samples to emit
    #[arg(short = 'n', long, default_value_t = defaults::SIM_SAMPLES)]
    samples: usize,

    /// Simulated minutes between samples
    #[arg(short, long, default_value_t = defaults::SIM_SAMPLE_INTERVAL_MINUTES,
          value_parser = clap::value_parser!(i64).range(1..=1440))]
    interval_minutes: i64,

    /// Voyage start time (RFC 3339); defaults to now
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Storm onset as a fraction of the voyage
    #[arg(long, default_value_t = defaults::SIM_STORM_START)]
    storm_start: f64,

    /// Storm end as a fraction of the voyage
    #[arg(long, default_value_t = defaults::SIM_STORM_END)]
    storm_end: f64,

    /// Wall-clock delay between lines in milliseconds
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Suppress the mission log on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Mission log goes to stderr so stdout stays pure JSON lines
    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let start = args.start.unwrap_or_else(Utc::now);
    let mut simulator = TelemetrySimulator::new(args.seed, start)
        .with_samples(args.samples)
        .with_interval(Duration::minutes(args.interval_minutes))
        .with_storm(args.storm_start, args.storm_end);

    info!(
        "🌊 {} samples every {} min from {} (seed {})",
        args.samples, args.interval_minutes, start, args.seed
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut index = 0usize;
    while let Some(sample) = simulator.next_sample() {
        let sample = sample.context("Simulator produced an invalid sample")?;
        if simulator.in_storm(index) {
            info!(
                "[{:3}] ⛈️  wave {:.2} m | wind {:.1} kt | visibility {:.1} nm",
                index,
                sample.wave_height_m(),
                sample.wind_speed_kt(),
                sample.visibility_nm()
            );
        } else {
            info!(
                "[{:3}] wave {:.2} m | wind {:.1} kt | visibility {:.1} nm",
                index,
                sample.wave_height_m(),
                sample.wind_speed_kt(),
                sample.visibility_nm()
            );
        }

        serde_json::to_writer(&mut out, &sample)?;
        writeln!(out)?;
        out.flush()?;

        index += 1;
        if args.delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(args.delay_ms));
        }
    }

    info!("✓ Simulation complete");
    Ok(())
}
