//! BluePath - closed-loop voyage planner
//!
//! Plans a route, drives it with telemetry, replans on hazard breaches and
//! verifies the audit chain at the end.
//!
//! # Usage
//!
//! ```bash
//! # Chennai -> Singapore with the built-in storm simulator
//! BLUEPATH_AUDIT_SECRET=... bluepath --seed 42
//!
//! # Telemetry from the standalone simulator
//! voyage-sim --seed 42 | bluepath --stdin
//!
//! # Re-verify every chain persisted in the sled store
//! bluepath --storage sled --verify-only
//! ```
//!
//! # Environment Variables
//!
//! - `BLUEPATH_CONFIG`: Path to the TOML configuration
//! - `BLUEPATH_AUDIT_SECRET`: HMAC key for the audit chain (>= 16 bytes)
//! - `RUST_LOG`: Logging level (default: info)
//! - `BLUEPATH_LOG_JSON`: Emit JSON log lines when set to true

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use bluepath::audit::{self, EnvSecret, SecretProvider, StaticSecret};
use bluepath::config::{BluepathConfig, StorageBackend};
use bluepath::storage::{self, ProcessLock, Stores};
use bluepath::telemetry::{SimulatedSource, StdinSource, TelemetryEvent, TelemetrySimulator, TelemetrySource};
use bluepath::{OptimizationWeights, SupervisorError, TelemetrySample, VoyageSupervisor, Waypoint};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "bluepath")]
#[command(about = "BluePath closed-loop maritime route planner")]
#[command(version)]
struct CliArgs {
    /// Route identifier (audit chain and store key)
    #[arg(long, default_value = "voyage-001")]
    route_id: String,

    /// Origin as LAT,LON in degrees
    #[arg(long, default_value = "13.08,80.27", value_parser = parse_waypoint)]
    from: Waypoint,

    /// Destination as LAT,LON in degrees
    #[arg(long, default_value = "1.29,103.85", value_parser = parse_waypoint)]
    to: Waypoint,

    /// Fuel priority (normalized with time and safety)
    #[arg(long, default_value = "1.0")]
    fuel: f64,

    /// Time priority
    #[arg(long, default_value = "1.0")]
    time: f64,

    /// Safety priority
    #[arg(long, default_value = "1.0")]
    safety: f64,

    /// Enable quantum superposition moves
    #[arg(long)]
    quantum: bool,

    /// Read telemetry as JSON lines from stdin instead of the simulator
    #[arg(long)]
    stdin: bool,

    /// Master seed for the optimizer and simulator
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated samples to generate
    #[arg(long)]
    samples: Option<usize>,

    /// Delay between simulated samples in milliseconds
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Configuration file (overrides BLUEPATH_CONFIG and ./bluepath.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage backend override
    #[arg(long, value_parser = parse_backend)]
    storage: Option<StorageBackend>,

    /// Audit HMAC key; falls back to the variable named in [audit] secret_env
    #[arg(long, env = "BLUEPATH_AUDIT_SECRET", hide_env_values = true)]
    audit_secret: Option<String>,

    /// Only verify persisted audit chains, then exit
    #[arg(long)]
    verify_only: bool,

    /// Emit logs as JSON objects
    #[arg(long, env = "BLUEPATH_LOG_JSON")]
    log_json: bool,
}

fn parse_waypoint(s: &str) -> Result<Waypoint, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{s}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    Waypoint::new(lat, lon).map_err(|e| e.to_string())
}

fn parse_backend(s: &str) -> Result<StorageBackend, String> {
    match s.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "sled" => Ok(StorageBackend::Sled),
        other => Err(format!("unknown storage backend '{other}' (memory, sled)")),
    }
}

// ============================================================================
// Setup
// ============================================================================

fn load_config(args: &CliArgs) -> Result<BluepathConfig> {
    let mut config = match &args.config {
        Some(path) => BluepathConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BluepathConfig::load(),
    };
    if let Some(backend) = args.storage {
        config.storage.backend = backend;
    }
    if args.seed.is_some() {
        config.supervisor.seed = args.seed;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn secret_provider(args: &CliArgs, config: &BluepathConfig) -> Result<Arc<dyn SecretProvider>> {
    let provider: Arc<dyn SecretProvider> = match &args.audit_secret {
        Some(secret) if secret.len() >= config.audit.min_secret_len => Arc::new(StaticSecret::new(secret.as_bytes())),
        Some(secret) => bail!(
            "Audit secret is {} bytes, need at least {}",
            secret.len(),
            config.audit.min_secret_len
        ),
        None => Arc::new(EnvSecret::from_config(&config.audit)),
    };
    provider.audit_key().context("Audit key unavailable")?;
    Ok(provider)
}

/// Verify every chain in the store; fails if any is broken.
fn verify_all(stores: &Stores, secret: &dyn SecretProvider) -> Result<()> {
    let key = secret.audit_key()?;
    let route_ids = stores.audit.route_ids()?;
    if route_ids.is_empty() {
        warn!("No audit chains found in {} store", stores.backend_name());
        return Ok(());
    }

    let mut broken = 0usize;
    for route_id in &route_ids {
        let entries = stores.audit.load_chain(route_id)?;
        let verification = audit::verify(&entries, &key);
        if verification.valid {
            info!("✓ {}: {} entries verified", route_id, verification.entries_checked);
        } else {
            broken += 1;
            error!(
                "✗ {}: broken at index {:?} ({:?})",
                route_id, verification.broken_at_index, verification.reason
            );
        }
    }

    if broken > 0 {
        bail!("{} of {} audit chains failed verification", broken, route_ids.len());
    }
    Ok(())
}

// ============================================================================
// Voyage Loop
// ============================================================================

/// Feed samples from `source` into the supervisor until EOF or shutdown.
async fn run_voyage<S: TelemetrySource>(
    supervisor: Arc<VoyageSupervisor>,
    route_id: String,
    mut source: S,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("📥 Input: {}", source.source_name());
    let mut last_timestamp: Option<chrono::DateTime<chrono::Utc>> = None;
    let mut samples = 0u64;
    let mut replans = 0u64;

    loop {
        let event = tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Shutdown requested, stopping telemetry intake");
                break;
            }
            event = source.next_sample() => event?,
        };
        let sample: TelemetrySample = match event {
            TelemetryEvent::Sample(sample) => sample,
            TelemetryEvent::Eof => break,
        };

        // Step voyage progress by the sample spacing
        if let Some(last) = last_timestamp {
            let hours = (sample.timestamp() - last).num_seconds() as f64 / 3600.0;
            if hours > 0.0 {
                let snapshot = supervisor.advance(&route_id, hours)?;
                if snapshot.arrived {
                    info!("⚓ Arrived after {:.1} h", snapshot.elapsed_hours);
                }
            }
        }

        let sup = supervisor.clone();
        let id = route_id.clone();
        let timestamp = sample.timestamp();
        let result = tokio::task::spawn_blocking(move || sup.push_telemetry(&id, sample))
            .await
            .context("Telemetry task panicked")?;

        match result {
            Ok(ack) => {
                samples += 1;
                last_timestamp = Some(timestamp);
                if ack.replanned {
                    replans += 1;
                    warn!(
                        "⚠️  Hazard breach at {} (severity {:.2}), route replanned to revision {:?}",
                        timestamp, ack.severity, ack.revision
                    );
                } else if ack.breach {
                    warn!("⚠️  Hazard breach at {} (severity {:.2})", timestamp, ack.severity);
                }
            }
            Err(SupervisorError::TelemetryOutOfOrder { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    info!("📊 {} samples recorded, {} replans", samples, replans);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
    let config = load_config(&args)?;
    let secret = secret_provider(&args, &config)?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  BluePath - Closed-loop Maritime Route Planning");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let _process_lock = match config.storage.backend {
        StorageBackend::Sled => Some(
            ProcessLock::acquire(&config.storage.data_dir).context("Failed to acquire process lock")?,
        ),
        StorageBackend::Memory => None,
    };
    let stores = storage::open_stores(&config.storage).context("Failed to open storage")?;
    info!("💾 Storage: {}", stores.backend_name());

    if args.verify_only {
        return verify_all(&stores, secret.as_ref());
    }

    let weights = OptimizationWeights::new(args.fuel, args.time, args.safety)?;
    let supervisor = Arc::new(
        VoyageSupervisor::new(config.clone())
            .with_stores(stores)
            .with_secret(secret),
    );

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // Initial plan
    info!("🧭 Planning {} from {} to {}", args.route_id, args.from, args.to);
    let planned = {
        let sup = supervisor.clone();
        let (id, from, to, quantum) = (args.route_id.clone(), args.from, args.to, args.quantum);
        tokio::task::spawn_blocking(move || sup.compute_route(&id, from, to, weights, quantum))
            .await
            .context("Optimizer task panicked")??
    };
    info!("✓ {}", planned.route);

    // Telemetry
    if args.stdin {
        run_voyage(supervisor.clone(), args.route_id.clone(), StdinSource::stdin(), cancel_token).await?;
    } else {
        let seed = config.supervisor.seed.unwrap_or_else(rand::random);
        let mut simulator = TelemetrySimulator::new(seed, chrono::Utc::now())
            .with_track(planned.route.clone(), config.vessel.service_speed_kt);
        if let Some(samples) = args.samples {
            simulator = simulator.with_samples(samples);
        }
        info!("🌊 Simulating {} samples (seed {})", simulator.total(), seed);
        let source = SimulatedSource::new(simulator, args.delay_ms);
        run_voyage(supervisor.clone(), args.route_id.clone(), source, cancel_token).await?;
    }

    // Final state
    if let Some(route) = supervisor.current_route(&args.route_id) {
        info!("✓ Final {}", route);
        println!("{}", serde_json::to_string_pretty(&route)?);
    }

    let verification = supervisor.verify_chain(&args.route_id)?;
    if verification.valid {
        info!("🔐 Audit chain verified ({} entries)", verification.entries_checked);
    } else {
        verification.into_result().context("Audit chain verification failed")?;
    }

    supervisor.close_session(&args.route_id)?;
    info!("✓ BluePath shutdown complete");
    Ok(())
}
