//! BluePath Configuration - optimizer, hazard, vessel and audit tunables
//!
//! Every hyperparameter and threshold is a field in this module. Each struct
//! implements `Default` with the values in `config::defaults`, so a missing
//! file or a partial file behaves exactly like the built-in settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV: &str = "BLUEPATH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "bluepath.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a planning deployment.
///
/// Load with `BluepathConfig::load()` which searches:
/// 1. `$BLUEPATH_CONFIG` env var
/// 2. `./bluepath.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BluepathConfig {
    /// Swarm optimizer hyperparameters
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Breach thresholds and hazard field shape
    #[serde(default)]
    pub hazard: HazardConfig,

    /// Vessel performance model
    #[serde(default)]
    pub vessel: VesselConfig,

    /// Session and replan behaviour
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Audit chain signing
    #[serde(default)]
    pub audit: AuditConfig,

    /// Persistence backend
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BluepathConfig {
    /// Load configuration using the standard search order:
    /// 1. `$BLUEPATH_CONFIG` environment variable
    /// 2. `./bluepath.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Toml(e) => ConfigError::Parse(path.to_path_buf(), e),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings only; validation failures are
    /// collected and returned together.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self = toml::from_str(contents).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Every floating-point value must be finite
    /// - Counts, intervals and divisors must be positive
    /// - Fractions must lie in [0, 1]
    /// - Start/end schedules and corridor bounds must be ordered sensibly
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        self.optimizer.check(&mut errors);
        self.hazard.check(&mut errors);
        self.vessel.check(&mut errors);

        if self.audit.secret_env.trim().is_empty() {
            errors.push("audit.secret_env must not be empty".to_string());
        }
        if self.audit.min_secret_len == 0 {
            errors.push("audit.min_secret_len must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn check_finite(name: &str, value: f64, errors: &mut Vec<String>) -> bool {
    if value.is_finite() {
        true
    } else {
        errors.push(format!("{name} must be a finite number (got {value})"));
        false
    }
}

fn check_positive(name: &str, value: f64, errors: &mut Vec<String>) {
    if check_finite(name, value, errors) && value <= 0.0 {
        errors.push(format!("{name} must be > 0 (got {value})"));
    }
}

fn check_non_negative(name: &str, value: f64, errors: &mut Vec<String>) {
    if check_finite(name, value, errors) && value < 0.0 {
        errors.push(format!("{name} must be >= 0 (got {value})"));
    }
}

fn check_fraction(name: &str, value: f64, errors: &mut Vec<String>) {
    if check_finite(name, value, errors) && !(0.0..=1.0).contains(&value) {
        errors.push(format!("{name} must be within [0, 1] (got {value})"));
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config parse error: {0}")]
    Toml(#[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Optimizer
// ============================================================================

/// HACOPSO hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_particles")]
    pub particles: usize,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Intermediate control points encoded by each particle
    #[serde(default = "default_control_points")]
    pub control_points: usize,

    #[serde(default = "default_inertia_start")]
    pub inertia_start: f64,

    #[serde(default = "default_inertia_end")]
    pub inertia_end: f64,

    #[serde(default = "default_cognitive_start")]
    pub cognitive_start: f64,

    #[serde(default = "default_cognitive_end")]
    pub cognitive_end: f64,

    #[serde(default = "default_social_start")]
    pub social_start: f64,

    #[serde(default = "default_social_end")]
    pub social_end: f64,

    /// Share of particles kicked by the logistic map each iteration
    #[serde(default = "default_chaos_fraction")]
    pub chaos_fraction: f64,

    /// Chaotic kick magnitude relative to the search span
    #[serde(default = "default_chaos_factor")]
    pub chaos_factor: f64,

    #[serde(default = "default_obl_interval")]
    pub obl_interval: u32,

    #[serde(default = "default_obl_fraction")]
    pub obl_fraction: f64,

    #[serde(default = "default_quantum_interval")]
    pub quantum_interval: u32,

    /// Quantum exploration jitter relative to the search span
    #[serde(default = "default_quantum_jitter")]
    pub quantum_jitter: f64,

    /// Initial Metropolis temperature, decays linearly to zero
    #[serde(default = "default_quantum_temperature")]
    pub quantum_temperature: f64,

    #[serde(default = "default_stall_window")]
    pub stall_window: u32,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_max_velocity_ratio")]
    pub max_velocity_ratio: f64,

    /// Corridor half-width as a fraction of the direct distance
    #[serde(default = "default_corridor_ratio")]
    pub corridor_ratio: f64,

    #[serde(default = "default_min_corridor_nm")]
    pub min_corridor_nm: f64,

    #[serde(default = "default_max_corridor_nm")]
    pub max_corridor_nm: f64,

    /// Distance at which fuel and time costs saturate
    #[serde(default = "default_reference_distance_nm")]
    pub reference_distance_nm: f64,

    #[serde(default = "default_rough_water_factor")]
    pub rough_water_factor: f64,

    #[serde(default = "default_samples_per_leg")]
    pub samples_per_leg: usize,

    /// Evaluate fitness on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_particles() -> usize { defaults::SWARM_PARTICLES }
fn default_iterations() -> u32 { defaults::SWARM_ITERATIONS }
fn default_control_points() -> usize { defaults::SWARM_CONTROL_POINTS }
fn default_inertia_start() -> f64 { defaults::INERTIA_START }
fn default_inertia_end() -> f64 { defaults::INERTIA_END }
fn default_cognitive_start() -> f64 { defaults::COGNITIVE_START }
fn default_cognitive_end() -> f64 { defaults::COGNITIVE_END }
fn default_social_start() -> f64 { defaults::SOCIAL_START }
fn default_social_end() -> f64 { defaults::SOCIAL_END }
fn default_chaos_fraction() -> f64 { defaults::CHAOS_FRACTION }
fn default_chaos_factor() -> f64 { defaults::CHAOS_FACTOR }
fn default_obl_interval() -> u32 { defaults::OBL_INTERVAL }
fn default_obl_fraction() -> f64 { defaults::OBL_FRACTION }
fn default_quantum_interval() -> u32 { defaults::QUANTUM_INTERVAL }
fn default_quantum_jitter() -> f64 { defaults::QUANTUM_JITTER }
fn default_quantum_temperature() -> f64 { defaults::QUANTUM_TEMPERATURE }
fn default_stall_window() -> u32 { defaults::STALL_WINDOW }
fn default_tolerance() -> f64 { defaults::STALL_TOLERANCE }
fn default_max_velocity_ratio() -> f64 { defaults::MAX_VELOCITY_RATIO }
fn default_corridor_ratio() -> f64 { defaults::CORRIDOR_RATIO }
fn default_min_corridor_nm() -> f64 { defaults::MIN_CORRIDOR_NM }
fn default_max_corridor_nm() -> f64 { defaults::MAX_CORRIDOR_NM }
fn default_reference_distance_nm() -> f64 { defaults::REFERENCE_DISTANCE_NM }
fn default_rough_water_factor() -> f64 { defaults::ROUGH_WATER_FACTOR }
fn default_samples_per_leg() -> usize { defaults::SAMPLES_PER_LEG }
fn default_parallel() -> bool { true }

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            particles: default_particles(),
            iterations: default_iterations(),
            control_points: default_control_points(),
            inertia_start: default_inertia_start(),
            inertia_end: default_inertia_end(),
            cognitive_start: default_cognitive_start(),
            cognitive_end: default_cognitive_end(),
            social_start: default_social_start(),
            social_end: default_social_end(),
            chaos_fraction: default_chaos_fraction(),
            chaos_factor: default_chaos_factor(),
            obl_interval: default_obl_interval(),
            obl_fraction: default_obl_fraction(),
            quantum_interval: default_quantum_interval(),
            quantum_jitter: default_quantum_jitter(),
            quantum_temperature: default_quantum_temperature(),
            stall_window: default_stall_window(),
            tolerance: default_tolerance(),
            max_velocity_ratio: default_max_velocity_ratio(),
            corridor_ratio: default_corridor_ratio(),
            min_corridor_nm: default_min_corridor_nm(),
            max_corridor_nm: default_max_corridor_nm(),
            reference_distance_nm: default_reference_distance_nm(),
            rough_water_factor: default_rough_water_factor(),
            samples_per_leg: default_samples_per_leg(),
            parallel: default_parallel(),
        }
    }
}

impl OptimizerConfig {
    fn check(&self, errors: &mut Vec<String>) {
        if self.particles < 2 {
            errors.push(format!("optimizer.particles must be >= 2 (got {})", self.particles));
        }
        if self.iterations == 0 {
            errors.push("optimizer.iterations must be > 0".to_string());
        }
        if self.control_points == 0 {
            errors.push("optimizer.control_points must be > 0".to_string());
        }
        if self.obl_interval == 0 {
            errors.push("optimizer.obl_interval must be > 0".to_string());
        }
        if self.quantum_interval == 0 {
            errors.push("optimizer.quantum_interval must be > 0".to_string());
        }
        if self.stall_window == 0 {
            errors.push("optimizer.stall_window must be > 0".to_string());
        }
        if self.samples_per_leg == 0 {
            errors.push("optimizer.samples_per_leg must be > 0".to_string());
        }

        for (name, value) in [
            ("optimizer.inertia_start", self.inertia_start),
            ("optimizer.inertia_end", self.inertia_end),
            ("optimizer.cognitive_start", self.cognitive_start),
            ("optimizer.cognitive_end", self.cognitive_end),
            ("optimizer.social_start", self.social_start),
            ("optimizer.social_end", self.social_end),
            ("optimizer.chaos_factor", self.chaos_factor),
            ("optimizer.quantum_jitter", self.quantum_jitter),
            ("optimizer.quantum_temperature", self.quantum_temperature),
            ("optimizer.tolerance", self.tolerance),
            ("optimizer.rough_water_factor", self.rough_water_factor),
        ] {
            check_non_negative(name, value, errors);
        }

        check_fraction("optimizer.chaos_fraction", self.chaos_fraction, errors);
        check_fraction("optimizer.obl_fraction", self.obl_fraction, errors);
        check_positive("optimizer.max_velocity_ratio", self.max_velocity_ratio, errors);
        check_positive("optimizer.corridor_ratio", self.corridor_ratio, errors);
        check_positive("optimizer.min_corridor_nm", self.min_corridor_nm, errors);
        check_positive("optimizer.max_corridor_nm", self.max_corridor_nm, errors);
        check_positive("optimizer.reference_distance_nm", self.reference_distance_nm, errors);

        if self.inertia_end > self.inertia_start {
            errors.push(format!(
                "optimizer.inertia_end ({:.2}) must be <= inertia_start ({:.2})",
                self.inertia_end, self.inertia_start
            ));
        }
        if self.min_corridor_nm > self.max_corridor_nm {
            errors.push(format!(
                "optimizer.min_corridor_nm ({:.1}) must be <= max_corridor_nm ({:.1})",
                self.min_corridor_nm, self.max_corridor_nm
            ));
        }
    }
}

// ============================================================================
// Hazard
// ============================================================================

/// Breach thresholds and hazard field parameters.
///
/// Only the wave threshold is active by default; the optional thresholds
/// are checked when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardConfig {
    /// Wave height above which a sample breaches (m)
    #[serde(default = "default_wave_height_threshold")]
    pub wave_height_threshold_m: f64,

    /// Wind speed above which a sample breaches (kt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed_threshold_kt: Option<f64>,

    /// Visibility below which a sample breaches (nm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_threshold_nm: Option<f64>,

    /// Current above which a sample breaches (kt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_threshold_kt: Option<f64>,

    #[serde(default = "default_wave_severity_scale")]
    pub wave_severity_scale_m: f64,

    #[serde(default = "default_wind_severity_scale")]
    pub wind_severity_scale_kt: f64,

    /// Grid resolution (degrees)
    #[serde(default = "default_cell_size")]
    pub cell_size_deg: f64,

    /// Gaussian radius of a stamped hazard (nm)
    #[serde(default = "default_decay_radius")]
    pub decay_radius_nm: f64,

    /// Multiplier applied to existing cells on each ingest
    #[serde(default = "default_field_decay")]
    pub field_decay: f64,

    /// Share of severity added to the baseline when no position is known
    #[serde(default = "default_baseline_factor")]
    pub baseline_factor: f64,

    /// Static tropical-band and polar penalties
    #[serde(default = "default_climatology")]
    pub climatology: bool,
}

fn default_wave_height_threshold() -> f64 { defaults::WAVE_HEIGHT_THRESHOLD_M }
fn default_wave_severity_scale() -> f64 { defaults::WAVE_SEVERITY_SCALE_M }
fn default_wind_severity_scale() -> f64 { defaults::WIND_SEVERITY_SCALE_KT }
fn default_cell_size() -> f64 { defaults::HAZARD_CELL_SIZE_DEG }
fn default_decay_radius() -> f64 { defaults::HAZARD_DECAY_RADIUS_NM }
fn default_field_decay() -> f64 { defaults::HAZARD_FIELD_DECAY }
fn default_baseline_factor() -> f64 { defaults::HAZARD_BASELINE_FACTOR }
fn default_climatology() -> bool { true }

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            wave_height_threshold_m: default_wave_height_threshold(),
            wind_speed_threshold_kt: None,
            visibility_threshold_nm: None,
            current_threshold_kt: None,
            wave_severity_scale_m: default_wave_severity_scale(),
            wind_severity_scale_kt: default_wind_severity_scale(),
            cell_size_deg: default_cell_size(),
            decay_radius_nm: default_decay_radius(),
            field_decay: default_field_decay(),
            baseline_factor: default_baseline_factor(),
            climatology: default_climatology(),
        }
    }
}

impl HazardConfig {
    fn check(&self, errors: &mut Vec<String>) {
        check_positive("hazard.wave_height_threshold_m", self.wave_height_threshold_m, errors);
        if let Some(wind) = self.wind_speed_threshold_kt {
            check_positive("hazard.wind_speed_threshold_kt", wind, errors);
        }
        if let Some(visibility) = self.visibility_threshold_nm {
            check_positive("hazard.visibility_threshold_nm", visibility, errors);
        }
        if let Some(current) = self.current_threshold_kt {
            check_positive("hazard.current_threshold_kt", current, errors);
        }
        check_positive("hazard.wave_severity_scale_m", self.wave_severity_scale_m, errors);
        check_positive("hazard.wind_severity_scale_kt", self.wind_severity_scale_kt, errors);
        check_positive("hazard.cell_size_deg", self.cell_size_deg, errors);
        check_positive("hazard.decay_radius_nm", self.decay_radius_nm, errors);
        check_fraction("hazard.field_decay", self.field_decay, errors);
        check_fraction("hazard.baseline_factor", self.baseline_factor, errors);
    }
}

// ============================================================================
// Vessel
// ============================================================================

/// Vessel performance model used for ETA, fuel estimate and voyage progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselConfig {
    #[serde(default = "default_service_speed")]
    pub service_speed_kt: f64,

    #[serde(default = "default_base_consumption")]
    pub base_consumption_t_per_nm: f64,

    /// Consumption scales by `1 - fuel_efficiency_gain * w.fuel`
    #[serde(default = "default_fuel_efficiency_gain")]
    pub fuel_efficiency_gain: f64,
}

fn default_service_speed() -> f64 { defaults::SERVICE_SPEED_KT }
fn default_base_consumption() -> f64 { defaults::BASE_CONSUMPTION_T_PER_NM }
fn default_fuel_efficiency_gain() -> f64 { defaults::FUEL_EFFICIENCY_GAIN }

impl Default for VesselConfig {
    fn default() -> Self {
        Self {
            service_speed_kt: default_service_speed(),
            base_consumption_t_per_nm: default_base_consumption(),
            fuel_efficiency_gain: default_fuel_efficiency_gain(),
        }
    }
}

impl VesselConfig {
    fn check(&self, errors: &mut Vec<String>) {
        check_positive("vessel.service_speed_kt", self.service_speed_kt, errors);
        check_non_negative("vessel.base_consumption_t_per_nm", self.base_consumption_t_per_nm, errors);
        if check_finite("vessel.fuel_efficiency_gain", self.fuel_efficiency_gain, errors)
            && !(0.0..1.0).contains(&self.fuel_efficiency_gain)
        {
            errors.push(format!(
                "vessel.fuel_efficiency_gain must be within [0, 1) (got {})",
                self.fuel_efficiency_gain
            ));
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Master seed for per-route RNG streams; entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Boost the safety weight by the observed risk when replanning
    #[serde(default = "default_safety_boost_on_replan")]
    pub safety_boost_on_replan: bool,
}

fn default_safety_boost_on_replan() -> bool { true }

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            safety_boost_on_replan: default_safety_boost_on_replan(),
        }
    }
}

// ============================================================================
// Audit
// ============================================================================

/// Audit chain signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Environment variable holding the HMAC key
    #[serde(default = "default_secret_env")]
    pub secret_env: String,

    /// Shortest accepted key (bytes)
    #[serde(default = "default_min_secret_len")]
    pub min_secret_len: usize,
}

fn default_secret_env() -> String { defaults::AUDIT_SECRET_ENV.to_string() }
fn default_min_secret_len() -> usize { defaults::MIN_AUDIT_SECRET_LEN }

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            min_secret_len: default_min_secret_len(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Which store implementations back routes and audit chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Sled => write!(f, "sled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for sled databases and the process lock
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf { PathBuf::from(defaults::DATA_DIR) }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
