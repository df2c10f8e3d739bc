//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for BluepathConfig.
///
/// Maintained by hand to match the struct hierarchy in bluepath_config.rs.
/// Any new field added to BluepathConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [optimizer]
        "optimizer",
        "optimizer.particles",
        "optimizer.iterations",
        "optimizer.control_points",
        "optimizer.inertia_start",
        "optimizer.inertia_end",
        "optimizer.cognitive_start",
        "optimizer.cognitive_end",
        "optimizer.social_start",
        "optimizer.social_end",
        "optimizer.chaos_fraction",
        "optimizer.chaos_factor",
        "optimizer.obl_interval",
        "optimizer.obl_fraction",
        "optimizer.quantum_interval",
        "optimizer.quantum_jitter",
        "optimizer.quantum_temperature",
        "optimizer.stall_window",
        "optimizer.tolerance",
        "optimizer.max_velocity_ratio",
        "optimizer.corridor_ratio",
        "optimizer.min_corridor_nm",
        "optimizer.max_corridor_nm",
        "optimizer.reference_distance_nm",
        "optimizer.rough_water_factor",
        "optimizer.samples_per_leg",
        "optimizer.parallel",
        // [hazard]
        "hazard",
        "hazard.wave_height_threshold_m",
        "hazard.wind_speed_threshold_kt",
        "hazard.visibility_threshold_nm",
        "hazard.current_threshold_kt",
        "hazard.wave_severity_scale_m",
        "hazard.wind_severity_scale_kt",
        "hazard.cell_size_deg",
        "hazard.decay_radius_nm",
        "hazard.field_decay",
        "hazard.baseline_factor",
        "hazard.climatology",
        // [vessel]
        "vessel",
        "vessel.service_speed_kt",
        "vessel.base_consumption_t_per_nm",
        "vessel.fuel_efficiency_gain",
        // [supervisor]
        "supervisor",
        "supervisor.seed",
        "supervisor.safety_boost_on_replan",
        // [audit]
        "audit",
        "audit.secret_env",
        "audit.min_secret_len",
        // [storage]
        "storage",
        "storage.backend",
        "storage.data_dir",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys — it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed BluepathConfig.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::BluepathConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Hazard grid: cells wider than 10 degrees cannot localize a storm
    let cell = config.hazard.cell_size_deg;
    if cell > 10.0 {
        errors.push(format!(
            "hazard.cell_size_deg = {:.2} is outside usable range (0-10 degrees)",
            cell
        ));
    }

    // Corridor ceiling: beyond a quarter of the Earth's circumference the
    // lateral offset wraps around the globe
    if config.optimizer.max_corridor_nm > 5_400.0 {
        errors.push(format!(
            "optimizer.max_corridor_nm = {:.0} exceeds 5400 nm",
            config.optimizer.max_corridor_nm
        ));
    }

    // Service speed: 5-30 kt covers merchant tonnage
    let speed = config.vessel.service_speed_kt;
    if speed.is_finite() && speed > 0.0 && !(5.0..=30.0).contains(&speed) {
        warnings.push(ValidationWarning {
            field: "vessel.service_speed_kt".to_string(),
            message: format!(
                "service_speed_kt = {:.1} is outside typical range (5-30 kt)",
                speed
            ),
            suggestion: None,
        });
    }

    // Wave threshold: above 15 m nothing short of a rogue wave would breach
    let wave = config.hazard.wave_height_threshold_m;
    if wave > 15.0 {
        warnings.push(ValidationWarning {
            field: "hazard.wave_height_threshold_m".to_string(),
            message: format!(
                "wave_height_threshold_m = {:.1} is above typical range (0-15 m)",
                wave
            ),
            suggestion: None,
        });
    }

    // Swarm size: very large swarms make every replan slow
    if config.optimizer.particles > 1_000 {
        warnings.push(ValidationWarning {
            field: "optimizer.particles".to_string(),
            message: format!(
                "particles = {} is unusually large; replans will be slow",
                config.optimizer.particles
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
