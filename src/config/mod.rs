//! Configuration Module
//!
//! Provides the planner configuration loaded from TOML files: swarm
//! hyperparameters, hazard thresholds, vessel model, audit and storage
//! settings.
//!
//! ## Loading Order
//!
//! 1. `BLUEPATH_CONFIG` environment variable (path to TOML file)
//! 2. `bluepath.toml` in the current working directory
//! 3. Built-in defaults (`config::defaults`)
//!
//! ## Usage
//!
//! The configuration is an explicit value handed to the supervisor, never a
//! global:
//!
//! ```ignore
//! let config = BluepathConfig::load();
//! let supervisor = VoyageSupervisor::new(config);
//! ```

mod bluepath_config;
pub mod defaults;
pub mod validation;

pub use bluepath_config::*;
