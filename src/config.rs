//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (FLOWLOG_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [engine]
//! iteration_limit = 10000
//! frame_limit = 10
//!
//! [engine.interner]
//! enable_arena_release = false
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! FLOWLOG_ENGINE__ITERATION_LIMIT=5000
//! FLOWLOG_LOGGING__LEVEL=debug
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct. Scoped to what this evaluation core
/// actually tunes — no storage/persistence sections, since persistence
/// is an external collaborator's concern (`SPEC_FULL.md` §2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine-wide tunables (`spec.md` §5: iteration limit 10,000, frame
/// limit 10 — defaults here, not hardcoded constants, so tests can
/// shrink them to exercise the limit paths cheaply).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixpoint derivation-step ceiling per transaction.
    #[serde(default = "default_iteration_limit")]
    pub iteration_limit: u64,

    /// Commit-frame ceiling per transaction.
    #[serde(default = "default_frame_limit")]
    pub frame_limit: u32,

    /// Initial capacity hint for in-memory index collections.
    #[serde(default = "default_initial_index_capacity")]
    pub initial_index_capacity: usize,

    #[serde(default)]
    pub interner: InternerConfig,
}

/// See the Open Question resolution in `SPEC_FULL.md` §9: arena release
/// stays disabled by default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InternerConfig {
    #[serde(default)]
    pub enable_arena_release: bool,
}

impl Default for InternerConfig {
    fn default() -> Self {
        InternerConfig { enable_arena_release: false }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_iteration_limit() -> u64 {
    10_000
}
fn default_frame_limit() -> u32 {
    10
}
fn default_initial_index_capacity() -> usize {
    10_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (FLOWLOG_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("FLOWLOG_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FLOWLOG_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig {
                iteration_limit: default_iteration_limit(),
                frame_limit: default_frame_limit(),
                initial_index_capacity: default_initial_index_capacity(),
                interner: InternerConfig::default(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level(), format: default_log_format() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.iteration_limit, 10_000);
        assert_eq!(config.engine.frame_limit, 10);
        assert!(!config.engine.interner.enable_arena_release);
    }

    #[test]
    fn config_serialization_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[engine.interner]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.engine.iteration_limit, config.engine.iteration_limit);
    }
}
