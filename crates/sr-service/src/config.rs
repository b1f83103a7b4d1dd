//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use sr_core::HoursPolicy;

/// Service configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the roster database file.
    pub database_path: PathBuf,

    /// Hours-policy parameters (break deduction, overtime threshold).
    pub hours: HoursPolicy,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("hours", &self.hours)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("roster.db"),
            hours: HoursPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (SR_*, nested via __)
        figment = figment.merge(Env::prefixed("SR_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for the roster.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("shift-roster"))
}

/// Returns the platform-specific data directory for the roster.
///
/// On Linux: `~/.local/share/shift-roster`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("shift-roster"))
}
