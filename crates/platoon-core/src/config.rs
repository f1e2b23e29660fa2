use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::version::VersionSchemeKind;

/// Global user configuration loaded from `~/.platoon/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

/// Resolution settings from `[resolution]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Ceiling on build/resolve/align iterations before giving up.
    #[serde(default = "default_max_iterations", rename = "max-iterations")]
    pub max_iterations: usize,
    /// Metadata lookups allowed in flight at once.
    #[serde(default = "default_max_concurrent_lookups", rename = "max-concurrent-lookups")]
    pub max_concurrent_lookups: usize,
    #[serde(default, rename = "version-scheme")]
    pub version_scheme: VersionSchemeKind,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            version_scheme: VersionSchemeKind::default(),
        }
    }
}

fn default_max_iterations() -> usize {
    16
}

fn default_max_concurrent_lookups() -> usize {
    8
}

/// Per-request overrides from a request's own `[resolution]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionOverrides {
    #[serde(default, rename = "max-iterations")]
    pub max_iterations: Option<usize>,
    #[serde(default, rename = "max-concurrent-lookups")]
    pub max_concurrent_lookups: Option<usize>,
    #[serde(default, rename = "version-scheme")]
    pub version_scheme: Option<VersionSchemeKind>,
}

impl ResolutionConfig {
    /// Apply request-level overrides on top of this configuration.
    pub fn with_overrides(&self, overrides: &ResolutionOverrides) -> Self {
        Self {
            max_iterations: overrides.max_iterations.unwrap_or(self.max_iterations),
            max_concurrent_lookups: overrides
                .max_concurrent_lookups
                .unwrap_or(self.max_concurrent_lookups)
                .max(1),
            version_scheme: overrides.version_scheme.unwrap_or(self.version_scheme),
        }
    }
}

impl GlobalConfig {
    /// Load the global configuration from `~/.platoon/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load a configuration file, or return defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            platoon_util::errors::PlatoonError::Config {
                message: format!("Failed to read global config: {e}"),
            }
        })?;
        toml::from_str(&content).map_err(|e| {
            platoon_util::errors::PlatoonError::Config {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the platoon data directory (`~/.platoon/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".platoon")
}
