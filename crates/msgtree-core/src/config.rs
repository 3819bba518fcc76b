//! Configuration management for msgtree.
//!
//! Loads configuration from ${MSGTREE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Switches for the individual orphan repair steps.
///
/// Root fallback is always on; it is what makes repair total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Attach under the declared grandparent when present.
    pub grandparent: bool,
    /// Attach under the closest node with a lower sequence.
    pub sequence: bool,
    /// Attach under the closest node with an earlier timestamp.
    pub timestamp: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            grandparent: true,
            sequence: true,
            timestamp: true,
        }
    }
}

/// Tree engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Re-sort the receiving sibling list after a removal promotes children.
    /// Off by default: promoted children are appended as-is.
    pub resort_after_promotion: bool,

    /// Refuse placements that would make a node its own ancestor.
    pub cycle_guard: bool,

    /// Re-place nodes positioned by orphan repair when an add could move
    /// them: under their declared parent once it arrives, otherwise by
    /// repairing again against the larger tree.
    pub rehome_repaired: bool,

    /// Orphan repair steps.
    pub repair: RepairConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            resort_after_promotion: false,
            cycle_guard: true,
            rehome_repaired: true,
            repair: RepairConfig::default(),
        }
    }
}

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for msgtree configuration.
    //!
    //! MSGTREE_HOME resolution order:
    //! 1. MSGTREE_HOME environment variable (if set)
    //! 2. ~/.config/msgtree (default)
    //! 3. ./.msgtree when no home directory can be determined

    use std::path::PathBuf;

    pub fn msgtree_home() -> PathBuf {
        if let Ok(home) = std::env::var("MSGTREE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".msgtree"),
            |h| h.join(".config").join("msgtree"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        msgtree_home().join("config.toml")
    }
}

impl TreeConfig {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(TreeConfig::default())
        }
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_template_matches_defaults() {
        let parsed = TreeConfig::parse(default_config_template()).unwrap();
        assert_eq!(parsed, TreeConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = TreeConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, TreeConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = TreeConfig::parse(
            r"
resort_after_promotion = true

[repair]
timestamp = false
",
        )
        .unwrap();
        assert!(config.resort_after_promotion);
        assert!(config.cycle_guard);
        assert!(config.repair.grandparent);
        assert!(!config.repair.timestamp);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "cycle_guard = \"sometimes\"").unwrap();

        let err = TreeConfig::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_writes_template_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        TreeConfig::init(&path).unwrap();
        assert_eq!(TreeConfig::load_from(&path).unwrap(), TreeConfig::default());

        let err = TreeConfig::init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
