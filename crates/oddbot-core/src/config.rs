//! Unified configuration loading.
//!
//! Every crate reads its defaults from here so the constants are defined once.
//! Precedence when building a [`BotConfig`]: config file, then environment
//! variables, then the built-in defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Built-in default values.
pub mod defaults {
    /// Number of bits per displayed group of a silly id.
    pub const GAP_SIZE: u32 = 3;
    /// Number of groups in a silly id; the bit width is `GROUPS * gap_size`.
    pub const GROUPS: u32 = 3;
    /// Location of the silly id database.
    pub const DB_PATH: &str = "var/silly_db.json";
    /// Root directory scanned for extensions.
    pub const EXTENSIONS_DIR: &str = "extensions";
    /// File that marks a subdirectory of the extensions root as an extension.
    pub const ENTRY_POINT: &str = "extension.toml";
    /// Extensions loaded at startup, in order.
    pub const STARTUP_EXTENSIONS: &[&str] = &["SillyID"];
    /// Presence text shown once the bot is ready.
    pub const ACTIVITY: &str = "God Revision 2";
    /// Config file looked up in the working directory.
    pub const CONFIG_FILE: &str = "oddbot.toml";
}

/// Environment variable names.
pub mod env_vars {
    pub const GAP_SIZE: &str = "ODDBOT_GAP_SIZE";
    pub const DB_PATH: &str = "ODDBOT_DB_PATH";
    pub const EXTENSIONS_DIR: &str = "ODDBOT_EXTENSIONS_DIR";
    pub const STARTUP_EXTENSIONS: &str = "ODDBOT_STARTUP_EXTENSIONS";
    pub const STARTUP_POLICY: &str = "ODDBOT_STARTUP_POLICY";
    pub const ACTIVITY: &str = "ODDBOT_ACTIVITY";
    /// `true` switches log output to JSON.
    pub const LOG_JSON: &str = "ODDBOT_LOG_JSON";
}

/// What to do when an extension in the startup list fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    /// Log the failure and keep loading the rest of the list.
    #[default]
    Continue,
    /// Stop at the first failure and report it.
    Abort,
}

impl FromStr for StartupPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(StartupPolicy::Continue),
            "abort" => Ok(StartupPolicy::Abort),
            other => Err(Error::Config(format!("unknown startup policy: {}", other))),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bits per displayed group; the id space is `3 * gap_size` bits wide.
    pub gap_size: u32,
    /// Path of the silly id database file.
    pub db_path: PathBuf,
    /// Root directory scanned for extensions.
    pub extensions_dir: PathBuf,
    /// Extensions loaded at startup, in order.
    pub startup_extensions: Vec<String>,
    /// Failure handling for the startup list.
    pub startup_policy: StartupPolicy,
    /// Presence text.
    pub activity: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            gap_size: defaults::GAP_SIZE,
            db_path: PathBuf::from(defaults::DB_PATH),
            extensions_dir: PathBuf::from(defaults::EXTENSIONS_DIR),
            startup_extensions: defaults::STARTUP_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            startup_policy: StartupPolicy::default(),
            activity: defaults::ACTIVITY.to_string(),
        }
    }
}

impl BotConfig {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, `oddbot.toml` in the working
    /// directory is used when present. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                info!(category = "config", path = %path.display(), "Loading config file");
                Self::from_toml(&content)?
            }
            None => match std::fs::read_to_string(defaults::CONFIG_FILE) {
                Ok(content) => {
                    info!(category = "config", path = defaults::CONFIG_FILE, "Loading config file");
                    Self::from_toml(&content)?
                }
                Err(_) => {
                    debug!(category = "config", "No config file, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: BotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env_vars::GAP_SIZE) {
            self.gap_size = v
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a number: {}", env_vars::GAP_SIZE, v)))?;
        }
        if let Some(v) = lookup(env_vars::DB_PATH) {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(env_vars::EXTENSIONS_DIR) {
            self.extensions_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(env_vars::STARTUP_EXTENSIONS) {
            self.startup_extensions = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup(env_vars::STARTUP_POLICY) {
            self.startup_policy = v.parse()?;
        }
        if let Some(v) = lookup(env_vars::ACTIVITY) {
            self.activity = v;
        }
        self.validate()
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        // 3 * 10 bits keeps the id space inside a u32.
        if self.gap_size == 0 || self.gap_size > 10 {
            return Err(Error::Config(format!(
                "gap_size must be between 1 and 10, got {}",
                self.gap_size
            )));
        }
        Ok(())
    }

    /// Bit width of the silly id space.
    pub fn bit_width(&self) -> u32 {
        self.gap_size * defaults::GROUPS
    }

    /// Create the directory holding the database file if it is missing.
    pub fn ensure_data_dir(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                info!(category = "config", dir = %parent.display(), "Creating data directory");
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.gap_size, 3);
        assert_eq!(config.bit_width(), 9);
        assert_eq!(config.db_path, PathBuf::from("var/silly_db.json"));
        assert_eq!(config.startup_extensions, vec!["SillyID".to_string()]);
        assert_eq!(config.startup_policy, StartupPolicy::Continue);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = BotConfig::from_toml(
            r#"
            gap_size = 4
            startup_policy = "abort"
            "#,
        )
        .unwrap();
        assert_eq!(config.gap_size, 4);
        assert_eq!(config.bit_width(), 12);
        assert_eq!(config.startup_policy, StartupPolicy::Abort);
        assert_eq!(config.activity, defaults::ACTIVITY);
    }

    #[test]
    fn test_from_toml_rejects_bad_gap_size() {
        assert!(BotConfig::from_toml("gap_size = 0").is_err());
        assert!(BotConfig::from_toml("gap_size = 11").is_err());
        assert!(BotConfig::from_toml("gap_size = \"three\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (env_vars::GAP_SIZE, "2"),
            (env_vars::DB_PATH, "/tmp/ids.json"),
            (env_vars::STARTUP_EXTENSIONS, "SillyID, Extra ,,"),
            (env_vars::STARTUP_POLICY, "ABORT"),
        ]
        .into_iter()
        .collect();

        let mut config = BotConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.gap_size, 2);
        assert_eq!(config.db_path, PathBuf::from("/tmp/ids.json"));
        assert_eq!(config.startup_extensions, vec!["SillyID", "Extra"]);
        assert_eq!(config.startup_policy, StartupPolicy::Abort);
    }

    #[test]
    fn test_unknown_policy() {
        assert!("sometimes".parse::<StartupPolicy>().is_err());
    }

    #[test]
    fn test_ensure_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BotConfig {
            db_path: dir.path().join("nested/var/silly_db.json"),
            ..BotConfig::default()
        };
        config.ensure_data_dir().unwrap();
        assert!(dir.path().join("nested/var").is_dir());
    }
}
