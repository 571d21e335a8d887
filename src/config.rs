//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\concert-minder\config.toml
//! - macOS: ~/Library/Application Support/concert-minder/config.toml
//! - Linux: ~/.config/concert-minder/config.toml
//!
//! The file is human-readable and editable. A config file given explicitly
//! on the command line must parse; the default-location file falls back to
//! defaults with a logged error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Checksum database location
    pub database: DatabaseConfig,

    /// Remote metadata service
    pub remote: RemoteConfig,

    /// Recording matching and batch settings
    pub matching: MatchingConfig,

    /// Track listing parser settings
    pub listing: ListingConfig,

    /// Folder naming settings
    pub naming: NamingConfig,

    /// General preferences
    pub preferences: Preferences,
}

/// Database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file (default: `concert_minder.db` in the working directory)
    pub path: Option<PathBuf>,
}

/// Remote metadata service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// GraphQL endpoint
    pub endpoint: String,

    /// Whether unmatched folders may be looked up remotely
    pub enabled: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::remote::DEFAULT_ENDPOINT.to_string(),
            enabled: true,
            timeout_secs: 30,
        }
    }
}

/// Matching and batch settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Worker count for batch runs (default: available cores minus one)
    pub concurrency: Option<usize>,
}

impl MatchingConfig {
    /// Effective worker count, never below one.
    pub fn worker_count(&self) -> usize {
        match self.concurrency {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1),
        }
    }
}

/// Track listing parser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Whitespace run length that starts a trailing comment column
    pub strip_after_space_count: usize,

    /// Derive tracks from file names when no listing validates
    pub filename_fallback: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            strip_after_space_count: 5,
            filename_fallback: false,
        }
    }
}

/// Folder naming settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Canonical abbreviation -> aliases, e.g. `jg = ["jgb", "jg+jk"]`
    pub artist_aliases: BTreeMap<String, Vec<String>>,

    /// Artist name -> abbreviation, used when the catalog has none
    pub artist_abbreviations: BTreeMap<String, String>,
}

impl NamingConfig {
    /// Abbreviation configured for an artist name (case-insensitive).
    pub fn abbreviation_for(&self, artist_name: &str) -> Option<&str> {
        self.artist_abbreviations
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(artist_name))
            .map(|(_, abbr)| abbr.as_str())
    }
}

/// General preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Log at debug level
    pub verbose_logging: bool,
}

impl Config {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (canonical, aliases) in &self.naming.artist_aliases {
            if canonical.trim().is_empty() {
                return Err(ConfigError::InvalidAlias(
                    "empty canonical abbreviation".to_string(),
                ));
            }
            if aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(ConfigError::InvalidAlias(format!(
                    "empty alias for '{canonical}'"
                )));
            }
        }
        for (name, abbr) in &self.naming.artist_abbreviations {
            if abbr.trim().is_empty() {
                return Err(ConfigError::InvalidAlias(format!(
                    "empty abbreviation for artist '{name}'"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("concert-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs errors but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load configuration from an explicit path, surfacing every failure.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config: Config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    config.validate()?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &dir.join("config.toml"))
}

/// Save configuration to an explicit path
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Invalid artist alias table: {0}")]
    InvalidAlias(String),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[remote]"));
        assert!(toml.contains("[listing]"));
        assert!(toml.contains("[naming"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config
            .naming
            .artist_aliases
            .insert("jg".to_string(), vec!["jgb".to_string(), "jg+jk".to_string()]);
        config.matching.concurrency = Some(3);
        config.remote.enabled = false;

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(
            parsed.naming.artist_aliases.get("jg"),
            Some(&vec!["jgb".to_string(), "jg+jk".to_string()])
        );
        assert_eq!(parsed.matching.concurrency, Some(3));
        assert!(!parsed.remote.enabled);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[listing]
filename_fallback = true
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert!(config.listing.filename_fallback);
        assert_eq!(config.listing.strip_after_space_count, 5);
        assert!(config.remote.enabled);
        assert_eq!(config.remote.endpoint, crate::remote::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_worker_count_never_zero() {
        let cfg = MatchingConfig {
            concurrency: Some(0),
        };
        assert_eq!(cfg.worker_count(), 1);
        assert!(MatchingConfig::default().worker_count() >= 1);
    }

    #[test]
    fn test_empty_alias_is_rejected() {
        let mut config = Config::default();
        config
            .naming
            .artist_aliases
            .insert("gd".to_string(), vec![" ".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAlias(_))
        ));
    }

    #[test]
    fn test_load_from_surfaces_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[naming\nbroken").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse(_, _))));
    }

    #[test]
    fn test_save_and_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config
            .naming
            .artist_abbreviations
            .insert("Grateful Dead".to_string(), "gd".to_string());
        save_to(&config, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.naming.abbreviation_for("grateful dead"), Some("gd"));
    }
}
