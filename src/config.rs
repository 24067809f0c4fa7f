//! Configuration file support for the project tracker
//!
//! Reads from .projects/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the database path
pub const DB_PATH_ENV: &str = "PROJECTS_DB_PATH";

/// Directory holding the config file and the default database
pub const PROJECTS_DIR: &str = ".projects";

/// Configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Storage connection settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Storage connection settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite file. Relative paths resolve against the working directory.
    /// Default: ".projects/projects.db"
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum pooled connections
    /// Default: 4
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// How long a statement waits on a locked database before failing
    /// Default: 5000
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    Path::new(PROJECTS_DIR).join("projects.db")
}

fn default_pool_size() -> u32 {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    /// Settings for an explicit database file, everything else default
    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Config {
    /// Load config from .projects/config.toml, then apply the
    /// PROJECTS_DB_PATH override. Returns defaults if the file doesn't exist.
    pub fn load() -> Self {
        let mut config = Self::find_config_path()
            .and_then(|path| Self::from_file(&path))
            .unwrap_or_default();

        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            if !path.trim().is_empty() {
                config.database.path = PathBuf::from(path);
            }
        }
        config
    }

    fn from_file(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config");
                None
            }
        }
    }

    /// Find config.toml by walking up directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(PROJECTS_DIR).join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, PathBuf::from(".projects/projects.db"));
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[database]
path = "/var/lib/projects/shop.db"
pool_size = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/projects/shop.db"));
        assert_eq!(config.database.pool_size, 2);
        // unspecified keys fall back to defaults
        assert_eq!(config.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database\npath = ").unwrap();
        assert!(Config::from_file(&path).is_none());
    }
}
