//! Configuration loading and management.

use crate::db::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project-local config file, relative to the working directory.
pub const PROJECT_CONFIG_PATH: &str = "playground/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tree: TreeConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// How long a writer waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind: default_bind(),
            port: default_port(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("playground/playground.db")
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    31995
}

fn default_busy_timeout() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Container tree limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum number of folders an ancestor walk may visit.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn parse_env<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Candidate config files, most specific first.
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
        }
        paths.push(PathBuf::from(PROJECT_CONFIG_PATH));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("playground").join("config.yaml"));
        }
        paths
    }

    /// Load the first config file found, then apply environment overrides.
    ///
    /// An explicit path must exist; the default locations are optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::search_paths(None)
                .into_iter()
                .find(|p| p.is_file())
                .map(Self::load)
                .transpose()?
                .unwrap_or_default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `PLAYGROUND_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(db_path) = std::env::var("PLAYGROUND_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }
        if let Ok(bind) = std::env::var("PLAYGROUND_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = parse_env("PLAYGROUND_PORT")? {
            self.server.port = port;
        }
        if let Some(timeout) = parse_env("PLAYGROUND_BUSY_TIMEOUT_MS")? {
            self.server.busy_timeout_ms = timeout;
        }
        if let Some(depth) = parse_env("PLAYGROUND_MAX_DEPTH")? {
            self.tree.max_depth = depth;
        }
        Ok(())
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 8080\ntree:\n  max_depth: 12").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.tree.max_depth, 12);
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "server: [not, a, map").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::resolve(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn explicit_path_is_searched_first() {
        let paths = Config::search_paths(Some(Path::new("custom.yaml")));
        assert_eq!(paths[0], PathBuf::from("custom.yaml"));
        assert_eq!(paths[1], PathBuf::from(PROJECT_CONFIG_PATH));
    }
}
