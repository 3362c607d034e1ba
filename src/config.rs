//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `HTTPD_*` environment variables. The command line applies its own flags on
//! top before calling [`ServerConfig::validate`].
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 8080
//! root: /srv/www
//! workers: 4
//! blocking_threads: 4
//! header_timeout_secs: 30
//! log_file: /var/log/static-httpd.log
//! ```

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("invalid listen address {0}")]
    Address(String),

    #[error("document root {path} is not a directory")]
    Root { path: PathBuf },

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// Immutable server settings, shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Document root; absolute once validated
    pub root: PathBuf,
    /// Number of worker event loops
    pub workers: usize,
    /// Size of each worker's blocking pool used for file reads
    pub blocking_threads: usize,
    /// Give up on clients that never finish their headers; `None` waits
    /// forever
    pub header_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            root: PathBuf::from("."),
            workers: 4,
            blocking_threads: 4,
            header_timeout_secs: None,
            log_file: None,
        }
    }
}

impl ServerConfig {
    /// Defaults, overlaid with `path` when given, overlaid with the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overrides fields from `HTTPD_HOST`, `HTTPD_PORT`, `HTTPD_ROOT`,
    /// `HTTPD_WORKERS` and `HTTPD_LOG_FILE`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("HTTPD_HOST") {
            self.host = host;
        }
        if let Some(port) = env_parse("HTTPD_PORT")? {
            self.port = port;
        }
        if let Ok(root) = std::env::var("HTTPD_ROOT") {
            self.root = PathBuf::from(root);
        }
        if let Some(workers) = env_parse("HTTPD_WORKERS")? {
            self.workers = workers;
        }
        if let Ok(log_file) = std::env::var("HTTPD_LOG_FILE") {
            self.log_file = Some(PathBuf::from(log_file));
        }
        Ok(())
    }

    /// Checks the settings and makes the root absolute.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Zero("workers"));
        }
        if self.blocking_threads == 0 {
            return Err(ConfigError::Zero("blocking_threads"));
        }
        self.socket_addr()?;

        let root = self
            .root
            .canonicalize()
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| ConfigError::Root { path: self.root.clone() })?;
        self.root = root;

        Ok(self)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// First address `host:port` resolves to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::Address(self.address()))
    }

    pub fn header_timeout(&self) -> Option<Duration> {
        self.header_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
        Err(_) => Ok(None),
    }
}
