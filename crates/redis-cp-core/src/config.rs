//! Configuration for redis-cp
//!
//! A [`MigrationConfig`] is built once (from a TOML file, CLI flags, or
//! both), validated, and then passed read-only into the orchestrator.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CopyError, Result};

/// Default store port
pub const DEFAULT_PORT: u16 = 6379;

/// Default number of keys per migration batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default COUNT hint passed to SCAN
pub const DEFAULT_SCAN_COUNT: usize = 100;

/// Default MIGRATE timeout in milliseconds
pub const DEFAULT_MIGRATE_TIMEOUT_MS: u64 = 1000;

/// Main configuration structure for a copy run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Source endpoint
    pub source: EndpointConfig,

    /// Destination endpoint
    pub destination: EndpointConfig,

    /// Port used by either side unless overridden
    pub port: u16,

    /// Database index used by either side unless overridden
    pub db: u32,

    /// Glob pattern keys must match (SCAN MATCH)
    pub pattern: String,

    /// Maximum number of keys per batch
    pub batch_size: usize,

    /// COUNT hint for each SCAN page
    pub scan_count: usize,

    /// Timeout handed to MIGRATE, in milliseconds
    pub migrate_timeout_ms: u64,

    /// Run the full decision logic without writing to the destination
    pub dry_run: bool,

    /// Report progress after every batch
    pub verbose: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source: EndpointConfig::default(),
            destination: EndpointConfig::default(),
            port: DEFAULT_PORT,
            db: 0,
            pattern: "*".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            scan_count: DEFAULT_SCAN_COUNT,
            migrate_timeout_ms: DEFAULT_MIGRATE_TIMEOUT_MS,
            dry_run: false,
            verbose: false,
            logging: LoggingConfig::default(),
        }
    }
}

/// One side of the copy as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Hostname or IP address
    pub host: String,

    /// Port, if different from the shared `port`
    pub port: Option<u16>,

    /// Database index, if different from the shared `db`
    pub db: Option<u32>,

    /// Password sent with AUTH after connecting
    pub password: Option<String>,
}

/// Effective network location of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAddr {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Database index
    pub db: u32,
}

impl EndpointAddr {
    /// Create an address
    pub fn new(host: impl Into<String>, port: u16, db: u32) -> Self {
        Self {
            host: host.into(),
            port,
            db,
        }
    }
}

impl fmt::Display for EndpointAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,

    /// JSON format
    Json,
}

impl MigrationConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CopyError::Config(format!("failed to read config file {:?}: {}", path, e))
        })?;
        Self::parse_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| CopyError::Config(format!("failed to parse config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (side, endpoint) in [("source", &self.source), ("destination", &self.destination)] {
            if endpoint.host.trim().is_empty() {
                return Err(CopyError::Config(format!("{} host is required", side)));
            }
            if endpoint.port == Some(0) {
                return Err(CopyError::Config(format!("{} port cannot be 0", side)));
            }
        }
        if self.port == 0 {
            return Err(CopyError::Config("port cannot be 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(CopyError::Config("batch size must be at least 1".to_string()));
        }
        if self.scan_count == 0 {
            return Err(CopyError::Config("scan count must be at least 1".to_string()));
        }
        if self.pattern.is_empty() {
            return Err(CopyError::Config("pattern cannot be empty".to_string()));
        }
        if self.migrate_timeout_ms == 0 {
            return Err(CopyError::Config(
                "migrate timeout must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective source address: per-side overrides over the shared defaults
    pub fn source_addr(&self) -> EndpointAddr {
        self.resolve(&self.source)
    }

    /// Effective destination address: per-side overrides over the shared defaults
    pub fn destination_addr(&self) -> EndpointAddr {
        self.resolve(&self.destination)
    }

    fn resolve(&self, endpoint: &EndpointConfig) -> EndpointAddr {
        EndpointAddr {
            host: endpoint.host.clone(),
            port: endpoint.port.unwrap_or(self.port),
            db: endpoint.db.unwrap_or(self.db),
        }
    }
}
