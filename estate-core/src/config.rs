//! Cache configuration.
//!
//! Configuration is loaded from environment variables with defaults suited
//! to development. TTLs are deliberately absent: every cached domain has a
//! compile-time TTL class.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// Process-local map, lost on restart.
    #[default]
    Memory,
    /// LMDB environment on local disk, shared by processes on the host.
    Lmdb,
}

impl FromStr for CacheBackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Ok(Self::Memory),
            "lmdb" => Ok(Self::Lmdb),
            _ => Err(ConfigError::InvalidValue {
                field: "ESTATE_CACHE_BACKEND".to_string(),
                value: value.to_string(),
                reason: "expected memory or lmdb".to_string(),
            }),
        }
    }
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Lmdb => f.write_str("lmdb"),
        }
    }
}

/// Configuration for the read-through cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false every read goes straight to the data layer.
    pub enabled: bool,
    /// Store implementation.
    pub backend: CacheBackendKind,
    /// Directory for the LMDB environment (required for `Lmdb`).
    pub lmdb_path: Option<PathBuf>,
    /// LMDB map size in megabytes.
    pub lmdb_max_size_mb: usize,
    /// Capacity of the in-memory store. Zero means unbounded.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            lmdb_path: None,
            lmdb_max_size_mb: 64,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Use the LMDB backend rooted at `path`.
    pub fn with_lmdb(mut self, path: impl Into<PathBuf>, max_size_mb: usize) -> Self {
        self.backend = CacheBackendKind::Lmdb;
        self.lmdb_path = Some(path.into());
        self.lmdb_max_size_mb = max_size_mb;
        self
    }

    /// Set the in-memory capacity.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ESTATE_CACHE_ENABLED`: "true"/"1" or "false"/"0" (default: true)
    /// - `ESTATE_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `ESTATE_CACHE_LMDB_PATH`: LMDB directory (required for lmdb)
    /// - `ESTATE_CACHE_LMDB_MAX_SIZE_MB`: map size (default: 64)
    /// - `ESTATE_CACHE_MAX_ENTRIES`: in-memory capacity, 0 = unbounded (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = parse_flag(&lookup, "ESTATE_CACHE_ENABLED")?.unwrap_or(defaults.enabled);

        let backend = match lookup("ESTATE_CACHE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };

        let lmdb_path = lookup("ESTATE_CACHE_LMDB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let lmdb_max_size_mb = parse_number(&lookup, "ESTATE_CACHE_LMDB_MAX_SIZE_MB")?
            .unwrap_or(defaults.lmdb_max_size_mb);

        let max_entries =
            parse_number(&lookup, "ESTATE_CACHE_MAX_ENTRIES")?.unwrap_or(defaults.max_entries);

        let config = Self {
            enabled,
            backend,
            lmdb_path,
            lmdb_max_size_mb,
            max_entries,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == CacheBackendKind::Lmdb {
            if self.lmdb_path.is_none() {
                return Err(ConfigError::MissingRequired {
                    field: "ESTATE_CACHE_LMDB_PATH".to_string(),
                });
            }
            if self.lmdb_max_size_mb == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "ESTATE_CACHE_LMDB_MAX_SIZE_MB".to_string(),
                    value: "0".to_string(),
                    reason: "map size must be positive".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw,
            reason: "expected true, false, 1 or 0".to_string(),
        }),
    }
}

fn parse_number<F>(lookup: &F, key: &str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw,
                reason: "expected a non-negative integer".to_string(),
            }),
    }
}
