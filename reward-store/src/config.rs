//! Storage configuration

use serde::{Deserialize, Serialize};
use std::env;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable embedded sled database
    Sled,
    /// Process-local maps, lost on exit
    Memory,
}

impl StorageBackend {
    /// Parse from string (for environment variables)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sled" | "disk" => Some(Self::Sled),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Sled data directory
    pub data_dir: String,
    /// Page cache size (bytes)
    pub cache_capacity: u64,
    /// Background flush interval (milliseconds)
    pub flush_every_ms: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sled,
            data_dir: "./data/rewards".to_string(),
            cache_capacity: 64 * 1024 * 1024, // 64MB
            flush_every_ms: Some(500),
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    ///
    /// - REWARDS_STORAGE: `sled` or `memory`
    /// - REWARDS_DATA_DIR: sled directory
    /// - REWARDS_CACHE_BYTES: sled cache size
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("REWARDS_STORAGE")
                .ok()
                .and_then(|s| StorageBackend::from_str(&s))
                .unwrap_or(defaults.backend),
            data_dir: env::var("REWARDS_DATA_DIR").unwrap_or(defaults.data_dir),
            cache_capacity: env::var("REWARDS_CACHE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_capacity),
            flush_every_ms: defaults.flush_every_ms,
        }
    }

    /// Development configuration
    pub fn development() -> Self {
        Self {
            backend: StorageBackend::Sled,
            data_dir: "./data/rewards_dev".to_string(),
            cache_capacity: 16 * 1024 * 1024, // 16MB
            flush_every_ms: Some(1000),
        }
    }

    /// Test configuration (in-memory)
    pub fn test() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: String::new(),
            cache_capacity: 4 * 1024 * 1024, // 4MB
            flush_every_ms: None,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}
