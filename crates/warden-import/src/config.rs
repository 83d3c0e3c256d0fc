//! Configuration for import jobs
//!
//! Batch sizing, queue depth, retry policy and identity resolution. A job
//! works from one immutable snapshot of this configuration for its whole
//! run; [`ConfigWatcher`] publishes new snapshots when the file changes.

use crate::ImportError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use warden_sources::ResolutionConfig;

/// Current configuration file version
pub const CONFIG_VERSION: u32 = 1;

/// Configuration for import jobs
///
/// # Examples
///
/// ```
/// use warden_import::ImportConfig;
///
/// let config = ImportConfig::default();
/// assert_eq!(config.batch_size, 500);
/// assert!(config.retry_failed_batches);
///
/// // Many small transactions, e.g. for a store shared with a live server
/// let config = ImportConfig::small_batches();
/// assert_eq!(config.batch_size, 50);
///
/// // Few large transactions for one-off migrations
/// let config = ImportConfig::bulk();
/// assert_eq!(config.batch_size, 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Version of the configuration file layout
    pub config_version: u32,

    /// Records per committed batch
    /// Default: 500
    pub batch_size: usize,

    /// Records the source may read ahead of the committer
    /// Default: 2000
    pub queue_capacity: usize,

    /// Retry a failed batch once before marking its records failed
    /// Default: true
    pub retry_failed_batches: bool,

    /// Rows fetched per query from database sources
    /// Default: 1000
    pub page_size: usize,

    /// Name-to-identity resolution
    pub resolution: ResolutionConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            batch_size: 500,
            queue_capacity: 2000,
            retry_failed_batches: true,
            page_size: 1000,
            resolution: ResolutionConfig::default(),
        }
    }
}

impl ImportConfig {
    /// Small batches: short transactions, little held in memory
    pub fn small_batches() -> Self {
        Self {
            batch_size: 50,
            queue_capacity: 200,
            page_size: 100,
            ..Self::default()
        }
    }

    /// Large batches for fast one-off migrations
    pub fn bulk() -> Self {
        Self {
            batch_size: 5000,
            queue_capacity: 20000,
            page_size: 5000,
            ..Self::default()
        }
    }

    /// Number of commit attempts per batch
    pub fn attempts_per_batch(&self) -> usize {
        if self.retry_failed_batches {
            2
        } else {
            1
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".to_string());
        }
        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }

    /// Load from `path`, writing the defaults there first if it does not exist
    ///
    /// Keys missing from the file take their default values.
    pub fn load_or_create(path: &Path) -> Result<Self, ImportError> {
        if !path.exists() {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ImportError::Config(e.to_string()))?;
            }
            let content = config.to_toml().map_err(ImportError::Config)?;
            std::fs::write(path, content).map_err(|e| ImportError::Config(e.to_string()))?;
            info!(path = %path.display(), "Wrote default import configuration");
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ImportError::Config(e.to_string()))?;
        let config = Self::from_toml(&content).map_err(ImportError::Config)?;
        if config.config_version != CONFIG_VERSION {
            warn!(
                path = %path.display(),
                found = config.config_version,
                expected = CONFIG_VERSION,
                "Configuration version mismatch, missing keys use defaults"
            );
        }
        config.validate().map_err(ImportError::Config)?;
        Ok(config)
    }
}

/// Holds the current configuration and publishes reloads
///
/// Jobs take a [`snapshot`](ConfigWatcher::snapshot) when they start; a
/// reload never changes a snapshot already handed out.
pub struct ConfigWatcher {
    path: PathBuf,
    tx: watch::Sender<Arc<ImportConfig>>,
}

impl ConfigWatcher {
    /// Load (or create) the configuration at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ImportError> {
        let path = path.into();
        let config = ImportConfig::load_or_create(&path)?;
        let (tx, _rx) = watch::channel(Arc::new(config));
        Ok(Self { path, tx })
    }

    /// The configuration as of now
    pub fn snapshot(&self) -> Arc<ImportConfig> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receive every future snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<ImportConfig>> {
        self.tx.subscribe()
    }

    /// Re-read the file and publish it
    ///
    /// On error the previous configuration stays current.
    pub fn reload(&self) -> Result<Arc<ImportConfig>, ImportError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| ImportError::Config(e.to_string()))?;
        let config = ImportConfig::from_toml(&content).map_err(ImportError::Config)?;
        config.validate().map_err(ImportError::Config)?;

        let config = Arc::new(config);
        self.tx.send_replace(Arc::clone(&config));
        info!(path = %self.path.display(), "Reloaded import configuration");
        Ok(config)
    }
}
