//! Configuration System
//!
//! Handles loading application configuration from files and environment
//! variables. Supports TOML config files and environment variable
//! overrides. This is the CLI-side configuration; the per-index descriptor
//! persisted under the index root lives in [`crate::index::config`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub index: IndexSection,

    #[serde(default)]
    pub source: SourceSection,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Index location configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSection {
    #[serde(default = "default_index_root")]
    pub root: String,

    /// Maximum number of recently read manifests kept in memory
    #[serde(default)]
    pub cache_size: usize,
}

fn default_index_root() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("chunkindex").join("index").to_string_lossy().to_string())
        .unwrap_or_else(|| "./chunkindex-index".to_string())
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            root: default_index_root(),
            cache_size: 0,
        }
    }
}

/// Source archive configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    /// Root path or URL of the source files
    pub path: Option<String>,

    /// Source protocol override; derived from the path when absent
    pub protocol: Option<String>,

    #[serde(default = "default_source_suffix")]
    pub suffix: String,
}

fn default_source_suffix() -> String {
    crate::index::DEFAULT_SOURCE_SUFFIX.to_string()
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            path: None,
            protocol: None,
            suffix: default_source_suffix(),
        }
    }
}

/// Sync run configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

fn default_num_workers() -> usize {
    1
}

fn default_block_size() -> usize {
    100
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            block_size: default_block_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("chunkindex").join("config.toml")),
            Some(PathBuf::from("/etc/chunkindex/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("CHUNKINDEX_INDEX_ROOT") {
            self.index.root = root;
        }
        if let Ok(path) = std::env::var("CHUNKINDEX_SOURCE_PATH") {
            self.source.path = Some(path);
        }
        if let Ok(workers) = std::env::var("CHUNKINDEX_SYNC_WORKERS") {
            if let Ok(n) = workers.parse() {
                self.sync.num_workers = n;
            }
        }
        if let Ok(level) = std::env::var("CHUNKINDEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CHUNKINDEX_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index: IndexSection::default(),
            source: SourceSection::default(),
            sync: SyncSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# chunkindex Configuration
#
# Environment variables override these settings:
# - CHUNKINDEX_INDEX_ROOT
# - CHUNKINDEX_SOURCE_PATH
# - CHUNKINDEX_SYNC_WORKERS
# - CHUNKINDEX_LOG_LEVEL
# - CHUNKINDEX_LOG_FORMAT

[index]
# Directory holding the index configuration and manifest tree
root = "~/.local/share/chunkindex/index"

# Maximum number of recently read manifests kept in memory (0 disables)
cache_size = 0

[source]
# Root path or URL of the source archive, e.g. "/data/smos" or "s3://bucket/SMOS"
# path = ""

# Source protocol; derived from the path when omitted
# protocol = "file"

# Suffix of indexable source files
suffix = ".nc"

[sync]
# Number of concurrent sync workers (1 = sequential)
num_workers = 1

# Files per dispatched block when running with multiple workers
block_size = 100

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
