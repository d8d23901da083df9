use crate::theme::ThemeMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "QUANTA_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where conversations and UI preferences are stored.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Theme used until the user toggles it.
    #[serde(default)]
    pub theme: ThemeMode,

    #[serde(default = "default_latency_min_ms")]
    pub latency_min_ms: u64,

    #[serde(default = "default_latency_max_ms")]
    pub latency_max_ms: u64,

    /// Probability in `[0, 1]` that a reply fails as if the network dropped.
    #[serde(default)]
    pub failure_rate: f64,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    default_app_dir().join("data")
}

fn default_latency_min_ms() -> u64 {
    1500
}

fn default_latency_max_ms() -> u64 {
    2500
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            theme: ThemeMode::default(),
            latency_min_ms: default_latency_min_ms(),
            latency_max_ms: default_latency_max_ms(),
            failure_rate: 0.0,
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// A missing file is created with the defaults so there is something to
    /// edit. Logging is not installed yet when this runs, so problems are
    /// reported on stderr.
    pub fn load_or_default() -> Self {
        Self::load_or_init(&config_path())
    }

    fn load_or_init(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            if let Err(err) = config.save_to_file(path) {
                eprintln!("warning: {err}; continuing with default configuration");
            }
            return config;
        }
        Self::load_from_file(path).unwrap_or_else(|err| {
            eprintln!("warning: {err}; using default configuration");
            Self::default()
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `~/.quanta`, or `.quanta` when no home directory is known.
pub fn default_app_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".quanta"))
        .unwrap_or_else(|| PathBuf::from(".quanta"))
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| default_app_dir().join("config.toml"))
}
