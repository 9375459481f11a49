use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_LOGGED_REJECTIONS};
use crate::error::{PipelineError, Result};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "etl.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub pipeline: PipelineSettings,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(PipelineError::Config(format!("unknown storage backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_path: PathBuf::from("data/startup_analytics.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Documents per insert call
    pub batch_size: usize,
    /// Rejected records logged one by one before switching to a count
    pub max_logged_rejections: usize,
    pub data_dir: PathBuf,
    /// Input file looked up under `<data_dir>/raw/` when ingest gets no path
    pub raw_file_name: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_logged_rejections: DEFAULT_MAX_LOGGED_REJECTIONS,
            data_dir: PathBuf::from("data"),
            raw_file_name: "startups.csv".to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn default_raw_file(&self) -> PathBuf {
        self.data_dir.join("raw").join(&self.raw_file_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
    /// Directory for JSON log files; no file output when unset
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus listener address; metrics stay in-process when unset
    pub addr: Option<String>,
}

impl AppConfig {
    /// Load configuration from an explicit file, or from `etl.toml` if it
    /// exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `ETL_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("ETL_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(path) = lookup("ETL_SQLITE_PATH") {
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("ETL_BATCH_SIZE") {
            self.pipeline.batch_size = size
                .trim()
                .parse()
                .map_err(|_| PipelineError::Config(format!("ETL_BATCH_SIZE is not a number: '{}'", size)))?;
        }
        if let Some(dir) = lookup("ETL_DATA_DIR") {
            self.pipeline.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("ETL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = lookup("ETL_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        if let Some(addr) = lookup("ETL_METRICS_ADDR") {
            self.metrics.addr = Some(addr).filter(|a| !a.trim().is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.batch_size == 0 {
            return Err(PipelineError::Config("pipeline.batch_size must be at least 1".to_string()));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.storage.sqlite_path.as_os_str().is_empty() {
            return Err(PipelineError::Config("storage.sqlite_path must be set for the sqlite backend".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.pipeline.batch_size, 1000);
        assert_eq!(config.pipeline.max_logged_rejections, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[storage]\nbackend = \"memory\"\n\n[pipeline]\nbatch_size = 250\n"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.pipeline.batch_size, 250);
        assert_eq!(config.pipeline.max_logged_rejections, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ETL_STORAGE_BACKEND", "memory"),
            ("ETL_BATCH_SIZE", "50"),
            ("ETL_METRICS_ADDR", "127.0.0.1:9000"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.pipeline.batch_size, 50);
        assert_eq!(config.metrics.addr.as_deref(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(|key| (key == "ETL_STORAGE_BACKEND").then(|| "mongo".to_string()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));

        config.pipeline.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
