use std::{fmt, path::{Path, PathBuf}, str::FromStr};

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEFAULT_LEADS_KEY: &str = "royal_safa_leads";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the lead slot lives.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file under `data_dir`
    #[default]
    File,
    /// In-process map, gone on exit
    Memory,
    /// No storage capability: reads are empty and appends are not persisted
    #[serde(alias = "none")]
    Disabled,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(anyhow!("unknown storage backend `{other}`; expected file, memory or disabled")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Memory => "memory",
            Self::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_leads_key")]
    pub leads_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            file_name: default_file_name(),
            leads_key: default_leads_key(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { format: default_log_format() } }
}

fn default_data_dir() -> String { "data".into() }
fn default_file_name() -> String { "leads.json".into() }
fn default_leads_key() -> String { DEFAULT_LEADS_KEY.into() }
fn default_log_format() -> String { "compact".into() }

/// Load from `CONFIG_PATH` (default `config.toml`); a missing file yields defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        return Ok(AppConfig::default());
    }
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 环境变量优先于 TOML
        self.storage.normalize_from_env()?;
        self.storage.validate()?;
        self.logging.normalize()?;
        Ok(())
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("LEADS_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = dir;
            }
        }
        if let Ok(backend) = std::env::var("LEADS_STORAGE_BACKEND") {
            self.backend = backend.parse()?;
        }
        self.apply_defaults();
        Ok(())
    }

    fn apply_defaults(&mut self) {
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
        self.file_name = self.file_name.trim().to_string();
        self.leads_key = self.leads_key.trim().to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.leads_key.is_empty() {
            return Err(anyhow!("storage.leads_key must not be empty"));
        }
        if self.backend == StorageBackend::File {
            if self.file_name.is_empty() {
                return Err(anyhow!("storage.file_name must not be empty for the file backend"));
            }
            if self.file_name.contains('/') || self.file_name.contains('\\') {
                return Err(anyhow!("storage.file_name must be a bare file name; use storage.data_dir for the directory"));
            }
        }
        Ok(())
    }

    /// Full path of the backing file for the file backend.
    pub fn file_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.file_name)
    }
}

impl LoggingConfig {
    fn normalize(&mut self) -> Result<()> {
        let format = self.format.trim().to_ascii_lowercase();
        self.format = match format.as_str() {
            "" | "compact" => "compact".into(),
            "json" => "json".into(),
            other => return Err(anyhow!("logging.format `{other}` must be compact or json")),
        };
        Ok(())
    }
}
