//! Service settings
//!
//! Built once at startup from defaults, an optional TOML file and command-line /
//! environment overrides, then shared read-only.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::DEFAULT_QUALITY;
use crate::utils::normalize_extension;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub project_name: String,
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    pub temp_dir: PathBuf,
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    pub jpeg_quality: u8,
    pub auto_cleanup: bool,
    pub file_retention_minutes: u64,
    pub cleanup_interval_secs: u64,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_name: "HEIC to JPG Converter API".to_string(),
            api_prefix: "/api/v1".to_string(),
            cors_origins: vec!["*".to_string()],
            temp_dir: PathBuf::from("temp"),
            max_file_size: 50 * 1024 * 1024,
            allowed_extensions: vec![".heic".to_string(), ".heif".to_string()],
            jpeg_quality: DEFAULT_QUALITY,
            auto_cleanup: true,
            file_retention_minutes: 30,
            cleanup_interval_secs: 600,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Defaults, overlaid with the TOML file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                log::debug!("Loading settings from: {}", path.display());
                Self::load_from_path(path)?
            }
            None => Self::default(),
        };

        settings.normalized()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Normalises extensions and rejects values the service cannot run with.
    pub fn normalized(mut self) -> Result<Self> {
        self.allowed_extensions = self
            .allowed_extensions
            .iter()
            .filter(|ext| !ext.trim().is_empty())
            .map(|ext| normalize_extension(ext))
            .collect();
        let prefix = self.api_prefix.trim_matches('/');
        self.api_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("/{}", prefix)
        };

        if self.allowed_extensions.is_empty() {
            bail!("At least one allowed extension is required");
        }
        if self.max_file_size == 0 {
            bail!("max_file_size must be positive");
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            bail!("jpeg_quality must be between 1 and 100");
        }
        if self.cleanup_interval_secs == 0 {
            bail!("cleanup_interval_secs must be positive");
        }

        Ok(self)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.file_retention_minutes * 60)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn download_url(&self, name: &str) -> String {
        format!("{}/download/{}", self.api_prefix, name)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}
