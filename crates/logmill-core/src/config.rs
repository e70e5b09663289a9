//! Configuration file parsing for logmill
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::types::{BackupNaming, WriterConfig};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Configuration file structure (logmill.toml/yaml/json)
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub writer: WriterSection,
}

/// `[writer]` table; every field is optional so flags can fill the gaps
#[derive(Debug, Deserialize, Default, Clone)]
pub struct WriterSection {
    pub path: Option<String>,
    pub max_size_bytes: Option<u64>,
    pub max_backups: Option<usize>,
    pub max_age_secs: Option<u64>,
    pub compress: Option<bool>,
    pub local_time: Option<bool>,
    /// Empty string disables scheduled rotation
    pub rotate_cron: Option<String>,
    pub backup_time_format: Option<String>,
    pub backup_name_template: Option<String>,
}

impl ConfigFile {
    /// Load config from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }

    /// Find and load a config file from a directory
    pub fn find_and_load(dir: &Path) -> Result<(Self, PathBuf)> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok((config, path));
            }
        }
        Err(Error::ConfigError(format!(
            "No config file found in {}. Expected one of: {:?}",
            dir.display(),
            CONFIG_FILES
        )))
    }
}

impl WriterSection {
    /// Fields set in `other` win over fields set here
    pub fn merge(self, other: WriterSection) -> WriterSection {
        WriterSection {
            path: other.path.or(self.path),
            max_size_bytes: other.max_size_bytes.or(self.max_size_bytes),
            max_backups: other.max_backups.or(self.max_backups),
            max_age_secs: other.max_age_secs.or(self.max_age_secs),
            compress: other.compress.or(self.compress),
            local_time: other.local_time.or(self.local_time),
            rotate_cron: other.rotate_cron.or(self.rotate_cron),
            backup_time_format: other.backup_time_format.or(self.backup_time_format),
            backup_name_template: other.backup_name_template.or(self.backup_name_template),
        }
    }

    /// Convert to a validated WriterConfig. Relative paths resolve against `base_dir`.
    pub fn into_writer_config(self, base_dir: &Path) -> Result<WriterConfig> {
        let path = self
            .path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::config("writer.path is required"))?;
        let path = if Path::new(&path).is_absolute() {
            PathBuf::from(path)
        } else {
            base_dir.join(path)
        };

        let mut config = WriterConfig::new(path)
            .with_max_size(self.max_size_bytes.unwrap_or(0))
            .with_max_backups(self.max_backups.unwrap_or(0))
            .with_max_age(Duration::from_secs(self.max_age_secs.unwrap_or(0)))
            .with_compress(self.compress.unwrap_or(false))
            .with_local_time(self.local_time.unwrap_or(true));

        config = match self.rotate_cron {
            Some(expr) if expr.trim().is_empty() => config.without_schedule(),
            Some(expr) => config.with_rotate_cron(expr.trim()),
            None => config,
        };

        config = match (self.backup_time_format, self.backup_name_template) {
            (Some(format), Some(template)) => {
                config.with_naming(BackupNaming::custom_template(format, template))
            }
            (Some(format), None) => config.with_naming(BackupNaming::custom(format)),
            (None, Some(_)) => {
                return Err(Error::config(
                    "writer.backup_name_template requires writer.backup_time_format",
                ))
            }
            (None, None) => config,
        };

        config.validate()?;
        Ok(config)
    }
}
