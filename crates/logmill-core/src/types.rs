//! Writer configuration types

use chrono::format::{Item, StrftimeItems};
use chrono::{TimeZone, Utc};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// How rotated files are named.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackupNaming {
    /// `<stem>-<timestamp>.<ext>` with [`BACKUP_TIME_FORMAT`]
    #[default]
    Timestamp,
    /// Caller supplied chrono pattern, optionally placed into a name template
    /// containing [`TIME_PLACEHOLDER`]. Without a template the formatted time
    /// is the whole file name.
    Custom {
        time_format: String,
        template: Option<String>,
    },
}

impl BackupNaming {
    pub fn custom<S: Into<String>>(time_format: S) -> Self {
        BackupNaming::Custom {
            time_format: time_format.into(),
            template: None,
        }
    }

    pub fn custom_template<S: Into<String>, T: Into<String>>(time_format: S, template: T) -> Self {
        BackupNaming::Custom {
            time_format: time_format.into(),
            template: Some(template.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            BackupNaming::Timestamp => Ok(()),
            BackupNaming::Custom {
                time_format,
                template,
            } => {
                if time_format.trim().is_empty() {
                    return Err(Error::config("backup time format must not be empty"));
                }
                let sample = render_sample(time_format)?;
                let name = match template {
                    Some(template) => {
                        if template.matches(TIME_PLACEHOLDER).count() != 1 {
                            return Err(Error::config(format!(
                                "backup name template must contain {} exactly once: {}",
                                TIME_PLACEHOLDER, template
                            )));
                        }
                        template.replacen(TIME_PLACEHOLDER, &sample, 1)
                    }
                    None => sample,
                };
                if name.chars().any(std::path::is_separator) {
                    return Err(Error::config(format!(
                        "backup names must not contain a path separator, got '{}'",
                        name
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Format a fixed instant with `time_format`, rejecting patterns chrono can't render
fn render_sample(time_format: &str) -> Result<String> {
    let invalid = || Error::config(format!("invalid backup time format: '{}'", time_format));

    if StrftimeItems::new(time_format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }
    let sample = Utc
        .with_ymd_and_hms(2024, 12, 31, 23, 59, 59)
        .single()
        .ok_or_else(invalid)?;
    let mut rendered = String::new();
    write!(rendered, "{}", sample.format(time_format)).map_err(|_| invalid())?;
    Ok(rendered)
}

/// Configuration of one rotating writer. Immutable once a writer is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Active file; backups live next to it
    pub path: PathBuf,
    /// Rotation threshold in bytes, 0 means [`DEFAULT_MAX_SIZE`]
    pub max_size: u64,
    /// Backups to keep, 0 keeps all
    pub max_backups: usize,
    /// Maximum backup age, zero keeps all
    pub max_age: Duration,
    /// Gzip backups that survive retention
    pub compress: bool,
    /// Use local time for backup names and the schedule (UTC otherwise)
    pub local_time: bool,
    /// Six field cron expression, `None` disables scheduled rotation
    pub rotate_cron: Option<String>,
    pub naming: BackupNaming,
}

impl WriterConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            max_size: 0,
            max_backups: 0,
            max_age: Duration::ZERO,
            compress: false,
            local_time: true,
            rotate_cron: Some(DEFAULT_ROTATE_CRON.to_string()),
            naming: BackupNaming::Timestamp,
        }
    }

    /// Settings of the application level default writer
    pub fn default_writer() -> Self {
        Self::new(default_log_path())
            .with_max_backups(DEFAULT_MAX_BACKUPS)
            .with_compress(true)
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    pub fn with_max_age(mut self, age: Duration) -> Self {
        self.max_age = age;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_local_time(mut self, local_time: bool) -> Self {
        self.local_time = local_time;
        self
    }

    pub fn with_rotate_cron<S: Into<String>>(mut self, expr: S) -> Self {
        self.rotate_cron = Some(expr.into());
        self
    }

    /// Disable scheduled rotation; size and explicit rotation still apply
    pub fn without_schedule(mut self) -> Self {
        self.rotate_cron = None;
        self
    }

    pub fn with_naming(mut self, naming: BackupNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Rotation threshold with the default applied
    pub fn resolved_max_size(&self) -> u64 {
        if self.max_size == 0 {
            DEFAULT_MAX_SIZE
        } else {
            self.max_size
        }
    }

    /// Directory holding the active file and its backups
    pub fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Whether a retention pass has anything to do
    pub fn has_retention(&self) -> bool {
        self.max_backups > 0 || !self.max_age.is_zero() || self.compress
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::config("log file path must be set"));
        }
        if file_name(&self.path).is_none() {
            return Err(Error::config(format!(
                "log file path has no file name: {}",
                self.path.display()
            )));
        }
        if let Some(expr) = &self.rotate_cron {
            let fields = expr.split_whitespace().count();
            if fields != CRON_FIELDS {
                return Err(Error::schedule(format!(
                    "expected {} fields (sec min hour dom month dow), got {}: '{}'",
                    CRON_FIELDS, fields, expr
                )));
            }
        }
        self.naming.validate()
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_max_size_default() {
        let config = WriterConfig::new("/tmp/app.log");
        assert_eq!(config.resolved_max_size(), DEFAULT_MAX_SIZE);

        let config = config.with_max_size(1000);
        assert_eq!(config.resolved_max_size(), 1000);
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = WriterConfig::new("").validate().unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_cron_field_count() {
        let config = WriterConfig::new("app.log").with_rotate_cron("0 0 * * *");
        assert!(matches!(
            config.validate().unwrap_err(),
            Error::InvalidSchedule(_)
        ));

        let config = WriterConfig::new("app.log").with_rotate_cron("*/5 * * * * *");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_template_needs_placeholder() {
        let config = WriterConfig::new("app.log")
            .with_naming(BackupNaming::custom_template("%Y%m%d", "app.log.old"));
        assert!(config.validate().is_err());

        let config = WriterConfig::new("app.log")
            .with_naming(BackupNaming::custom_template("%Y%m%d", "app-{time}.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_time_format_rejected() {
        let config = WriterConfig::new("app.log").with_naming(BackupNaming::custom("app-%Q.log"));
        assert!(matches!(config.validate().unwrap_err(), Error::ConfigError(_)));
    }

    #[test]
    fn test_rendered_separator_rejected() {
        // %D renders as 12/31/24
        for naming in [
            BackupNaming::custom("%D"),
            BackupNaming::custom("app-%x.log"),
            BackupNaming::custom_template("%Y", "logs/{time}.log"),
        ] {
            let config = WriterConfig::new("app.log").with_naming(naming);
            assert!(matches!(config.validate().unwrap_err(), Error::ConfigError(_)));
        }

        let config = WriterConfig::new("app.log")
            .with_naming(BackupNaming::custom("app-%Y%m%d-%H%M%S.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dir_of_bare_file_name() {
        assert_eq!(WriterConfig::new("app.log").dir(), PathBuf::from("."));
        assert_eq!(
            WriterConfig::new("/var/log/app.log").dir(),
            PathBuf::from("/var/log")
        );
    }

    #[test]
    fn test_has_retention() {
        let config = WriterConfig::new("app.log");
        assert!(!config.has_retention());
        assert!(config.clone().with_compress(true).has_retention());
        assert!(config
            .clone()
            .with_max_age(Duration::from_secs(60))
            .has_retention());
        assert!(config.with_max_backups(2).has_retention());
    }

    #[test]
    fn test_default_writer_settings() {
        let config = WriterConfig::default_writer();
        assert_eq!(config.max_backups, DEFAULT_MAX_BACKUPS);
        assert!(config.compress);
        assert_eq!(config.rotate_cron.as_deref(), Some(DEFAULT_ROTATE_CRON));
    }
}
