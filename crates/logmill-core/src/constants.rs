//! Constants and default values for logmill

use std::path::PathBuf;

/// Conversion factor between megabytes and bytes
pub const MEGABYTE: u64 = 1024 * 1024;

/// Default rotation threshold in bytes (100MB), used when the configured size is 0
pub const DEFAULT_MAX_SIZE: u64 = 100 * MEGABYTE;

/// Default active log file used by the default writer
pub const DEFAULT_LOG_PATH: &str = "./log/default.log";

/// Max backups kept by the default writer
pub const DEFAULT_MAX_BACKUPS: usize = 7;

/// 00:00:00 every day (sec min hour dom month dow)
pub const DEFAULT_ROTATE_CRON: &str = "0 0 0 * * *";

/// Number of fields a rotation cron expression must have
pub const CRON_FIELDS: usize = 6;

/// chrono pattern of the timestamp embedded in default backup names
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// chrono pattern used for the optional line prefix when piping
pub const PRINT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Suffix appended to gzip-compressed backups
pub const COMPRESS_SUFFIX: &str = ".gz";

/// Placeholder replaced by the formatted timestamp in a backup name template
pub const TIME_PLACEHOLDER: &str = "{time}";

/// Mode for active files when there is no previous file to copy it from
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode for directories created to hold the active file
pub const DEFAULT_DIR_MODE: u32 = 0o744;

/// Default config file names to search for (in priority order)
pub const CONFIG_FILES: &[&str] = &[
    "logmill.toml",
    "logmill.yaml",
    "logmill.yml",
    "logmill.json",
];

/// Path of the active file used by the default writer
pub fn default_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_PATH)
}
