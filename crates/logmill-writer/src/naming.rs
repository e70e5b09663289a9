//! Backup file naming and the reverse mapping from names to timestamps

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use logmill_core::{
    BackupNaming, Error, Result, WriterConfig, BACKUP_TIME_FORMAT, COMPRESS_SUFFIX,
    TIME_PLACEHOLDER,
};
use std::fmt::Write;
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on millisecond bumps or counter values when a name is taken
const MAX_NAME_BUMPS: u32 = 1000;

/// What a backup file name says about the backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName {
    pub timestamp: DateTime<Utc>,
    pub compressed: bool,
    /// `.N` counter of a custom name reused within one format period, 0 for the first
    pub sequence: u32,
}

/// Derives backup names for one active file.
#[derive(Debug, Clone)]
pub struct BackupNamer {
    dir: PathBuf,
    active_name: String,
    /// `<stem>-`
    prefix: String,
    /// `.<ext>` or empty
    ext: String,
    naming: BackupNaming,
    local_time: bool,
}

impl BackupNamer {
    pub fn new(config: &WriterConfig) -> Self {
        let active_name = config
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (prefix, ext) = prefix_and_ext(&config.path);

        Self {
            dir: config.dir(),
            active_name,
            prefix,
            ext,
            naming: config.naming.clone(),
            local_time: config.local_time,
        }
    }

    /// Directory the backups live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the active file
    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    /// Backup file name for a rotation happening at `at`
    pub fn name_at(&self, at: DateTime<Utc>) -> Result<String> {
        match &self.naming {
            BackupNaming::Timestamp => Ok(format!(
                "{}{}{}",
                self.prefix,
                self.format_time(at, BACKUP_TIME_FORMAT)?,
                self.ext
            )),
            BackupNaming::Custom {
                time_format,
                template,
            } => {
                let time = self.format_time(at, time_format)?;
                Ok(match template {
                    Some(template) => template.replacen(TIME_PLACEHOLDER, &time, 1),
                    None => time,
                })
            }
        }
    }

    /// Full backup path for a rotation at `at`. An existing backup (plain or
    /// compressed) is never reused.
    ///
    /// With the default scheme the timestamp moves forward a millisecond at a
    /// time until the name is free. Custom names get a `.1`, `.2`, ... suffix.
    pub fn backup_path(&self, at: DateTime<Utc>) -> Result<PathBuf> {
        let base = self.name_at(at)?;
        let mut candidate = self.dir.join(&base);

        for bump in 1..=MAX_NAME_BUMPS {
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
            let name = match self.naming {
                BackupNaming::Timestamp => {
                    self.name_at(at + Duration::milliseconds(i64::from(bump)))?
                }
                BackupNaming::Custom { .. } => format!("{}.{}", base, bump),
            };
            candidate = self.dir.join(name);
        }
        if !is_taken(&candidate) {
            return Ok(candidate);
        }

        Err(Error::RenameFailed {
            from: self.dir.join(&self.active_name),
            to: candidate,
            source: io::Error::new(io::ErrorKind::AlreadyExists, "every backup name is taken"),
        })
    }

    /// Parse a directory entry name, or `None` if it is not a backup of this
    /// active file.
    pub fn parse(&self, file_name: &str) -> Option<ParsedName> {
        if file_name == self.active_name {
            return None;
        }
        let (name, compressed) = match file_name.strip_suffix(COMPRESS_SUFFIX) {
            Some(stripped) if self.parse_sequenced(file_name).is_none() => (stripped, true),
            _ => (file_name, false),
        };
        let (timestamp, sequence) = self.parse_sequenced(name)?;
        Some(ParsedName {
            timestamp,
            compressed,
            sequence,
        })
    }

    /// Timestamp and counter of an uncompressed name
    fn parse_sequenced(&self, name: &str) -> Option<(DateTime<Utc>, u32)> {
        if let Some(ts) = self.time_from_name(name) {
            return Some((ts, 0));
        }
        if self.naming == BackupNaming::Timestamp {
            return None;
        }
        let (base, counter) = name.rsplit_once('.')?;
        if counter.is_empty() || !counter.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let sequence = counter.parse().ok().filter(|n| *n > 0)?;
        self.time_from_name(base).map(|ts| (ts, sequence))
    }

    fn time_from_name(&self, name: &str) -> Option<DateTime<Utc>> {
        let naive = match &self.naming {
            BackupNaming::Timestamp => {
                let ts = strip_affixes(name, &self.prefix, &self.ext)?;
                NaiveDateTime::parse_from_str(ts, BACKUP_TIME_FORMAT).ok()?
            }
            BackupNaming::Custom {
                time_format,
                template,
            } => {
                let ts = match template {
                    Some(template) => {
                        let (before, after) = template.split_once(TIME_PLACEHOLDER)?;
                        strip_affixes(name, before, after)?
                    }
                    None => name,
                };
                parse_naive(ts, time_format)?
            }
        };
        Some(self.to_utc(naive))
    }

    fn format_time(&self, at: DateTime<Utc>, format: &str) -> Result<String> {
        let mut out = String::new();
        let written = if self.local_time {
            write!(out, "{}", at.with_timezone(&Local).format(format))
        } else {
            write!(out, "{}", at.format(format))
        };
        written.map_err(|_| Error::config(format!("invalid backup time format: '{}'", format)))?;
        Ok(out)
    }

    fn to_utc(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        if self.local_time {
            if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                return local.with_timezone(&Utc);
            }
        }
        Utc.from_utc_datetime(&naive)
    }
}

fn is_taken(path: &Path) -> bool {
    path.exists() || compressed_sibling(path).exists()
}

/// `<name>.gz` next to `path`
pub fn compressed_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(COMPRESS_SUFFIX);
    PathBuf::from(name)
}

/// Split the active file name into `<stem>-` and `.<ext>`
fn prefix_and_ext(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (format!("{}-", stem), ext)
}

fn strip_affixes<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let middle = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if middle.is_empty() {
        None
    } else {
        Some(middle)
    }
}

/// Date-only formats yield midnight
fn parse_naive(s: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, format).ok().or_else(|| {
        NaiveDate::parse_from_str(s, format)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    })
}
