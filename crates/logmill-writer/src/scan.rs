//! Discovery of the backup family of an active file

use chrono::{DateTime, Utc};
use logmill_core::{Error, Result};
use std::fs;
use std::path::PathBuf;

use crate::naming::BackupNamer;

/// A backup found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    pub name: String,
    /// Rotation time parsed from the name
    pub timestamp: DateTime<Utc>,
    pub compressed: bool,
    /// Counter of a custom name reused within one format period; higher is newer
    pub sequence: u32,
    /// Size on disk at scan time
    pub size: u64,
}

/// Lists backups of one active file. The directory listing is read fresh on
/// every call.
#[derive(Debug, Clone)]
pub struct Scanner {
    namer: BackupNamer,
}

impl Scanner {
    pub fn new(namer: BackupNamer) -> Self {
        Self { namer }
    }

    /// Backups ordered newest first: by timestamp, then by counter. Remaining
    /// ties keep file name order.
    pub fn scan(&self) -> Result<Vec<BackupFile>> {
        let dir = self.namer.dir();
        let scan_failed = |source| Error::RetentionScanFailed {
            path: dir.to_path_buf(),
            source,
        };

        let mut backups = Vec::new();
        for entry in fs::read_dir(dir).map_err(scan_failed)? {
            let entry = entry.map_err(scan_failed)?;
            let metadata = match entry.metadata() {
                Ok(m) => m,
                // Removed between listing and stat
                Err(_) => continue,
            };
            if metadata.is_dir() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if let Some(parsed) = self.namer.parse(&name) {
                backups.push(BackupFile {
                    path: entry.path(),
                    name,
                    timestamp: parsed.timestamp,
                    compressed: parsed.compressed,
                    sequence: parsed.sequence,
                    size: metadata.len(),
                });
            }
        }

        backups.sort_by(|a, b| a.name.cmp(&b.name));
        backups.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(b.sequence.cmp(&a.sequence))
        });
        Ok(backups)
    }
}
