//! Retention policy: which backups to keep, remove or compress

use chrono::{DateTime, Utc};
use logmill_core::{Error, WriterConfig};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::compress::compress_file;
use crate::scan::BackupFile;

/// Limits applied on every retention pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// 0 keeps every backup
    pub max_backups: usize,
    /// Zero keeps every backup
    pub max_age: Duration,
    pub compress: bool,
}

/// Outcome of evaluating a policy against a backup listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Survivors that stay as they are
    pub keep: Vec<BackupFile>,
    pub remove: Vec<BackupFile>,
    /// Survivors that get compressed
    pub compress: Vec<BackupFile>,
}

/// What a retention pass did
#[derive(Debug, Clone, Default)]
pub struct RetentionReport {
    pub removed: Vec<PathBuf>,
    /// Paths of the newly written `.gz` files
    pub compressed: Vec<PathBuf>,
    /// Backups left on disk after the pass
    pub retained: usize,
    /// First failure of the pass; later failures are only logged
    pub error: Option<Arc<Error>>,
}

impl RetentionReport {
    pub(crate) fn failed(error: Error) -> Self {
        Self {
            error: Some(Arc::new(error)),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn first_error(&self) -> Option<&Error> {
        self.error.as_deref()
    }

    fn record(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(Arc::new(error));
        } else {
            debug!(error = %error, "additional retention failure");
        }
    }
}

impl RetentionPolicy {
    pub fn from_config(config: &WriterConfig) -> Self {
        Self {
            max_backups: config.max_backups,
            max_age: config.max_age,
            compress: config.compress,
        }
    }

    /// Nothing to enforce, a pass can skip the directory scan
    pub fn is_noop(&self) -> bool {
        self.max_backups == 0 && self.max_age.is_zero() && !self.compress
    }

    /// Partition `backups` (newest first) into keep / remove / compress.
    ///
    /// The count limit is applied first; the age limit then runs over what the
    /// count limit kept. A compressed and an uncompressed file count as two
    /// backups.
    pub fn plan(&self, backups: Vec<BackupFile>, now: DateTime<Utc>) -> RetentionPlan {
        let mut plan = RetentionPlan::default();
        let mut remaining = backups;

        if self.max_backups > 0 && remaining.len() > self.max_backups {
            plan.remove = remaining.split_off(self.max_backups);
        }

        if let Some(cutoff) = self.age_cutoff(now) {
            let (expired, fresh): (Vec<_>, Vec<_>) =
                remaining.into_iter().partition(|b| b.timestamp < cutoff);
            plan.remove.extend(expired);
            remaining = fresh;
        }

        if self.compress {
            let (compress, keep): (Vec<_>, Vec<_>) =
                remaining.into_iter().partition(|b| !b.compressed);
            plan.compress = compress;
            plan.keep = keep;
        } else {
            plan.keep = remaining;
        }

        plan
    }

    fn age_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.max_age.is_zero() {
            return None;
        }
        let age = chrono::Duration::from_std(self.max_age).ok()?;
        now.checked_sub_signed(age)
    }
}

impl RetentionPlan {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.compress.is_empty()
    }

    /// Carry out removals, then compressions. Every planned action is attempted;
    /// the first failure ends up in the report.
    pub fn apply(self) -> RetentionReport {
        let mut report = RetentionReport {
            retained: self.keep.len() + self.compress.len(),
            ..Default::default()
        };

        for backup in self.remove {
            match fs::remove_file(&backup.path) {
                Ok(()) => {
                    debug!(path = %backup.path.display(), "removed backup");
                    report.removed.push(backup.path);
                }
                Err(source) => report.record(Error::RemovalFailed {
                    path: backup.path,
                    source,
                }),
            }
        }

        let kept: HashSet<PathBuf> = self.keep.into_iter().map(|b| b.path).collect();
        for backup in self.compress {
            match compress_file(&backup.path) {
                Ok(dest) => {
                    // a stale twin in `keep` was just overwritten
                    if kept.contains(&dest) {
                        report.retained -= 1;
                    }
                    report.compressed.push(dest);
                }
                Err(e) => report.record(e),
            }
        }

        report
    }
}
