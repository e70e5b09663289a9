//! Error types for logmill

use std::io;
use std::path::PathBuf;

/// logmill error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("write length {len} exceeds maximum file size {max}")]
    OversizedWrite { len: usize, max: u64 },

    #[error("write to log file failed after {written} bytes: {source}")]
    WriteFailed { written: usize, source: io::Error },

    #[error("can't make directories for new logfile {}: {source}", .path.display())]
    DirectoryCreateFailed { path: PathBuf, source: io::Error },

    #[error("error getting log file info for {}: {source}", .path.display())]
    StatFailed { path: PathBuf, source: io::Error },

    #[error("can't rename log file {} to {}: {source}", .from.display(), .to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("can't open new logfile {}: {source}", .path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("can't read log file directory {}: {source}", .path.display())]
    RetentionScanFailed { path: PathBuf, source: io::Error },

    #[error("failed to remove backup {}: {source}", .path.display())]
    RemovalFailed { path: PathBuf, source: io::Error },

    #[error("failed to compress log file {}: {source}", .path.display())]
    CompressionFailed { path: PathBuf, source: io::Error },

    #[error("Invalid rotation schedule: {0}")]
    InvalidSchedule(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type alias for logmill
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    pub fn schedule<S: Into<String>>(msg: S) -> Self {
        Error::InvalidSchedule(msg.into())
    }

    /// The underlying filesystem error, if this error wraps one
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            Error::WriteFailed { source, .. }
            | Error::DirectoryCreateFailed { source, .. }
            | Error::StatFailed { source, .. }
            | Error::RenameFailed { source, .. }
            | Error::OpenFailed { source, .. }
            | Error::RetentionScanFailed { source, .. }
            | Error::RemovalFailed { source, .. }
            | Error::CompressionFailed { source, .. } => Some(source),
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::IoError(e) => e,
            Error::OversizedWrite { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            other => {
                let kind = other
                    .io_source()
                    .map(|e| e.kind())
                    .unwrap_or(io::ErrorKind::Other);
                io::Error::new(kind, other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::OversizedWrite { len: 12, max: 10 };
        assert_eq!(
            err.to_string(),
            "write length 12 exceeds maximum file size 10"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let err = Error::RenameFailed {
            from: PathBuf::from("a.log"),
            to: PathBuf::from("a-1.log"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);

        let io_err: io::Error = Error::OversizedWrite { len: 2, max: 1 }.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
    }
}
