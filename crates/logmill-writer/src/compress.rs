//! Gzip compression of rotated files

use flate2::write::GzEncoder;
use logmill_core::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::naming::compressed_sibling;

/// Compress `path` into `<path>.gz` and remove the original.
///
/// A leftover `.gz` from an interrupted attempt is overwritten. If compression
/// fails the partial `.gz` is removed and the original is kept.
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    let dest = compressed_sibling(path);
    let failed = |source| Error::CompressionFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut src = File::open(path).map_err(failed)?;
    let metadata = src.metadata().map_err(failed)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(metadata.permissions().mode());
    }
    let dest_file = options.open(&dest).map_err(failed)?;

    if let Err(e) = encode(&mut src, dest_file) {
        let _ = fs::remove_file(&dest);
        return Err(failed(e));
    }
    drop(src);

    #[cfg(unix)]
    crate::writer::copy_owner(&dest, &metadata);

    fs::remove_file(path).map_err(|source| Error::RemovalFailed {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(src = %path.display(), dest = %dest.display(), "compressed backup");
    Ok(dest)
}

fn encode(src: &mut File, dest: File) -> io::Result<()> {
    let mut encoder = GzEncoder::new(dest, flate2::Compression::default());
    io::copy(src, &mut encoder)?;
    let mut dest = encoder.finish()?;
    dest.flush()?;
    dest.sync_all()
}
