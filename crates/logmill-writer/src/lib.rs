//! logmill writer - size and schedule driven log rotation with backup retention
//!
//! A [`RotatingWriter`] appends to one active file. When a write would push
//! the file past its size limit, or when the cron schedule fires, the file is
//! renamed to a timestamped backup and a fresh one is started. A background
//! worker then trims old backups and optionally gzips the survivors.
//!
//! ```no_run
//! use logmill_core::WriterConfig;
//! use logmill_writer::RotatingWriter;
//!
//! let writer = RotatingWriter::new(
//!     WriterConfig::new("/var/log/app/app.log")
//!         .with_max_size(10 * 1024 * 1024)
//!         .with_max_backups(5)
//!         .with_compress(true),
//! )?;
//! writer.write(b"started\n")?;
//! writer.close()?;
//! # Ok::<(), logmill_core::Error>(())
//! ```

mod clock;
mod compress;
mod make_writer;
mod naming;
mod policy;
mod retention;
mod scan;
mod schedule;
mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compress::compress_file;
pub use naming::{compressed_sibling, BackupNamer, ParsedName};
pub use policy::{RetentionPlan, RetentionPolicy, RetentionReport};
pub use scan::{BackupFile, Scanner};
pub use schedule::RotationSchedule;
pub use writer::RotatingWriter;

pub use logmill_core::{BackupNaming, Error, Result, WriterConfig};
