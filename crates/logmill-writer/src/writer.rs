//! Rotating log writer

use logmill_core::{Error, Result, WriterConfig, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::naming::BackupNamer;
use crate::policy::{RetentionPolicy, RetentionReport};
use crate::retention::{Retention, RetentionWorker};
use crate::schedule::{Fired, RotationSchedule, Scheduler};
use crate::scan::{BackupFile, Scanner};

/// Thread safe writer that keeps its file below a size limit and rotates it
/// into timestamped backups.
///
/// Clones share the same file, lock and background tasks.
#[derive(Clone)]
pub struct RotatingWriter {
    inner: Arc<Inner>,
}

struct Inner {
    config: WriterConfig,
    max_size: u64,
    namer: BackupNamer,
    scanner: Scanner,
    clock: Arc<dyn Clock>,
    state: Mutex<ActiveFile>,
    retention: Arc<Retention>,
    worker: Mutex<Option<RetentionWorker>>,
    scheduler: Mutex<Option<Scheduler>>,
}

/// `size` counts the bytes appended through `file` since it was opened
#[derive(Debug, Default)]
struct ActiveFile {
    file: Option<File>,
    size: u64,
}

impl RotatingWriter {
    /// Create a writer. Nothing is opened until the first write.
    ///
    /// Fails if the config has no path or an invalid schedule. Starts the
    /// rotation scheduler when a cron expression is configured.
    pub fn new(config: WriterConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: WriterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let schedule = config
            .rotate_cron
            .as_deref()
            .map(|expr| RotationSchedule::parse(expr, config.local_time))
            .transpose()?;

        let namer = BackupNamer::new(&config);
        let scanner = Scanner::new(namer.clone());
        let retention = Arc::new(Retention::new(
            scanner.clone(),
            RetentionPolicy::from_config(&config),
            clock.clone(),
        ));

        let inner = Arc::new(Inner {
            max_size: config.resolved_max_size(),
            config,
            namer,
            scanner,
            clock: clock.clone(),
            state: Mutex::new(ActiveFile::default()),
            retention,
            worker: Mutex::new(None),
            scheduler: Mutex::new(None),
        });

        if let Some(schedule) = schedule {
            let weak = Arc::downgrade(&inner);
            let scheduler = Scheduler::spawn(schedule, clock, move || scheduled_rotate(&weak))?;
            *inner.scheduler.lock() = Some(scheduler);
        }

        Ok(Self { inner })
    }

    /// The application level default writer (see [`WriterConfig::default_writer`])
    pub fn default_writer() -> Result<Self> {
        Self::new(WriterConfig::default_writer())
    }

    /// Append `buf` to the active file, rotating first if it would overflow.
    ///
    /// A single write larger than the size limit fails with
    /// [`Error::OversizedWrite`] and writes nothing.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        self.inner.write(buf)
    }

    /// Rotate now, regardless of size (e.g. on SIGHUP)
    pub fn rotate_now(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        self.inner.rotate_locked(&mut state)
    }

    /// Close the active file and stop the background tasks.
    ///
    /// Closing twice is fine. A later write reopens the file and restarts the
    /// retention worker; scheduled rotation stays off.
    pub fn close(&self) -> Result<()> {
        let file = {
            let mut state = self.inner.state.lock();
            state.size = 0;
            state.file.take()
        };

        let scheduler = self.inner.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown();
        }
        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            worker.shutdown();
        }

        if let Some(file) = file {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Run a retention pass on the calling thread
    pub fn run_retention(&self) -> RetentionReport {
        self.inner.retention.run_pass()
    }

    /// Receive a [`RetentionReport`] after every retention pass, including the
    /// background ones. This is where asynchronous retention errors surface.
    ///
    /// Each receiver buffers up to 64 unread reports; later ones are dropped
    /// for that receiver until it catches up.
    pub fn subscribe_retention(&self) -> crossbeam_channel::Receiver<RetentionReport> {
        self.inner.retention.subscribe()
    }

    /// Current backups, newest first
    pub fn backups(&self) -> Result<Vec<BackupFile>> {
        self.inner.scanner.scan()
    }

    pub fn path(&self) -> &Path {
        &self.inner.config.path
    }

    pub fn config(&self) -> &WriterConfig {
        &self.inner.config
    }

    /// Rotation threshold in bytes
    pub fn max_size(&self) -> u64 {
        self.inner.max_size
    }

    /// Bytes written to the open file, 0 when nothing is open
    pub fn current_size(&self) -> u64 {
        self.inner.state.lock().size
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().file.is_some()
    }

    pub fn flush(&self) -> Result<()> {
        if let Some(file) = self.inner.state.lock().file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("path", &self.inner.config.path)
            .field("max_size", &self.inner.max_size)
            .finish_non_exhaustive()
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.inner.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(RotatingWriter::flush(self)?)
    }
}

impl Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.inner.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(RotatingWriter::flush(self)?)
    }
}

fn scheduled_rotate(weak: &Weak<Inner>) -> Fired {
    let Some(inner) = weak.upgrade() else {
        return Fired::Detached;
    };
    let mut state = inner.state.lock();
    match inner.rotate_locked(&mut state) {
        Ok(()) => Fired::Rotated,
        Err(e) => {
            warn!(path = %inner.config.path.display(), error = %e, "scheduled rotation failed");
            Fired::Failed
        }
    }
}

impl Inner {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        let len = buf.len() as u64;
        if len > self.max_size {
            return Err(Error::OversizedWrite {
                len: buf.len(),
                max: self.max_size,
            });
        }

        let mut state = self.state.lock();
        if state.file.is_none() {
            self.open_existing_or_new(&mut state, len)?;
        }
        if state.size + len > self.max_size {
            self.rotate_locked(&mut state)?;
        }
        self.append(&mut state, buf)
    }

    fn append(&self, state: &mut ActiveFile, buf: &[u8]) -> Result<usize> {
        let Some(file) = state.file.as_mut() else {
            return Err(Error::OpenFailed {
                path: self.config.path.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "log file is not open"),
            });
        };

        let mut written = 0;
        let result = loop {
            if written == buf.len() {
                break Ok(written);
            }
            match file.write(&buf[written..]) {
                Ok(0) => {
                    break Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };

        state.size += written as u64;
        result.map_err(|source| Error::WriteFailed { written, source })
    }

    /// Open the file left by a previous run if the write fits, otherwise
    /// rotate it away first.
    fn open_existing_or_new(&self, state: &mut ActiveFile, write_len: u64) -> Result<()> {
        self.request_retention();

        let path = &self.config.path;
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.open_new(state),
            Err(source) => {
                return Err(Error::StatFailed {
                    path: path.clone(),
                    source,
                })
            }
        };

        if metadata.len() + write_len >= self.max_size {
            return self.rotate_locked(state);
        }

        match OpenOptions::new().append(true).open(path) {
            Ok(file) => {
                debug!(path = %path.display(), size = metadata.len(), "appending to existing log file");
                state.file = Some(file);
                state.size = metadata.len();
                Ok(())
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "can't append to existing log file, starting a new one");
                self.open_new(state)
            }
        }
    }

    /// Close, move the current file to a backup name and start a fresh file.
    ///
    /// The rename and the create are two steps: a crash between them leaves no
    /// active file until the next write creates it.
    fn rotate_locked(&self, state: &mut ActiveFile) -> Result<()> {
        state.file.take();
        state.size = 0;
        self.open_new(state)?;
        self.request_retention();
        Ok(())
    }

    /// Expects no open handle. Moves an existing file out of the way.
    fn open_new(&self, state: &mut ActiveFile) -> Result<()> {
        let dir = self.config.dir();
        create_dir_all(&dir).map_err(|source| Error::DirectoryCreateFailed {
            path: dir.clone(),
            source,
        })?;

        let path = &self.config.path;
        let previous = fs::metadata(path).ok();
        if previous.is_some() {
            let backup = self.namer.backup_path(self.clock.now())?;
            fs::rename(path, &backup).map_err(|source| Error::RenameFailed {
                from: path.clone(),
                to: backup.clone(),
                source,
            })?;
            debug!(from = %path.display(), to = %backup.display(), "rotated log file");
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let mode = previous
                .as_ref()
                .map(|m| m.permissions().mode())
                .unwrap_or(DEFAULT_FILE_MODE);
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = DEFAULT_FILE_MODE;

        let file = options.open(path).map_err(|source| Error::OpenFailed {
            path: path.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            if let Some(previous) = &previous {
                copy_owner(path, previous);
            }
        }

        state.file = Some(file);
        state.size = 0;
        Ok(())
    }

    fn request_retention(&self) {
        let mut worker = self.worker.lock();
        if worker.is_none() {
            match RetentionWorker::spawn(self.retention.clone()) {
                Ok(spawned) => *worker = Some(spawned),
                Err(e) => {
                    warn!(error = %e, "can't start retention worker");
                    return;
                }
            }
        }
        if let Some(worker) = worker.as_ref() {
            worker.request();
        }
    }
}

fn create_dir_all(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DEFAULT_DIR_MODE);
    }
    #[cfg(not(unix))]
    let _ = DEFAULT_DIR_MODE;
    builder.create(dir)
}

/// Give `path` the owner of the file described by `previous`. Failure is only
/// logged: an unprivileged process can't hand files to other users.
#[cfg(unix)]
pub(crate) fn copy_owner(path: &Path, previous: &fs::Metadata) {
    use std::os::unix::fs::MetadataExt;

    let current = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return,
    };
    if current.uid() == previous.uid() && current.gid() == previous.gid() {
        return;
    }
    if let Err(e) = std::os::unix::fs::chown(path, Some(previous.uid()), Some(previous.gid())) {
        debug!(path = %path.display(), error = %e, "can't copy owner of previous log file");
    }
}
