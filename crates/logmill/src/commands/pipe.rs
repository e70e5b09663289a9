//! Pipe command - copy stdin into a rotating log file

use anyhow::Result;
use chrono::Local;
use logmill_core::{Error, PRINT_TIME_FORMAT};
use logmill_writer::RotatingWriter;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::PipeArgs;

enum Event {
    Rotate,
    Stop,
}

/// SIGHUP asks for a rotation, SIGINT and SIGTERM stop the pipe
#[cfg(unix)]
struct Signals {
    hangup: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn next(&mut self) -> Event {
        tokio::select! {
            _ = self.hangup.recv() => Event::Rotate,
            _ = self.terminate.recv() => Event::Stop,
            _ = tokio::signal::ctrl_c() => Event::Stop,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> Event {
        let _ = tokio::signal::ctrl_c().await;
        Event::Stop
    }
}

pub async fn execute(args: PipeArgs) -> Result<()> {
    let config = super::load_config(&args.writer)?;
    info!(
        path = %config.path.display(),
        max_size = config.resolved_max_size(),
        cron = config.rotate_cron.as_deref().unwrap_or("off"),
        "piping stdin"
    );
    let writer = RotatingWriter::new(config)?;

    let result = pump(&writer, args.timestamp).await;
    writer.close()?;
    let lines = result?;

    debug!(lines, "pipe closed");
    Ok(())
}

async fn pump(writer: &RotatingWriter, timestamp: bool) -> Result<u64> {
    let mut signals = Signals::new()?;
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut buf = Vec::new();
    let mut lines = 0u64;

    loop {
        tokio::select! {
            // read_until keeps partial input in `buf` if the other branch wins
            read = stdin.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    if !buf.is_empty() {
                        write_line(writer, &buf, timestamp)?;
                        lines += 1;
                    }
                    break;
                }
                if buf.ends_with(b"\n") {
                    write_line(writer, &buf, timestamp)?;
                    lines += 1;
                    buf.clear();
                }
            }
            event = signals.next() => match event {
                Event::Rotate => {
                    info!("SIGHUP received, rotating");
                    if let Err(e) = writer.rotate_now() {
                        warn!(error = %e, "rotation failed");
                    }
                }
                Event::Stop => {
                    info!("stop signal received");
                    break;
                }
            }
        }
    }

    Ok(lines)
}

/// One write per line so a line never straddles a rotation
fn write_line(writer: &RotatingWriter, line: &[u8], timestamp: bool) -> Result<()> {
    let record = format_line(line, timestamp);
    match writer.write(&record) {
        Ok(_) => Ok(()),
        Err(e @ Error::OversizedWrite { .. }) => {
            warn!(error = %e, "dropping line");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn format_line(line: &[u8], timestamp: bool) -> Vec<u8> {
    if !timestamp {
        return line.to_vec();
    }
    let prefix = format!("[{}] ", Local::now().format(PRINT_TIME_FORMAT));
    let mut record = Vec::with_capacity(prefix.len() + line.len());
    record.extend_from_slice(prefix.as_bytes());
    record.extend_from_slice(line);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_plain() {
        assert_eq!(format_line(b"hello\n", false), b"hello\n");
    }

    #[test]
    fn test_format_line_timestamp() {
        let record = String::from_utf8(format_line(b"hello\n", true)).unwrap();
        assert!(record.starts_with('['));
        assert!(record.ends_with("] hello\n"));
        // [YYYY-MM-DD HH:MM:SS.mmm]
        assert_eq!(record.find(']'), Some(24));
    }
}
