use chrono::{DateTime, Duration, TimeZone, Utc};
use flate2::read::GzDecoder;
use logmill_writer::{ManualClock, RotatingWriter, WriterConfig};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

fn config(dir: &TempDir) -> WriterConfig {
    WriterConfig::new(dir.path().join("app.log"))
        .with_local_time(false)
        .without_schedule()
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

#[test]
fn active_file_never_exceeds_max_size() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let writer = RotatingWriter::with_clock(config(&dir).with_max_size(1000), clock.clone()).unwrap();

    let chunk = [b'x'; 150];
    for _ in 0..20 {
        writer.write(&chunk).unwrap();
        assert!(writer.current_size() <= 1000);
        clock.advance(Duration::seconds(1));
    }
    writer.close().unwrap();

    let files = files_in(dir.path());
    let total: u64 = files.iter().map(|f| fs::metadata(f).unwrap().len()).sum();
    assert_eq!(total, 20 * 150);
    for file in &files {
        assert!(fs::metadata(file).unwrap().len() <= 1000);
    }
    // six chunks fit per file
    assert_eq!(files.len(), 4);
}

#[test]
fn seventh_write_of_150_bytes_rotates_at_1000() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let writer = RotatingWriter::with_clock(config(&dir).with_max_size(1000), clock).unwrap();

    for i in 0..10u8 {
        writer.write(&[b'0' + i; 150]).unwrap();
    }
    writer.close().unwrap();

    let backup = fs::read(dir.path().join("app-2024-05-01T00-00-00.000.log")).unwrap();
    assert_eq!(backup.len(), 900);
    assert_eq!(backup[..150], [b'0'; 150]);
    assert_eq!(backup[750..], [b'5'; 150]);

    let active = fs::read(dir.path().join("app.log")).unwrap();
    assert_eq!(active.len(), 600);
    assert_eq!(active[..150], [b'6'; 150]);
    assert_eq!(files_in(dir.path()).len(), 2);
}

#[test]
fn oversized_write_leaves_file_unchanged() {
    let dir = TempDir::new().unwrap();
    let writer = RotatingWriter::new(config(&dir).with_max_size(100)).unwrap();
    writer.write(b"kept\n").unwrap();

    let err = writer.write(&[b'x'; 101]).unwrap_err();
    assert!(matches!(err, logmill_writer::Error::OversizedWrite { .. }));
    assert_eq!(fs::read(dir.path().join("app.log")).unwrap(), b"kept\n");
}

#[test]
fn each_rotation_leaves_one_backup_and_an_empty_active_file() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let writer = RotatingWriter::with_clock(config(&dir), clock.clone()).unwrap();

    writer.write(b"before rotation\n").unwrap();
    clock.advance(Duration::minutes(1));
    writer.rotate_now().unwrap();

    let backup = dir.path().join("app-2024-05-01T00-01-00.000.log");
    assert_eq!(fs::read_to_string(backup).unwrap(), "before rotation\n");
    assert_eq!(fs::metadata(dir.path().join("app.log")).unwrap().len(), 0);
    assert_eq!(files_in(dir.path()).len(), 2);
}

#[test]
fn max_backups_keeps_newest() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let writer =
        RotatingWriter::with_clock(config(&dir).with_max_backups(3), clock.clone()).unwrap();

    for i in 0..5 {
        writer.write(format!("generation {}\n", i).as_bytes()).unwrap();
        clock.advance(Duration::hours(1));
        writer.rotate_now().unwrap();
    }
    writer.close().unwrap();
    let report = writer.run_retention();
    assert!(report.is_ok());

    let backups = writer.backups().unwrap();
    let names: Vec<&str> = backups.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "app-2024-05-01T05-00-00.000.log",
            "app-2024-05-01T04-00-00.000.log",
            "app-2024-05-01T03-00-00.000.log",
        ]
    );
    assert_eq!(
        fs::read_to_string(&backups[0].path).unwrap(),
        "generation 4\n"
    );
}

#[test]
fn max_age_removes_old_backups_with_unlimited_count() {
    let dir = TempDir::new().unwrap();
    let now = start() + Duration::days(2);
    let clock = Arc::new(ManualClock::new(now));

    let stale = dir.path().join("app-2024-05-01T00-00-00.000.log");
    let recent = dir.path().join("app-2024-05-02T12-00-00.000.log");
    fs::write(&stale, b"old").unwrap();
    fs::write(&recent, b"new").unwrap();

    let writer = RotatingWriter::with_clock(
        config(&dir)
            .with_max_backups(0)
            .with_max_age(std::time::Duration::from_secs(24 * 3600)),
        clock,
    )
    .unwrap();
    writer.write(b"first write triggers retention\n").unwrap();
    writer.close().unwrap();

    assert!(!stale.exists());
    assert!(recent.exists());
}

#[test]
fn compressed_backup_round_trips() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let writer = RotatingWriter::with_clock(config(&dir).with_compress(true), clock).unwrap();

    let content: String = (0..500).map(|i| format!("line {}\n", i)).collect();
    writer.write(content.as_bytes()).unwrap();
    writer.rotate_now().unwrap();
    writer.close().unwrap();

    let plain = dir.path().join("app-2024-05-01T00-00-00.000.log");
    let gz = dir.path().join("app-2024-05-01T00-00-00.000.log.gz");
    assert!(!plain.exists());

    let mut decoded = String::new();
    GzDecoder::new(File::open(&gz).unwrap())
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, content);

    let backups = writer.backups().unwrap();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].compressed);
}

#[test]
fn concurrent_writes_are_never_interleaved() {
    let dir = TempDir::new().unwrap();
    let writer = RotatingWriter::new(config(&dir).with_max_size(4000)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let writer = writer.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let line = format!("thread-{:02} record-{:04} {}\n", t, i, "x".repeat(20));
                    writer.write(line.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    writer.close().unwrap();

    let mut lines = 0;
    for file in files_in(dir.path()) {
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.len() <= 4000);
        for line in content.lines() {
            assert!(line.starts_with("thread-"), "torn line: {:?}", line);
            assert!(line.ends_with(&"x".repeat(20)), "torn line: {:?}", line);
            lines += 1;
        }
    }
    assert_eq!(lines, 8 * 200);
}

#[test]
fn retention_reports_are_published() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let writer =
        RotatingWriter::with_clock(config(&dir).with_max_backups(1), clock.clone()).unwrap();
    let reports = writer.subscribe_retention();

    for _ in 0..3 {
        writer.write(b"data\n").unwrap();
        clock.advance(Duration::seconds(1));
        writer.rotate_now().unwrap();
    }
    writer.close().unwrap();

    let removed: usize = reports.try_iter().map(|r| r.removed.len()).sum();
    assert_eq!(removed, 2);
    assert_eq!(writer.backups().unwrap().len(), 1);
}

#[test]
fn cron_schedule_rotates() {
    let dir = TempDir::new().unwrap();
    let writer = RotatingWriter::new(
        WriterConfig::new(dir.path().join("app.log")).with_rotate_cron("* * * * * *"),
    )
    .unwrap();
    writer.write(b"scheduled\n").unwrap();

    thread::sleep(std::time::Duration::from_millis(2200));
    writer.close().unwrap();

    let backups = writer.backups().unwrap();
    assert!(!backups.is_empty(), "no scheduled rotation happened");
    let oldest = backups.last().unwrap();
    assert_eq!(fs::read_to_string(&oldest.path).unwrap(), "scheduled\n");
}
