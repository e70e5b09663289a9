//! Terminal and JSON output

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use logmill_core::PRINT_TIME_FORMAT;
use logmill_writer::{BackupFile, RetentionReport};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Global flag for JSON output mode
static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_json_mode(enabled: bool) {
    JSON_MODE.store(enabled, Ordering::SeqCst);
}

pub fn is_json_mode() -> bool {
    JSON_MODE.load(Ordering::SeqCst)
}

#[derive(Tabled)]
pub struct BackupRow {
    #[tabled(rename = "backup")]
    pub name: String,
    #[tabled(rename = "rotated at")]
    pub rotated_at: String,
    #[tabled(rename = "size")]
    pub size: String,
    #[tabled(rename = "gz")]
    pub compressed: String,
}

#[derive(Serialize)]
pub struct BackupJson {
    pub name: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    pub compressed: bool,
    pub size_bytes: u64,
}

impl From<&BackupFile> for BackupJson {
    fn from(backup: &BackupFile) -> Self {
        BackupJson {
            name: backup.name.clone(),
            path: backup.path.display().to_string(),
            timestamp: backup.timestamp,
            compressed: backup.compressed,
            size_bytes: backup.size,
        }
    }
}

impl BackupRow {
    fn new(backup: &BackupFile, local_time: bool) -> Self {
        BackupRow {
            name: backup.name.clone(),
            rotated_at: format_time(backup.timestamp, local_time),
            size: format_bytes(backup.size),
            compressed: if backup.compressed {
                "yes".cyan().to_string()
            } else {
                "no".to_string()
            },
        }
    }
}

pub fn print_backups(active: &Path, backups: &[BackupFile], local_time: bool) {
    if is_json_mode() {
        let json: Vec<BackupJson> = backups.iter().map(BackupJson::from).collect();
        print_json(&json);
        return;
    }

    if backups.is_empty() {
        print_info(&format!("No backups of {}", active.display()));
        return;
    }

    let rows: Vec<BackupRow> = backups
        .iter()
        .map(|b| BackupRow::new(b, local_time))
        .collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();

    println!("{}", table);
}

#[derive(Serialize, Default)]
pub struct ReportJson {
    pub removed: Vec<String>,
    pub compressed: Vec<String>,
    pub retained: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&RetentionReport> for ReportJson {
    fn from(report: &RetentionReport) -> Self {
        ReportJson {
            removed: report.removed.iter().map(|p| p.display().to_string()).collect(),
            compressed: report
                .compressed
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            retained: report.retained,
            error: report.first_error().map(|e| e.to_string()),
        }
    }
}

pub fn print_report(report: &RetentionReport) {
    if is_json_mode() {
        print_json(&ReportJson::from(report));
        return;
    }

    for path in &report.removed {
        println!("  {} {}", "removed".red(), path.display());
    }
    for path in &report.compressed {
        println!("  {} {}", "compressed".cyan(), path.display());
    }
    match report.first_error() {
        Some(e) => print_error(&e.to_string()),
        None => print_success(&format!(
            "{} removed, {} compressed, {} retained",
            report.removed.len(),
            report.compressed.len(),
            report.retained
        )),
    }
}

pub fn print_schedule(expression: &str, times: &[DateTime<Utc>], local_time: bool) {
    if is_json_mode() {
        print_json(&times);
        return;
    }

    if times.is_empty() {
        print_info(&format!("'{}' never fires", expression));
        return;
    }
    for time in times {
        println!("{}", format_time(*time, local_time));
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing to JSON: {}", e),
    }
}

pub fn format_time(time: DateTime<Utc>, local_time: bool) -> String {
    if local_time {
        time.with_timezone(&Local).format(PRINT_TIME_FORMAT).to_string()
    } else {
        time.format(PRINT_TIME_FORMAT).to_string()
    }
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1}G", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.0}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
