//! Rotate command - one-shot rotation followed by retention

use anyhow::{bail, Result};
use logmill_writer::{RetentionReport, RotatingWriter};

use crate::cli::WriterArgs;
use crate::output::{is_json_mode, print_info, print_report, print_success};

pub fn execute(args: &WriterArgs) -> Result<()> {
    let config = super::load_config(args)?.without_schedule();
    if !config.path.exists() {
        print_info(&format!("{} does not exist, nothing to rotate", config.path.display()));
        return Ok(());
    }

    let writer = RotatingWriter::new(config)?;
    let reports = writer.subscribe_retention();
    writer.rotate_now()?;
    // waits for the retention pass the rotation requested
    writer.close()?;

    let report = merge(reports.try_iter());
    if !is_json_mode() {
        print_success(&format!("Rotated {}", writer.path().display()));
    }
    print_report(&report);

    if let Some(e) = report.first_error() {
        bail!("retention failed: {}", e);
    }
    Ok(())
}

/// Fold the reports of consecutive passes into one
fn merge(reports: impl Iterator<Item = RetentionReport>) -> RetentionReport {
    reports.fold(RetentionReport::default(), |mut acc, report| {
        acc.removed.extend(report.removed);
        acc.compressed.extend(report.compressed);
        acc.retained = report.retained;
        if acc.error.is_none() {
            acc.error = report.error;
        }
        acc
    })
}
