//! Prune command - one synchronous retention pass

use anyhow::{bail, Result};
use logmill_writer::RotatingWriter;

use crate::cli::WriterArgs;
use crate::output::{print_info, print_report};

pub fn execute(args: &WriterArgs) -> Result<()> {
    let config = super::load_config(args)?.without_schedule();
    if !config.has_retention() {
        print_info("No retention configured (see --max-backups, --max-age, --compress)");
        return Ok(());
    }

    let writer = RotatingWriter::new(config)?;
    let report = writer.run_retention();
    print_report(&report);

    if let Some(e) = report.first_error() {
        bail!("retention failed: {}", e);
    }
    Ok(())
}
