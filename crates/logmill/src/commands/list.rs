//! List command - backups of a log file, newest first

use anyhow::Result;
use logmill_writer::{BackupNamer, Scanner};

use crate::cli::WriterArgs;
use crate::output::print_backups;

pub fn execute(args: &WriterArgs) -> Result<()> {
    let config = super::load_config(args)?;
    let backups = if config.dir().exists() {
        Scanner::new(BackupNamer::new(&config)).scan()?
    } else {
        Vec::new()
    };

    print_backups(&config.path, &backups, config.local_time);
    Ok(())
}
