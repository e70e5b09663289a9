//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logmill")]
#[command(version, about = "Rotating, retention-managed log files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy stdin into a rotating log file (SIGHUP rotates, SIGINT/SIGTERM close)
    Pipe(PipeArgs),

    /// Rotate a log file now and apply retention
    Rotate(WriterArgs),

    /// Apply retention to the backups of a log file
    Prune(WriterArgs),

    /// List the backups of a log file, newest first
    List(WriterArgs),

    /// Show the next trigger times of a six field cron expression
    Next(NextArgs),
}

/// Writer options. Flags override values from the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct WriterArgs {
    /// Active log file
    pub path: Option<PathBuf>,

    /// Config file (.toml, .yaml, .yml or .json) with a [writer] table.
    /// Without it and without a path, ./logmill.{toml,yaml,yml,json} is used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rotate once the file would exceed this many bytes (default 100 MiB)
    #[arg(long)]
    pub max_size: Option<u64>,

    /// Backups to keep, 0 keeps all
    #[arg(long)]
    pub max_backups: Option<usize>,

    /// Remove backups older than this many seconds, 0 keeps all
    #[arg(long)]
    pub max_age: Option<u64>,

    /// Gzip rotated files
    #[arg(long)]
    pub compress: bool,

    /// Use UTC instead of local time for backup names and the schedule
    #[arg(long)]
    pub utc: bool,

    /// Rotation schedule: sec min hour day-of-month month day-of-week.
    /// An empty string disables scheduled rotation.
    #[arg(long)]
    pub cron: Option<String>,

    /// chrono format for backup names instead of <stem>-<timestamp>.<ext>
    #[arg(long)]
    pub time_format: Option<String>,

    /// Backup name template containing {time}, used with --time-format
    #[arg(long)]
    pub name_template: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PipeArgs {
    #[command(flatten)]
    pub writer: WriterArgs,

    /// Prefix every line with the time it was read
    #[arg(long)]
    pub timestamp: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NextArgs {
    /// Cron expression, e.g. "0 0 0 * * *"
    pub expression: String,

    /// Number of trigger times to show
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Evaluate in UTC instead of local time
    #[arg(long)]
    pub utc: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pipe_flags() {
        let cli = Cli::parse_from([
            "logmill",
            "pipe",
            "app.log",
            "--max-size",
            "1024",
            "--max-backups",
            "3",
            "--compress",
            "--timestamp",
            "--cron",
            "",
        ]);
        match cli.command {
            Commands::Pipe(args) => {
                assert_eq!(args.writer.path, Some(PathBuf::from("app.log")));
                assert_eq!(args.writer.max_size, Some(1024));
                assert_eq!(args.writer.max_backups, Some(3));
                assert!(args.writer.compress);
                assert!(args.timestamp);
                assert_eq!(args.writer.cron.as_deref(), Some(""));
            }
            _ => panic!("expected pipe"),
        }
    }

    #[test]
    fn test_parse_next() {
        let cli = Cli::parse_from(["logmill", "--json", "next", "0 0 0 * * *", "-n", "3"]);
        assert!(cli.json);
        match cli.command {
            Commands::Next(args) => {
                assert_eq!(args.expression, "0 0 0 * * *");
                assert_eq!(args.count, 3);
                assert!(!args.utc);
            }
            _ => panic!("expected next"),
        }
    }
}
