//! Command implementations

pub mod list;
pub mod next;
pub mod pipe;
pub mod prune;
pub mod rotate;

use anyhow::{Context, Result};
use logmill_core::{ConfigFile, WriterConfig, WriterSection};
use std::path::{Path, PathBuf};

use crate::cli::WriterArgs;

impl WriterArgs {
    /// Flags as a config section. `cwd` anchors a relative path flag.
    fn to_section(&self, cwd: &Path) -> WriterSection {
        WriterSection {
            path: self
                .path
                .as_ref()
                .map(|p| cwd.join(p).to_string_lossy().into_owned()),
            max_size_bytes: self.max_size,
            max_backups: self.max_backups,
            max_age_secs: self.max_age,
            compress: self.compress.then_some(true),
            local_time: self.utc.then_some(false),
            rotate_cron: self.cron.clone(),
            backup_time_format: self.time_format.clone(),
            backup_name_template: self.name_template.clone(),
        }
    }
}

/// Build the writer config from the config file (if any) and the flags
pub fn load_config(args: &WriterArgs) -> Result<WriterConfig> {
    let cwd = std::env::current_dir().context("can't determine working directory")?;
    load_config_in(args, &cwd)
}

fn load_config_in(args: &WriterArgs, cwd: &Path) -> Result<WriterConfig> {
    let (file, base_dir) = match (&args.config, &args.path) {
        (Some(path), _) => {
            let path = cwd.join(path);
            let file = ConfigFile::load(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            (file.writer, parent_dir(&path, cwd))
        }
        (None, None) => {
            let (file, path) = ConfigFile::find_and_load(cwd)
                .context("no log file given and no config file found")?;
            tracing::debug!(config = %path.display(), "using config file");
            (file.writer, parent_dir(&path, cwd))
        }
        (None, Some(_)) => (WriterSection::default(), cwd.to_path_buf()),
    };

    let config = file
        .merge(args.to_section(cwd))
        .into_writer_config(&base_dir)?;
    Ok(config)
}

fn parent_dir(path: &Path, fallback: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => fallback.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_flags_only() {
        let dir = TempDir::new().unwrap();
        let args = WriterArgs {
            path: Some(PathBuf::from("logs/app.log")),
            max_size: Some(4096),
            compress: true,
            utc: true,
            cron: Some(String::new()),
            ..Default::default()
        };

        let config = load_config_in(&args, dir.path()).unwrap();
        assert_eq!(config.path, dir.path().join("logs/app.log"));
        assert_eq!(config.max_size, 4096);
        assert!(config.compress);
        assert!(!config.local_time);
        assert_eq!(config.rotate_cron, None);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let conf_dir = dir.path().join("conf");
        fs::create_dir(&conf_dir).unwrap();
        fs::write(
            conf_dir.join("logmill.toml"),
            r#"
[writer]
path = "app.log"
max_backups = 7
max_age_secs = 3600
"#,
        )
        .unwrap();

        let args = WriterArgs {
            config: Some(PathBuf::from("conf/logmill.toml")),
            max_backups: Some(2),
            ..Default::default()
        };
        let config = load_config_in(&args, dir.path()).unwrap();

        // relative to the config file, not the working directory
        assert_eq!(config.path, conf_dir.join("app.log"));
        assert_eq!(config.max_backups, 2);
        assert_eq!(config.max_age, Duration::from_secs(3600));
    }

    #[test]
    fn test_discovers_config_in_working_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("logmill.yaml"),
            "writer:\n  path: found.log\n  compress: true\n",
        )
        .unwrap();

        let config = load_config_in(&WriterArgs::default(), dir.path()).unwrap();
        assert_eq!(config.path, dir.path().join("found.log"));
        assert!(config.compress);
    }

    #[test]
    fn test_missing_path_and_config() {
        let dir = TempDir::new().unwrap();
        assert!(load_config_in(&WriterArgs::default(), dir.path()).is_err());
    }
}
