mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub snapshot_dir: Option<PathBuf>,
    pub audio_analysis_limit: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub snapshot_dir: PathBuf,
    pub audio_analysis_limit: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db or in the config file")
            })?;
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let snapshot_dir = file
            .snapshot_dir
            .map(PathBuf::from)
            .or_else(|| cli.snapshot_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("snapshot_dir must be specified via SNAPSHOT_DIR or in the config file")
            })?;
        if !snapshot_dir.exists() {
            bail!("Snapshot directory does not exist: {:?}", snapshot_dir);
        }
        if !snapshot_dir.is_dir() {
            bail!("snapshot_dir is not a directory: {:?}", snapshot_dir);
        }

        let audio_analysis_limit = file
            .audio_analysis_limit
            .unwrap_or(cli.audio_analysis_limit);

        Ok(AppConfig {
            db_path,
            snapshot_dir,
            audio_analysis_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_db_path() {
        let cli = CliConfig::default();
        let err = AppConfig::resolve(&cli, None).unwrap_err().to_string();
        assert!(err.contains("db_path"));
    }

    #[test]
    fn test_resolve_rejects_missing_snapshot_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            db_path: Some(dir.path().join("vault.db")),
            snapshot_dir: Some(dir.path().join("does-not-exist")),
            audio_analysis_limit: 100,
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err().to_string();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_toml_overrides_cli() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            db_path: Some(dir.path().join("cli.db")),
            snapshot_dir: Some(dir.path().to_path_buf()),
            audio_analysis_limit: 100,
        };
        let file = FileConfig {
            db_path: Some(other.path().join("file.db").to_string_lossy().into_owned()),
            snapshot_dir: None,
            audio_analysis_limit: Some(25),
        };
        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.db_path, other.path().join("file.db"));
        assert_eq!(config.snapshot_dir, dir.path());
        assert_eq!(config.audio_analysis_limit, 25);
    }
}
