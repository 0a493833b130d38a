use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration file for the import tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub snapshot_dir: Option<String>,
    pub audio_analysis_limit: Option<usize>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;
        let config: FileConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", path.as_ref()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: FileConfig = toml::from_str(
            r#"
            db_path = "/data/vault.db"
            snapshot_dir = "/data/snapshots/latest"
            audio_analysis_limit = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path.as_deref(), Some("/data/vault.db"));
        assert_eq!(config.audio_analysis_limit, Some(50));
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_path.is_none());
        assert!(config.snapshot_dir.is_none());
        assert!(config.audio_analysis_limit.is_none());
    }
}
