//! Configuration file support for mreplace
//!
//! Loads `.mreplace.toml` from current directory or parent directories.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::rules::RuleEntry;

pub const CONFIG_FILE_NAME: &str = ".mreplace.toml";
pub const DEFAULT_BACKUP_DIR: &str = ".mreplace-backup";

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Replacement rules, applied when none are given on the command line
    pub rules: Vec<RuleEntry>,
    pub output: OutputConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "text", "json" or "diff"
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Copy the original file aside before overwriting it
    pub enabled: bool,
    /// Where backup sessions are stored (default: `.mreplace-backup`)
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load config from `.mreplace.toml` searching from current directory upward
    pub fn load() -> Result<Option<(Config, PathBuf)>> {
        Self::load_from(std::env::current_dir()?)
    }

    /// Load config searching from the given directory upward
    pub fn load_from(start_dir: PathBuf) -> Result<Option<(Config, PathBuf)>> {
        let mut current = Some(start_dir.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                let config = Self::load_path(&config_path)?;
                return Ok(Some((config, config_path)));
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Load config from a specific path
    pub fn load_path(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Compute the effective rule pairs in supply order
    ///
    /// Rules given on the command line replace the config's rules entirely.
    pub fn effective_rules(&self, cli_rules: Option<Vec<RuleEntry>>) -> Vec<(String, String)> {
        match cli_rules {
            Some(entries) => entries.into_iter().map(RuleEntry::into_pair).collect(),
            None => self.rules.iter().cloned().map(RuleEntry::into_pair).collect(),
        }
    }

    /// Backup directory, falling back to the default name
    pub fn backup_dir(&self) -> PathBuf {
        self.backup
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_config(dir: &Path, content: &str) {
        fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_load_basic_config() {
        let temp = TempDir::new().unwrap();
        create_config(
            temp.path(),
            r#"
[[rules]]
from = "colour"
to = "color"

[[rules]]
from = "TODO"

[output]
format = "json"

[backup]
enabled = true
dir = "backups"
"#,
        );

        let (config, path) = Config::load_from(temp.path().to_path_buf())
            .unwrap()
            .unwrap();

        assert_eq!(path, temp.path().join(CONFIG_FILE_NAME));
        assert_eq!(
            config.effective_rules(None),
            vec![
                ("colour".to_string(), "color".to_string()),
                ("TODO".to_string(), String::new()),
            ]
        );
        assert_eq!(config.output.format, Some("json".to_string()));
        assert!(config.backup.enabled);
        assert_eq!(config.backup_dir(), PathBuf::from("backups"));
    }

    #[test]
    fn test_load_empty_config() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "");

        let (config, _) = Config::load_from(temp.path().to_path_buf())
            .unwrap()
            .unwrap();

        assert!(config.rules.is_empty());
        assert!(config.output.format.is_none());
        assert!(!config.backup.enabled);
        assert_eq!(config.backup_dir(), PathBuf::from(DEFAULT_BACKUP_DIR));
    }

    #[test]
    fn test_load_from_parent_directory() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "[output]\nformat = \"diff\"\n");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let (config, path) = Config::load_from(nested).unwrap().unwrap();

        assert_eq!(path, temp.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.output.format, Some("diff".to_string()));
    }

    #[test]
    fn test_no_config_found() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_from(temp.path().to_path_buf()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "[[rules]]\nfrom = 3\n");

        let result = Config::load_from(temp.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn test_effective_rules_cli_override() {
        let config = Config {
            rules: vec![RuleEntry::Pair("a".to_string(), "b".to_string())],
            ..Default::default()
        };

        let effective =
            config.effective_rules(Some(vec![RuleEntry::Pair("x".to_string(), "y".to_string())]));

        assert_eq!(effective, vec![("x".to_string(), "y".to_string())]);
    }

    #[test]
    fn test_effective_rules_empty_cli_still_overrides() {
        let config = Config {
            rules: vec![RuleEntry::Pair("a".to_string(), "b".to_string())],
            ..Default::default()
        };

        assert!(config.effective_rules(Some(Vec::new())).is_empty());
    }
}
