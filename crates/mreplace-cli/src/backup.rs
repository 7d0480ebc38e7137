//! Copies of documents taken just before they are overwritten
//!
//! All copies made by one run share a timestamped session directory, which is
//! created lazily so a run that never overwrites anything leaves no trace.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct BackupManager {
    /// Root of all sessions; `None` when backups are off
    root: Option<PathBuf>,
    session: Option<PathBuf>,
}

impl BackupManager {
    pub fn new(root: PathBuf, enabled: bool) -> Self {
        Self {
            root: enabled.then_some(root),
            session: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    /// Copy `path` into the session directory, mirroring its relative path.
    ///
    /// Returns `None` when backups are off or there is nothing to save yet.
    pub fn save(&mut self, path: &Path) -> Result<Option<PathBuf>> {
        let Some(root) = &self.root else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }

        let session = match self.session.clone() {
            Some(dir) => dir,
            None => {
                let dir = start_session(root)?;
                self.session = Some(dir.clone());
                dir
            }
        };

        let mirrored: PathBuf = path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        let target = session.join(mirrored);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create backup directory: {}", parent.display()))?;
        }
        fs::copy(path, &target).with_context(|| {
            format!("Failed to back up {} to {}", path.display(), target.display())
        })?;

        tracing::debug!(from = %path.display(), to = %target.display(), "saved original");
        Ok(Some(target))
    }

    #[cfg(test)]
    pub fn session_path(&self) -> Option<&Path> {
        self.session.as_deref()
    }
}

fn start_session(root: &Path) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S").to_string();
    let dir = root.join(stamp);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create backup directory: {}", dir.display()))?;
    tracing::debug!(dir = %dir.display(), "backup session started");
    Ok(dir)
}

/// Check that a written file holds exactly the expected text
pub fn verify_written(path: &Path, expected: &str) -> Result<bool> {
    let written = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file for verification: {}", path.display()))?;
    Ok(written == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_saves_nothing() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("notes.txt");
        fs::write(&doc, "cat").unwrap();

        let mut manager = BackupManager::new(temp.path().join("backups"), false);

        assert!(!manager.is_enabled());
        assert!(manager.save(&doc).unwrap().is_none());
        assert!(manager.session_path().is_none());
        assert!(!temp.path().join("backups").exists());
    }

    #[test]
    fn test_session_created_on_first_save() {
        let temp = TempDir::new().unwrap();
        let mut manager = BackupManager::new(temp.path().join("backups"), true);
        assert!(manager.session_path().is_none());

        let doc = temp.path().join("notes.txt");
        fs::write(&doc, "caterpillar and cat").unwrap();
        let saved = manager.save(&doc).unwrap().unwrap();

        assert!(saved.starts_with(manager.session_path().unwrap()));
        assert_eq!(fs::read_to_string(&saved).unwrap(), "caterpillar and cat");
    }

    #[test]
    fn test_missing_file_is_not_saved() {
        let temp = TempDir::new().unwrap();
        let mut manager = BackupManager::new(temp.path().join("backups"), true);

        assert!(manager.save(&temp.path().join("new.txt")).unwrap().is_none());
        assert!(manager.session_path().is_none());
    }

    #[test]
    fn test_saves_share_one_session() {
        let temp = TempDir::new().unwrap();
        let mut manager = BackupManager::new(temp.path().join("backups"), true);
        let first = temp.path().join("a.txt");
        let second = temp.path().join("b.txt");
        fs::write(&first, "a").unwrap();
        fs::write(&second, "b").unwrap();

        let a = manager.save(&first).unwrap().unwrap();
        let b = manager.save(&second).unwrap().unwrap();

        assert_eq!(a.parent(), b.parent());
    }

    #[test]
    fn test_verify_written() {
        let temp = TempDir::new().unwrap();
        let test_file = temp.path().join("out.txt");
        fs::write(&test_file, "butterfly and dog").unwrap();

        assert!(verify_written(&test_file, "butterfly and dog").unwrap());
        assert!(!verify_written(&test_file, "caterpillar and cat").unwrap());
    }
}
