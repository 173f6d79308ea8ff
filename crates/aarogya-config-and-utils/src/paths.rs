//! File system paths.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Resolves the on-disk locations used by the application.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for all runtime files (~/.aarogya)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.aarogya`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".aarogya"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.aarogya).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.aarogya/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the local store path (~/.aarogya/aarogya.sqlite).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("aarogya.sqlite")
    }

    /// Get the logs directory (~/.aarogya/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.aarogya/logs/aarogya.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("aarogya.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_layout() {
        let base = PathBuf::from("/tmp/aarogya-test");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), &base);
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.database_file(), base.join("aarogya.sqlite"));
        assert_eq!(paths.log_file(), base.join("logs").join("aarogya.jsonl"));
    }

    #[test]
    fn test_ensure_dirs_creates_tree() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("nested").join(".aarogya"));

        paths.ensure_dirs().unwrap();
        assert!(paths.base_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
