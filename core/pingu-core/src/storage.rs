//! Storage configuration and path management for Pingu.
//!
//! Every on-disk location is derived from a single root so tests can point the
//! whole crate at a temp directory with [`StorageConfig::with_root`].
//!
//! Production code uses [`StorageConfig::resolve`], which honours
//! `PINGU_HOME` and otherwise falls back to `~/.pingu/`.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{PinguError, Result};

/// Environment variable overriding the storage root.
pub const PINGU_HOME_ENV: &str = "PINGU_HOME";

/// Central configuration for all Pingu storage paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the root from `PINGU_HOME`, then the home directory.
    pub fn resolve() -> Result<Self> {
        if let Some(root) = env::var_os(PINGU_HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }
        let home = dirs::home_dir().ok_or_else(|| PinguError::Io {
            context: "Home directory not found".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        Ok(Self::with_root(home.join(".pingu")))
    }

    /// Creates a StorageConfig with a custom root directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// SQLite database holding the match history.
    pub fn match_history_db(&self) -> PathBuf {
        self.root.join("match_history.db")
    }

    /// User configuration (JSON).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Simulated platform permission state used by the desktop host.
    pub fn permissions_file(&self) -> PathBuf {
        self.root.join("permissions.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Creates the root directory if it is missing.
    pub fn ensure_root(&self) -> Result<()> {
        fs_err::create_dir_all(&self.root).map_err(|source| PinguError::Io {
            context: "Failed to create storage root".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_root() {
        let storage = StorageConfig::with_root(PathBuf::from("/tmp/pingu-test"));
        assert_eq!(
            storage.match_history_db(),
            PathBuf::from("/tmp/pingu-test/match_history.db")
        );
        assert_eq!(
            storage.config_file(),
            PathBuf::from("/tmp/pingu-test/config.json")
        );
        assert_eq!(storage.logs_dir(), PathBuf::from("/tmp/pingu-test/logs"));
    }

    #[test]
    fn ensure_root_creates_directory() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let storage = StorageConfig::with_root(temp_dir.path().join("a").join("b"));
        storage.ensure_root().expect("create root");
        assert!(storage.root().is_dir());
    }
}
