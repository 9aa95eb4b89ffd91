//! Configuration loading and saving.
//!
//! Missing files yield defaults; a malformed file is logged and also yields
//! defaults so a bad edit never locks the user out of the game.

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierConfig;
use crate::error::{PinguError, Result};
use crate::permission::{DenialPolicy, CAMERA_CAPABILITY};
use crate::storage::StorageConfig;

/// User-tunable settings stored at `<root>/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinguConfig {
    /// Platform capability id gating the camera.
    pub camera_capability: String,
    pub denial_policy: DenialPolicy,
    pub classifier: ClassifierConfig,
    /// Rows shown by default when listing history.
    pub history_limit: usize,
}

impl Default for PinguConfig {
    fn default() -> Self {
        Self {
            camera_capability: CAMERA_CAPABILITY.to_string(),
            denial_policy: DenialPolicy::default(),
            classifier: ClassifierConfig::default(),
            history_limit: 20,
        }
    }
}

/// Loads the configuration, returning defaults if the file is missing or unreadable.
pub fn load_config(storage: &StorageConfig) -> PinguConfig {
    match try_load_config(storage) {
        Ok(Some(config)) => config,
        Ok(None) => PinguConfig::default(),
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring unreadable config; using defaults");
            PinguConfig::default()
        }
    }
}

/// Strict variant of [`load_config`]: `Ok(None)` when no file exists.
pub fn try_load_config(storage: &StorageConfig) -> Result<Option<PinguConfig>> {
    let path = storage.config_file();
    if !path.exists() {
        return Ok(None);
    }
    let content = fs_err::read_to_string(&path).map_err(|source| PinguError::Io {
        context: "Failed to read config".to_string(),
        source,
    })?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| PinguError::Config {
            path,
            details: err.to_string(),
        })
}

/// Saves the configuration as pretty JSON, creating the root if needed.
pub fn save_config(storage: &StorageConfig, config: &PinguConfig) -> Result<()> {
    storage.ensure_root()?;
    let content = serde_json::to_string_pretty(config).map_err(|source| PinguError::Json {
        context: "Failed to serialize config".to_string(),
        source,
    })?;
    fs_err::write(storage.config_file(), content).map_err(|source| PinguError::Io {
        context: "Failed to write config".to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (tempfile::TempDir, StorageConfig) {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let storage = StorageConfig::with_root(temp_dir.path().to_path_buf());
        (temp_dir, storage)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let (_dir, storage) = temp_storage();
        let config = load_config(&storage);
        assert_eq!(config, PinguConfig::default());
        assert_eq!(config.camera_capability, "android.permission.CAMERA");
        assert_eq!(config.classifier.input_width, 48);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, storage) = temp_storage();
        let config = PinguConfig {
            denial_policy: DenialPolicy::RationaleOnFirstDenial,
            history_limit: 5,
            ..PinguConfig::default()
        };
        save_config(&storage, &config).expect("save");
        assert_eq!(load_config(&storage), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let (_dir, storage) = temp_storage();
        fs_err::write(
            storage.config_file(),
            r#"{"denial_policy": "rationale_on_first_denial", "classifier": {"input_width": 64}}"#,
        )
        .unwrap();
        let config = load_config(&storage);
        assert_eq!(config.denial_policy, DenialPolicy::RationaleOnFirstDenial);
        assert_eq!(config.classifier.input_width, 64);
        assert_eq!(config.classifier.input_height, 48);
        assert_eq!(config.history_limit, 20);
    }

    #[test]
    fn malformed_file_is_reported_strictly_and_defaulted_leniently() {
        let (_dir, storage) = temp_storage();
        fs_err::write(storage.config_file(), "{ not json").unwrap();
        assert!(matches!(
            try_load_config(&storage),
            Err(PinguError::Config { .. })
        ));
        assert_eq!(load_config(&storage), PinguConfig::default());
    }
}
