//! Terminal stand-in for the phone's runtime-permission subsystem.
//!
//! Grant state lives in `<root>/permissions.json` so it survives between
//! invocations, the way the OS remembers it between app launches. The
//! simulated platform follows current Android behaviour:
//!
//! ```text
//! never asked      → prompt shown, rationale off
//! refused once     → prompt shown, rationale on
//! refused twice    → prompt suppressed (auto-refused), rationale off
//! granted/revoked  → changed only from app settings or another prompt
//! ```

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pingu_core::PermissionScreen;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Refusals after which the platform stops showing the dialog.
const SUPPRESS_AFTER_REFUSALS: u32 = 2;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Failed to read permission state {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write permission state {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission state {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-capability grant record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantRecord {
    pub granted: bool,
    pub refusals: u32,
}

impl GrantRecord {
    fn shows_rationale(&self) -> bool {
        !self.granted && self.refusals == 1
    }

    fn prompt_suppressed(&self) -> bool {
        !self.granted && self.refusals >= SUPPRESS_AFTER_REFUSALS
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct PlatformState {
    capabilities: BTreeMap<String, GrantRecord>,
}

/// What the user will do once the settings screen opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    Allow,
    Revoke,
}

/// How the system dialog gets answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Ask on the terminal.
    Interactive,
    /// Answer without asking (scripts and tests).
    Scripted(bool),
}

pub struct ConsoleScreen {
    path: PathBuf,
    state: Mutex<PlatformState>,
    prompt_mode: PromptMode,
    settings_change: Mutex<Option<(String, SettingsChange)>>,
}

impl ConsoleScreen {
    /// Loads the stored grant state; a missing file means nothing was ever asked.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ScreenError> {
        let path = path.into();
        let state = read_state(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(state),
            prompt_mode: PromptMode::Interactive,
            settings_change: Mutex::new(None),
        })
    }

    pub fn with_prompt_mode(mut self, mode: PromptMode) -> Self {
        self.prompt_mode = mode;
        self
    }

    /// Queues the change the user makes the next time settings are opened.
    pub fn with_settings_change(self, capability: &str, change: SettingsChange) -> Self {
        *self
            .settings_change
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((capability.to_string(), change));
        self
    }

    pub fn record(&self, capability: &str) -> GrantRecord {
        self.lock()
            .capabilities
            .get(capability)
            .copied()
            .unwrap_or_default()
    }

    /// Forgets everything about `capability`, like reinstalling the app.
    pub fn reset(&self, capability: &str) -> Result<(), ScreenError> {
        let mut state = self.lock();
        state.capabilities.remove(capability);
        write_state(&self.path, &state)
    }

    fn update(
        &self,
        capability: &str,
        apply: impl FnOnce(&mut GrantRecord),
    ) -> Result<GrantRecord, ScreenError> {
        let mut state = self.lock();
        let record = state
            .capabilities
            .entry(capability.to_string())
            .or_default();
        apply(record);
        let updated = *record;
        write_state(&self.path, &state)?;
        Ok(updated)
    }

    fn ask(&self, capability: &str) -> io::Result<bool> {
        match self.prompt_mode {
            PromptMode::Scripted(answer) => Ok(answer),
            PromptMode::Interactive => {
                let mut stdout = io::stdout().lock();
                write!(stdout, "Allow Pingu to use {}? [y/N] ", capability)?;
                stdout.flush()?;
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line)?;
                Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PermissionScreen for ConsoleScreen {
    fn is_granted(&self, capability: &str) -> bool {
        self.record(capability).granted
    }

    fn should_show_rationale(&self, capability: &str) -> bool {
        self.record(capability).shows_rationale()
    }

    fn prompt(&self, capability: &str) -> Result<bool, String> {
        if self.record(capability).prompt_suppressed() {
            tracing::info!(capability, "Platform suppressed the permission dialog");
            return Ok(false);
        }

        let granted = self
            .ask(capability)
            .map_err(|err| format!("Failed to read answer: {}", err))?;
        self.update(capability, |record| {
            if granted {
                record.granted = true;
                record.refusals = 0;
            } else {
                record.granted = false;
                record.refusals += 1;
            }
        })
        .map_err(|err| err.to_string())?;
        Ok(granted)
    }

    fn open_app_settings(&self) {
        println!("Opening Pingu's app settings...");
        let change = self
            .settings_change
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some((capability, change)) = change else {
            return;
        };

        let result = self.update(&capability, |record| {
            // Settings changes clear the "don't ask again" state.
            record.granted = change == SettingsChange::Allow;
            record.refusals = 0;
        });
        match result {
            Ok(record) => {
                tracing::info!(capability = %capability, granted = record.granted, "Settings changed")
            }
            Err(err) => tracing::warn!(error = %err, "Failed to apply settings change"),
        }
    }
}

fn read_state(path: &Path) -> Result<PlatformState, ScreenError> {
    if !path.exists() {
        return Ok(PlatformState::default());
    }
    let content = fs_err::read_to_string(path).map_err(|source| ScreenError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ScreenError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_state(path: &Path, state: &PlatformState) -> Result<(), ScreenError> {
    let write_err = |source: io::Error| ScreenError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(write_err)?;
    }
    let content = serde_json::to_string_pretty(state)
        .map_err(|err| write_err(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    fs_err::write(path, content).map_err(write_err)
}
