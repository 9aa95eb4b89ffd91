//! Permission state tracking for a single runtime capability (the camera).
//!
//! The tracker is a plain mutable status plus explicit hooks. The host drives
//! it: attach the active screen, call [`PermissionTracker::on_resume`] when the
//! app returns to the foreground, and call
//! [`PermissionTracker::request_permission`] from a worker thread (it blocks
//! until the user answers the system dialog).
//!
//! ```text
//!   DENIED ─┐ grant                    ┌──────────────► GRANTED
//!           ├──────────────────────────┤ deny + rationale
//! SHOW_RATIONALE ◄─────────────────────┤
//!           │ deny, no rationale       └──► PERMANENTLY_DENIED
//!           ▼                                   │ settings + on_resume
//!   PERMANENTLY_DENIED ───────────────────────► any status
//! ```

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{PinguError, Result};
use crate::types::{PermissionAction, PermissionStatus};

/// Capability id the Android host uses for the camera.
pub const CAMERA_CAPABILITY: &str = "android.permission.CAMERA";

/// The host screen currently observing the tracker.
///
/// Implementations wrap the platform permission APIs. `prompt` shows the system
/// dialog and blocks until the user answers, returning `Ok(true)` on consent.
pub trait PermissionScreen: Send + Sync {
    fn is_granted(&self, capability: &str) -> bool;

    fn should_show_rationale(&self, capability: &str) -> bool;

    fn prompt(&self, capability: &str) -> std::result::Result<bool, String>;

    /// Opens the per-app settings page. Fire-and-forget.
    fn open_app_settings(&self);
}

/// How a refused prompt maps onto a status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialPolicy {
    /// Rationale flag set after refusal → SHOW_RATIONALE, else PERMANENTLY_DENIED.
    #[default]
    FollowRationaleFlag,
    /// A refusal from DENIED (never asked) is always SHOW_RATIONALE; later
    /// refusals follow the flag.
    RationaleOnFirstDenial,
}

impl DenialPolicy {
    /// `prior` is the status the prompt was issued from. It comes from the
    /// platform, so the answer is the same for a fresh tracker.
    fn status_after_refusal(&self, prior: PermissionStatus, rationale: bool) -> PermissionStatus {
        let rationale = match self {
            DenialPolicy::FollowRationaleFlag => rationale,
            DenialPolicy::RationaleOnFirstDenial => {
                rationale || prior == PermissionStatus::Denied
            }
        };
        if rationale {
            PermissionStatus::ShowRationale
        } else {
            PermissionStatus::PermanentlyDenied
        }
    }
}

pub type StatusListener = Box<dyn Fn(PermissionStatus) + Send + Sync>;

struct TrackerState {
    status: PermissionStatus,
    screen: Option<Arc<dyn PermissionScreen>>,
    // Bumped on every attach/detach so in-flight prompts can tell their
    // screen went away.
    generation: u64,
    prompt_pending: bool,
}

/// Tracks and mediates one capability for whichever screen is attached.
pub struct PermissionTracker {
    capability: String,
    policy: DenialPolicy,
    state: Mutex<TrackerState>,
    listener: Option<StatusListener>,
}

impl PermissionTracker {
    pub fn new(capability: impl Into<String>, policy: DenialPolicy) -> Self {
        Self {
            capability: capability.into(),
            policy,
            state: Mutex::new(TrackerState {
                status: PermissionStatus::Denied,
                screen: None,
                generation: 0,
                prompt_pending: false,
            }),
            listener: None,
        }
    }

    pub fn camera(policy: DenialPolicy) -> Self {
        Self::new(CAMERA_CAPABILITY, policy)
    }

    /// Invokes `listener` with the new status every time it changes.
    pub fn with_listener(
        mut self,
        listener: impl Fn(PermissionStatus) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn status(&self) -> PermissionStatus {
        self.lock().status
    }

    pub fn recommended_action(&self) -> PermissionAction {
        self.status().recommended_action()
    }

    pub fn is_prompt_pending(&self) -> bool {
        self.lock().prompt_pending
    }

    /// Hands ownership to `screen` and derives the status it observes.
    pub fn attach(&self, screen: Arc<dyn PermissionScreen>) -> PermissionStatus {
        let status = cold_status(Some(screen.as_ref()), &self.capability);
        let changed = {
            let mut state = self.lock();
            state.screen = Some(screen);
            state.generation += 1;
            replace_status(&mut state, status)
        };
        tracing::debug!(capability = %self.capability, status = %status, "Screen attached");
        self.notify(changed);
        status
    }

    /// Drops the current screen. A prompt still in flight will be discarded.
    pub fn detach(&self) {
        let mut state = self.lock();
        state.screen = None;
        state.generation += 1;
        tracing::debug!(
            capability = %self.capability,
            prompt_pending = state.prompt_pending,
            "Screen detached"
        );
    }

    /// Cold check against the platform. Never prompts, never blocks.
    pub fn query_status(&self) -> PermissionStatus {
        let screen = self.lock().screen.clone();
        cold_status(screen.as_deref(), &self.capability)
    }

    /// Shows the system dialog unless already granted.
    ///
    /// Blocks until the user answers. Only one prompt is ever outstanding; a
    /// call made while one is pending returns the current status untouched.
    pub fn request_permission(&self) -> Result<PermissionStatus> {
        let (screen, generation, prior) = {
            let mut state = self.lock();
            if state.status.is_granted() {
                return Ok(PermissionStatus::Granted);
            }
            let screen = state
                .screen
                .clone()
                .ok_or_else(|| PinguError::ContextUnavailable {
                    capability: self.capability.clone(),
                })?;
            if state.prompt_pending {
                tracing::debug!(capability = %self.capability, "Prompt already pending");
                return Ok(state.status);
            }
            state.prompt_pending = true;
            (screen, state.generation, state.status)
        };

        tracing::info!(capability = %self.capability, "Requesting permission");
        let answer = screen.prompt(&self.capability);
        let rationale =
            matches!(answer, Ok(false)) && screen.should_show_rationale(&self.capability);

        let (result, changed) = {
            let mut state = self.lock();
            state.prompt_pending = false;

            if state.generation != generation {
                tracing::debug!(
                    capability = %self.capability,
                    "Screen changed during prompt; discarding answer"
                );
                return Ok(state.status);
            }

            let next = match answer {
                Ok(true) => PermissionStatus::Granted,
                Ok(false) => self.policy.status_after_refusal(prior, rationale),
                Err(message) => {
                    tracing::warn!(capability = %self.capability, error = %message, "Permission prompt failed");
                    return Err(PinguError::Platform { message });
                }
            };
            let changed = replace_status(&mut state, next);
            (next, changed)
        };

        tracing::info!(capability = %self.capability, status = %result, "Permission request resolved");
        self.notify(changed);
        Ok(result)
    }

    /// Prompts only when the capability has never been decided (`DENIED`).
    pub fn request_if_undetermined(&self) -> Result<PermissionStatus> {
        match self.status() {
            PermissionStatus::Denied => self.request_permission(),
            status => Ok(status),
        }
    }

    /// Re-derives the status after the app returns to the foreground.
    pub fn on_resume(&self) -> PermissionStatus {
        let status = self.query_status();
        let changed = replace_status(&mut self.lock(), status);
        if changed.is_some() {
            tracing::info!(capability = %self.capability, status = %status, "Permission changed while backgrounded");
        }
        self.notify(changed);
        status
    }

    pub fn open_platform_settings(&self) {
        let screen = self.lock().screen.clone();
        match screen {
            Some(screen) => screen.open_app_settings(),
            None => {
                tracing::warn!(capability = %self.capability, "No screen attached; cannot open settings")
            }
        }
    }

    fn notify(&self, changed: Option<PermissionStatus>) {
        if let (Some(status), Some(listener)) = (changed, self.listener.as_ref()) {
            listener(status);
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cold_status(screen: Option<&dyn PermissionScreen>, capability: &str) -> PermissionStatus {
    let Some(screen) = screen else {
        return PermissionStatus::Denied;
    };
    if screen.is_granted(capability) {
        PermissionStatus::Granted
    } else if screen.should_show_rationale(capability) {
        PermissionStatus::ShowRationale
    } else {
        PermissionStatus::Denied
    }
}

fn replace_status(state: &mut TrackerState, next: PermissionStatus) -> Option<PermissionStatus> {
    if state.status == next {
        None
    } else {
        state.status = next;
        Some(next)
    }
}
