//! # pingu-core
//!
//! Core library for Pingu, the camera rock-paper-scissors game. Holds
//! everything below the UI: the permission state machine gating the camera,
//! the game outcome pipeline, and the match-history store behind the
//! scoreboard.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Blocking calls (permission
//!   prompts, inference) are meant for a worker thread.
//! - **Injected**: Stores, screens and classifiers are passed in explicitly.
//! - **Graceful degradation**: A failed save still returns the played round;
//!   a missing config file yields defaults.
//! - **FFI-ready**: UniFFI annotations enable Kotlin and Swift bindings.
//!   Prefer additive public API changes; removing or renaming breaks FFI clients.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pingu_core::{Gesture, PinguEngine};
//!
//! let engine = PinguEngine::new()?;
//! let round = engine.play_round(Gesture::Rock);
//! println!("{} vs {}: {}", round.game.player_gesture, round.game.opponent_gesture, round.game.outcome);
//! ```

// UniFFI scaffolding for Kotlin/Swift bindings
uniffi::setup_scaffolding!();

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod history;
pub mod permission;
pub mod storage;
pub mod types;

pub use classifier::{
    gesture_from_scores, preprocess, ClassifierConfig, Frame, GestureClassifier, InferenceModel,
    ModelClassifier, Tensor,
};
pub use config::{load_config, save_config, try_load_config, PinguConfig};
pub use engine::PinguEngine;
pub use error::{PinguError, PinguFfiError, Result};
pub use history::{InMemoryMatchHistory, MatchHistory, SqliteMatchHistory};
pub use permission::{
    DenialPolicy, PermissionScreen, PermissionTracker, StatusListener, CAMERA_CAPABILITY,
};
pub use storage::StorageConfig;
pub use types::*;
