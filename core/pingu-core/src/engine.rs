//! PinguEngine - the main entry point for Pingu clients.
//!
//! Wires the game pipeline to an injected [`MatchHistory`] and an optional
//! [`GestureClassifier`]. It is:
//! - **Synchronous**: no async runtime; [`PinguEngine::spawn_round`] offloads
//!   to a plain thread when the caller must not block its UI thread
//! - **Injected**: the history store is passed in, never looked up globally
//! - **Forgiving**: a round whose result could not be saved is still returned
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use pingu_core::{Gesture, PinguEngine};
//!
//! let engine = PinguEngine::new()?;
//! let round = engine.play_round(Gesture::Rock);
//! let board = engine.scoreboard()?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::classifier::{Frame, GestureClassifier};
use crate::error::{PinguError, PinguFfiError, Result};
use crate::game;
use crate::history::{MatchHistory, SqliteMatchHistory};
use crate::storage::StorageConfig;
use crate::types::{Gesture, Match, RoundResult, ScoreSummary, Scoreboard};

/// Game orchestration: classify, play, persist.
#[derive(uniffi::Object)]
pub struct PinguEngine {
    history: Arc<dyn MatchHistory>,
    classifier: Option<Arc<dyn GestureClassifier>>,
}

impl PinguEngine {
    /// Engine over an explicit history store (tests, custom hosts).
    pub fn with_history(history: Arc<dyn MatchHistory>) -> Self {
        Self {
            history,
            classifier: None,
        }
    }

    /// Opens the SQLite history under `storage`.
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        let history = SqliteMatchHistory::open(storage.match_history_db())?;
        Ok(Self::with_history(Arc::new(history)))
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn GestureClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn history_store(&self) -> &Arc<dyn MatchHistory> {
        &self.history
    }

    /// Persists an already-played match, tolerating storage failure.
    pub fn record(&self, game: Match) -> RoundResult {
        match self.history.insert(&game) {
            Ok(stored) => RoundResult {
                game: stored,
                saved: true,
                warning: None,
            },
            Err(err) => {
                tracing::warn!(error = %err, outcome = %game.outcome, "Match result not saved");
                RoundResult {
                    game,
                    saved: false,
                    warning: Some(format!("Result was not saved: {}", err)),
                }
            }
        }
    }

    /// Classifies `frame`, plays the detected gesture and stores the result.
    ///
    /// No gesture means no match: nothing is created or stored.
    pub fn classify_and_play(&self, frame: &Frame) -> Result<RoundResult> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(PinguError::ClassifierUnavailable)?;
        let gesture = classifier
            .classify(frame)
            .ok_or(PinguError::ClassificationAbsent)?;
        Ok(self.play_round(gesture))
    }

    /// Runs [`Self::classify_and_play`] on a background thread and hands the
    /// result to `on_done` there. Marshalling back to a UI thread is the
    /// caller's concern.
    pub fn spawn_round<F>(self: &Arc<Self>, frame: Frame, on_done: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<RoundResult>) + Send + 'static,
    {
        let engine = Arc::clone(self);
        thread::spawn(move || {
            let result = engine.classify_and_play(&frame);
            if let Err(err) = &result {
                tracing::debug!(error = %err, "Background round produced no match");
            }
            on_done(result);
        })
    }
}

#[uniffi::export]
impl PinguEngine {
    /// Creates an engine over the default storage root (`PINGU_HOME` or `~/.pingu`).
    #[uniffi::constructor]
    pub fn new() -> std::result::Result<Self, PinguFfiError> {
        let storage = StorageConfig::resolve()?;
        Ok(Self::open(&storage)?)
    }

    /// Creates an engine storing its data under `root` (the app's files dir on Android).
    #[uniffi::constructor]
    pub fn with_root(root: String) -> std::result::Result<Self, PinguFfiError> {
        let storage = StorageConfig::with_root(PathBuf::from(root));
        Ok(Self::open(&storage)?)
    }

    /// Plays `gesture` against a random opponent and stores the match.
    pub fn play_round(&self, gesture: Gesture) -> RoundResult {
        self.record(game::play(gesture))
    }

    /// All stored matches, most recent first.
    pub fn history(&self) -> std::result::Result<Vec<Match>, PinguFfiError> {
        Ok(self.history.list_all()?)
    }

    pub fn scoreboard(&self) -> std::result::Result<Scoreboard, PinguFfiError> {
        let matches = self.history.list_all()?;
        let summary = ScoreSummary::tally(&matches);
        Ok(Scoreboard { matches, summary })
    }

    pub fn clear_history(&self) -> std::result::Result<(), PinguFfiError> {
        Ok(self.history.clear_all()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryMatchHistory;
    use crate::types::MatchOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    struct BrokenHistory;

    impl MatchHistory for BrokenHistory {
        fn insert(&self, _game: &Match) -> Result<Match> {
            Err(PinguError::persistence(
                "Failed to insert match",
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                    Some("database or disk is full".to_string()),
                ),
            ))
        }

        fn list_all(&self) -> Result<Vec<Match>> {
            Ok(vec![])
        }

        fn clear_all(&self) -> Result<()> {
            Ok(())
        }
    }

    struct ScriptedClassifier {
        answer: Option<Gesture>,
        calls: AtomicUsize,
    }

    impl ScriptedClassifier {
        fn new(answer: Option<Gesture>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl GestureClassifier for ScriptedClassifier {
        fn classify(&self, _frame: &Frame) -> Option<Gesture> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn memory_engine() -> PinguEngine {
        PinguEngine::with_history(Arc::new(InMemoryMatchHistory::new()))
    }

    #[test]
    fn play_round_persists_match() {
        let engine = memory_engine();
        let round = engine.play_round(Gesture::Paper);
        assert!(round.saved);
        assert!(round.warning.is_none());
        assert!(round.game.id.is_some());
        assert_eq!(
            round.game.outcome,
            MatchOutcome::evaluate(Gesture::Paper, round.game.opponent_gesture)
        );

        assert_eq!(engine.history().unwrap(), vec![round.game]);
    }

    #[test]
    fn persistence_failure_still_returns_result() {
        let engine = PinguEngine::with_history(Arc::new(BrokenHistory));
        let round = engine.play_round(Gesture::Rock);
        assert!(!round.saved);
        assert!(round.game.id.is_none());
        assert_eq!(round.game.player_gesture, Gesture::Rock);
        assert!(round.warning.unwrap().contains("disk is full"));
    }

    #[test]
    fn classification_absent_creates_nothing() {
        let classifier = ScriptedClassifier::new(None);
        let engine = memory_engine().with_classifier(classifier.clone());

        let err = engine
            .classify_and_play(&Frame::filled(4, 4, 0))
            .unwrap_err();
        assert!(matches!(err, PinguError::ClassificationAbsent));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert!(engine.history().unwrap().is_empty());
    }

    #[test]
    fn missing_classifier_is_reported() {
        let engine = memory_engine();
        assert!(matches!(
            engine.classify_and_play(&Frame::filled(1, 1, 0)),
            Err(PinguError::ClassifierUnavailable)
        ));
    }

    #[test]
    fn classified_gesture_is_played_and_stored() {
        let engine = memory_engine().with_classifier(ScriptedClassifier::new(Some(Gesture::Scissors)));
        let round = engine
            .classify_and_play(&Frame::filled(4, 4, 0))
            .expect("round");
        assert_eq!(round.game.player_gesture, Gesture::Scissors);
        assert_eq!(engine.history().unwrap().len(), 1);
    }

    #[test]
    fn spawn_round_reports_on_callback() {
        let engine = Arc::new(
            memory_engine().with_classifier(ScriptedClassifier::new(Some(Gesture::Rock))),
        );
        let (tx, rx) = mpsc::channel();
        let handle = engine.spawn_round(Frame::filled(2, 2, 0), move |result| {
            tx.send(result.map(|round| round.game)).unwrap();
        });
        handle.join().unwrap();

        let game = rx.recv().unwrap().expect("round");
        assert_eq!(game.player_gesture, Gesture::Rock);
        // Persisted before the callback ran.
        assert_eq!(engine.history().unwrap(), vec![game]);
    }

    #[test]
    fn scoreboard_tallies_history() {
        let engine = memory_engine();
        for _ in 0..12 {
            engine.play_round(Gesture::Rock);
        }
        let board = engine.scoreboard().unwrap();
        assert_eq!(board.matches.len(), 12);
        assert_eq!(board.summary.total, 12);
        assert_eq!(
            board.summary.wins + board.summary.losses + board.summary.draws,
            12
        );

        engine.clear_history().unwrap();
        assert_eq!(engine.scoreboard().unwrap().summary, ScoreSummary::default());
    }

    #[test]
    fn open_uses_storage_root() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let storage = StorageConfig::with_root(temp_dir.path().join("pingu"));
        let engine = PinguEngine::open(&storage).expect("open");
        engine.play_round(Gesture::Paper);
        assert!(storage.match_history_db().exists());

        let reopened = PinguEngine::open(&storage).expect("reopen");
        assert_eq!(reopened.history().unwrap().len(), 1);
    }
}
