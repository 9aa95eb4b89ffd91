//! Core types shared across all Pingu clients.
//!
//! The Android app, the CLI and the tests all speak these exact types.
//!
//! **FFI Support:** All types are annotated with UniFFI macros for Kotlin/Swift bindings.
//!
//! Enum values persist as their upper-case names (`ROCK`, `WIN`, ...), so
//! `as_str` and `from_name` must stay in lockstep with the stored history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PinguError;

// ═══════════════════════════════════════════════════════════════════════════════
// Gestures
// ═══════════════════════════════════════════════════════════════════════════════

/// One of the three hand signs usable in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    Rock,
    Paper,
    Scissors,
}

impl Gesture {
    /// Every gesture, in classifier output order.
    pub const ALL: [Gesture; 3] = [Gesture::Rock, Gesture::Paper, Gesture::Scissors];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Rock => "ROCK",
            Gesture::Paper => "PAPER",
            Gesture::Scissors => "SCISSORS",
        }
    }

    /// Parses a stored or user-typed name, ignoring case.
    pub fn from_name(value: &str) -> Option<Self> {
        Gesture::ALL
            .into_iter()
            .find(|gesture| gesture.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// The gesture this one defeats. The relation is cyclic.
    pub fn defeats(&self) -> Gesture {
        match self {
            Gesture::Rock => Gesture::Scissors,
            Gesture::Scissors => Gesture::Paper,
            Gesture::Paper => Gesture::Rock,
        }
    }

    pub fn beats(&self, other: Gesture) -> bool {
        self.defeats() == other
    }

    /// Scoreboard glyph.
    pub fn emoji(&self) -> &'static str {
        match self {
            Gesture::Rock => "🪨",
            Gesture::Paper => "📄",
            Gesture::Scissors => "✂️",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gesture {
    type Err = PinguError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Gesture::from_name(value).ok_or_else(|| PinguError::InvalidGesture(value.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a match, from the human player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOutcome {
    Win,
    Lose,
    Draw,
}

impl MatchOutcome {
    pub fn evaluate(player: Gesture, opponent: Gesture) -> Self {
        if player == opponent {
            MatchOutcome::Draw
        } else if player.beats(opponent) {
            MatchOutcome::Win
        } else {
            MatchOutcome::Lose
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::Win => "WIN",
            MatchOutcome::Lose => "LOSE",
            MatchOutcome::Draw => "DRAW",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WIN" => Some(MatchOutcome::Win),
            "LOSE" => Some(MatchOutcome::Lose),
            "DRAW" => Some(MatchOutcome::Draw),
            _ => None,
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Match Records
// ═══════════════════════════════════════════════════════════════════════════════

/// A single played round.
///
/// `id` stays `None` until the history store assigns one. `created_at_ms` is
/// epoch milliseconds, the same resolution the store keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Match {
    pub id: Option<i64>,
    pub player_gesture: Gesture,
    pub opponent_gesture: Gesture,
    pub outcome: MatchOutcome,
    pub created_at_ms: i64,
}

impl Match {
    pub fn new(player_gesture: Gesture, opponent_gesture: Gesture, created_at_ms: i64) -> Self {
        Self {
            id: None,
            player_gesture,
            opponent_gesture,
            outcome: MatchOutcome::evaluate(player_gesture, opponent_gesture),
            created_at_ms,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at_ms)
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Win/loss/draw tally shown above the match list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct ScoreSummary {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total: u32,
}

impl ScoreSummary {
    pub fn tally<'a>(matches: impl IntoIterator<Item = &'a Match>) -> Self {
        let mut summary = ScoreSummary::default();
        for m in matches {
            match m.outcome {
                MatchOutcome::Win => summary.wins += 1,
                MatchOutcome::Lose => summary.losses += 1,
                MatchOutcome::Draw => summary.draws += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Scoreboard payload: history (most recent first) plus its tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Scoreboard {
    pub matches: Vec<Match>,
    pub summary: ScoreSummary,
}

/// Outcome of one orchestrated round.
///
/// The match is returned even when persisting it failed; `warning` then
/// carries the reason so the UI can tell the user it was not saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct RoundResult {
    pub game: Match,
    pub saved: bool,
    pub warning: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permissions
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime permission status for one capability. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionStatus {
    /// Capability granted.
    Granted,
    /// Not granted and no rationale hint; possibly never asked.
    Denied,
    /// Refused before; the platform suggests explaining before asking again.
    ShowRationale,
    /// Refused with no further prompts allowed. Only settings can fix it.
    PermanentlyDenied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }

    pub fn recommended_action(&self) -> PermissionAction {
        match self {
            PermissionStatus::Granted => PermissionAction::Proceed,
            PermissionStatus::Denied | PermissionStatus::ShowRationale => {
                PermissionAction::Request
            }
            PermissionStatus::PermanentlyDenied => PermissionAction::OpenSettings,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Granted => "GRANTED",
            PermissionStatus::Denied => "DENIED",
            PermissionStatus::ShowRationale => "SHOW_RATIONALE",
            PermissionStatus::PermanentlyDenied => "PERMANENTLY_DENIED",
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the permission UI should offer for the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionAction {
    Proceed,
    Request,
    OpenSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_names_parse_case_insensitively() {
        assert_eq!(Gesture::from_name("rock"), Some(Gesture::Rock));
        assert_eq!(Gesture::from_name(" Paper "), Some(Gesture::Paper));
        assert_eq!(Gesture::from_name("SCISSORS"), Some(Gesture::Scissors));
        assert_eq!(Gesture::from_name("lizard"), None);
        assert!("spock".parse::<Gesture>().is_err());
    }

    #[test]
    fn stored_names_round_trip() {
        for gesture in Gesture::ALL {
            assert_eq!(Gesture::from_name(gesture.as_str()), Some(gesture));
        }
        for outcome in [MatchOutcome::Win, MatchOutcome::Lose, MatchOutcome::Draw] {
            assert_eq!(MatchOutcome::from_name(outcome.as_str()), Some(outcome));
        }
    }

    #[test]
    fn serde_uses_upper_case_names() {
        let json = serde_json::to_string(&PermissionStatus::ShowRationale).unwrap();
        assert_eq!(json, "\"SHOW_RATIONALE\"");
        let gesture: Gesture = serde_json::from_str("\"SCISSORS\"").unwrap();
        assert_eq!(gesture, Gesture::Scissors);
    }

    #[test]
    fn beats_relation_is_total_and_asymmetric() {
        for a in Gesture::ALL {
            assert!(!a.beats(a));
            for b in Gesture::ALL {
                if a != b {
                    assert!(a.beats(b) ^ b.beats(a), "{a} vs {b}");
                }
            }
        }
    }

    #[test]
    fn tally_counts_each_outcome() {
        let matches = vec![
            Match::new(Gesture::Rock, Gesture::Scissors, 1),
            Match::new(Gesture::Rock, Gesture::Paper, 2),
            Match::new(Gesture::Paper, Gesture::Rock, 3),
            Match::new(Gesture::Paper, Gesture::Paper, 4),
        ];
        let summary = ScoreSummary::tally(&matches);
        assert_eq!(
            summary,
            ScoreSummary {
                wins: 2,
                losses: 1,
                draws: 1,
                total: 4
            }
        );
    }

    #[test]
    fn recommended_actions_follow_status() {
        assert_eq!(
            PermissionStatus::Granted.recommended_action(),
            PermissionAction::Proceed
        );
        assert_eq!(
            PermissionStatus::ShowRationale.recommended_action(),
            PermissionAction::Request
        );
        assert_eq!(
            PermissionStatus::PermanentlyDenied.recommended_action(),
            PermissionAction::OpenSettings
        );
    }

    #[test]
    fn created_at_converts_from_millis() {
        let m = Match::new(Gesture::Rock, Gesture::Rock, 1_700_000_000_123);
        let ts = m.created_at().unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_123);
    }
}
