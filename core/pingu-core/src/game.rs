//! Game outcome pipeline.
//!
//! Stateless: every call draws its own opponent and returns a fresh [`Match`].
//! Persisting the result is the caller's job (see [`crate::engine`]).

use chrono::Utc;
use rand::Rng;

use crate::types::{Gesture, Match};

/// Plays one round against a uniformly random opponent.
pub fn play(player: Gesture) -> Match {
    play_with(&mut rand::thread_rng(), player)
}

/// Plays one round, drawing the opponent from `rng`.
pub fn play_with<R: Rng + ?Sized>(rng: &mut R, player: Gesture) -> Match {
    let opponent = random_gesture(rng);
    play_against(player, opponent)
}

/// Resolves a round with a known opponent, stamped with the current time.
pub fn play_against(player: Gesture, opponent: Gesture) -> Match {
    let game = Match::new(player, opponent, Utc::now().timestamp_millis());
    tracing::debug!(
        player = %player,
        opponent = %opponent,
        outcome = %game.outcome,
        "Round resolved"
    );
    game
}

/// Uniform draw over the three gestures, independent of the player's pick.
pub fn random_gesture<R: Rng + ?Sized>(rng: &mut R) -> Gesture {
    Gesture::ALL[rng.gen_range(0..Gesture::ALL.len())]
}
