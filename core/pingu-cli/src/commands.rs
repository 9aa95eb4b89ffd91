//! Subcommand implementations.
//!
//! Each command opens what it needs from the storage root, does one thing
//! and prints the result. `--json` variants print the core types as-is.

use std::io;
use std::sync::Arc;

use chrono::Local;
use pingu_core::{
    Gesture, Match, MatchOutcome, PermissionAction, PermissionStatus, PermissionTracker,
    PinguConfig, PinguEngine, PinguError, ScoreSummary, StorageConfig,
};
use serde::Serialize;
use thiserror::Error;

use crate::screen::{ConsoleScreen, PromptMode, ScreenError, SettingsChange};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Core(#[from] PinguError),

    #[error(transparent)]
    Screen(#[from] ScreenError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Failed to read confirmation: {0}")]
    Confirm(#[source] io::Error),
}

pub type CommandResult = Result<(), CommandError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Game
// ═══════════════════════════════════════════════════════════════════════════════

pub fn play(storage: &StorageConfig, gesture: Gesture, json: bool) -> CommandResult {
    let engine = PinguEngine::open(storage)?;
    let round = engine.play_round(gesture);
    if json {
        return print_json(&round);
    }

    let game = &round.game;
    println!(
        "You: {} {}   Pingu: {} {}",
        game.player_gesture.emoji(),
        game.player_gesture,
        game.opponent_gesture.emoji(),
        game.opponent_gesture
    );
    println!("{}", headline(game));
    if let Some(warning) = &round.warning {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

pub fn history(
    storage: &StorageConfig,
    config: &PinguConfig,
    limit: Option<usize>,
    json: bool,
) -> CommandResult {
    let engine = PinguEngine::open(storage)?;
    let mut matches = engine.history_store().list_all()?;
    let limit = limit.unwrap_or(config.history_limit);
    if json {
        matches.truncate(limit);
        return print_json(&matches);
    }

    for line in render_history(matches, limit) {
        println!("{}", line);
    }
    Ok(())
}

/// Text listing, newest first; says so when `limit` hides rows.
fn render_history(mut matches: Vec<Match>, limit: usize) -> Vec<String> {
    if matches.is_empty() {
        return vec!["No matches played yet.".to_string()];
    }
    let total = matches.len();
    matches.truncate(limit);
    let mut lines: Vec<String> = matches.iter().map(history_line).collect();
    if matches.len() < total {
        lines.push(format!("({} of {} matches shown)", matches.len(), total));
    }
    lines
}

pub fn stats(storage: &StorageConfig, json: bool) -> CommandResult {
    let engine = PinguEngine::open(storage)?;
    let matches = engine.history_store().list_all()?;
    let summary = ScoreSummary::tally(&matches);
    if json {
        return print_json(&summary);
    }
    println!(
        "Played {}  Won {}  Lost {}  Drawn {}",
        summary.total, summary.wins, summary.losses, summary.draws
    );
    Ok(())
}

pub fn clear(storage: &StorageConfig, yes: bool) -> CommandResult {
    if !yes && !confirm("Delete all match history? [y/N] ")? {
        println!("Nothing deleted.");
        return Ok(());
    }
    let engine = PinguEngine::open(storage)?;
    engine.history_store().clear_all()?;
    println!("Match history cleared.");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permission
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct PermissionReport<'a> {
    capability: &'a str,
    status: PermissionStatus,
    action: PermissionAction,
}

fn tracker_for(config: &PinguConfig, screen: Arc<ConsoleScreen>) -> PermissionTracker {
    let tracker = PermissionTracker::new(config.camera_capability.clone(), config.denial_policy);
    tracker.attach(screen);
    tracker
}

fn report(tracker: &PermissionTracker, json: bool) -> CommandResult {
    let status = tracker.status();
    if json {
        return print_json(&PermissionReport {
            capability: tracker.capability(),
            status,
            action: status.recommended_action(),
        });
    }
    println!("{}: {}", tracker.capability(), status);
    match status.recommended_action() {
        PermissionAction::Proceed => {}
        PermissionAction::Request if status == PermissionStatus::ShowRationale => {
            println!("Pingu needs the camera to see your hand. Run `pingu permission request`.")
        }
        PermissionAction::Request => println!("Run `pingu permission request` to grant access."),
        PermissionAction::OpenSettings => {
            println!("Access is blocked. Run `pingu permission settings --allow` to open settings.")
        }
    }
    Ok(())
}

pub fn permission_status(
    storage: &StorageConfig,
    config: &PinguConfig,
    json: bool,
) -> CommandResult {
    let screen = Arc::new(ConsoleScreen::load(storage.permissions_file())?);
    let tracker = tracker_for(config, screen);
    report(&tracker, json)
}

pub fn permission_request(
    storage: &StorageConfig,
    config: &PinguConfig,
    answer: Option<bool>,
    json: bool,
) -> CommandResult {
    let mode = answer.map_or(PromptMode::Interactive, PromptMode::Scripted);
    let screen = Arc::new(ConsoleScreen::load(storage.permissions_file())?.with_prompt_mode(mode));
    let tracker = tracker_for(config, screen);
    tracker.request_permission()?;
    report(&tracker, json)
}

pub fn permission_settings(
    storage: &StorageConfig,
    config: &PinguConfig,
    change: Option<SettingsChange>,
    json: bool,
) -> CommandResult {
    let mut screen = ConsoleScreen::load(storage.permissions_file())?;
    if let Some(change) = change {
        screen = screen.with_settings_change(&config.camera_capability, change);
    }
    let tracker = tracker_for(config, Arc::new(screen));
    tracker.open_platform_settings();
    tracker.on_resume();
    report(&tracker, json)
}

pub fn permission_reset(storage: &StorageConfig, config: &PinguConfig) -> CommandResult {
    let screen = ConsoleScreen::load(storage.permissions_file())?;
    screen.reset(&config.camera_capability)?;
    println!("Permission state for {} reset.", config.camera_capability);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn headline(game: &Match) -> &'static str {
    match game.outcome {
        MatchOutcome::Win => "You win!",
        MatchOutcome::Lose => "Pingu wins.",
        MatchOutcome::Draw => "Draw.",
    }
}

fn history_line(game: &Match) -> String {
    let when = game
        .created_at()
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown time".to_string());
    format!(
        "#{:<5} {}  {} vs {}  {}",
        game.id.unwrap_or_default(),
        when,
        game.player_gesture.emoji(),
        game.opponent_gesture.emoji(),
        game.outcome
    )
}

fn confirm(question: &str) -> Result<bool, CommandError> {
    use std::io::{BufRead, Write};

    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", question).map_err(CommandError::Confirm)?;
    stdout.flush().map_err(CommandError::Confirm)?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(CommandError::Confirm)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}
