//! pingu: command-line host for the Pingu rock-paper-scissors core.
//!
//! Plays rounds, shows the scoreboard, and walks the camera-permission
//! lifecycle against a simulated platform kept in `<root>/permissions.json`.
//!
//! ## Subcommands
//!
//! - `play`: Play one round against a random opponent
//! - `history` / `stats`: Show stored matches and their tally
//! - `clear`: Delete the match history
//! - `permission`: Query, request, reset, or change the camera permission

mod commands;
mod logging;
mod screen;

use clap::{Parser, Subcommand};
use pingu_core::{load_config, Gesture, StorageConfig};
use std::path::PathBuf;

use crate::screen::SettingsChange;

#[derive(Parser)]
#[command(name = "pingu")]
#[command(about = "Rock-paper-scissors against Pingu")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to $PINGU_HOME, then ~/.pingu)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one round
    Play {
        /// rock, paper or scissors
        #[arg(value_name = "GESTURE")]
        gesture: Gesture,

        #[arg(long)]
        json: bool,
    },

    /// List stored matches, most recent first
    History {
        /// Maximum rows to show (defaults to the configured history_limit)
        #[arg(
            long,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show the win/loss/draw tally
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Delete every stored match
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Camera permission lifecycle
    Permission {
        #[command(subcommand)]
        action: PermissionCommand,
    },
}

#[derive(Subcommand)]
enum PermissionCommand {
    /// Show the current status and what to do next
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Show the system dialog (unless already granted)
    Request {
        /// Answer "allow" without asking
        #[arg(long, conflicts_with = "deny")]
        allow: bool,

        /// Answer "deny" without asking
        #[arg(long)]
        deny: bool,

        #[arg(long)]
        json: bool,
    },

    /// Open app settings, optionally changing the permission there
    Settings {
        #[arg(long, conflicts_with = "revoke")]
        allow: bool,

        #[arg(long)]
        revoke: bool,

        #[arg(long)]
        json: bool,
    },

    /// Forget the stored decision, as after a reinstall
    Reset,
}

fn main() {
    let cli = Cli::parse();

    let storage = match cli.root {
        Some(root) => StorageConfig::with_root(root),
        None => match StorageConfig::resolve() {
            Ok(storage) => storage,
            Err(e) => {
                eprintln!("pingu: {}", e);
                std::process::exit(1);
            }
        },
    };
    let logging_guard = logging::init(&storage);
    let config = load_config(&storage);

    let result = match cli.command {
        Commands::Play { gesture, json } => commands::play(&storage, gesture, json),
        Commands::History { limit, json } => commands::history(&storage, &config, limit, json),
        Commands::Stats { json } => commands::stats(&storage, json),
        Commands::Clear { yes } => commands::clear(&storage, yes),
        Commands::Permission { action } => match action {
            PermissionCommand::Status { json } => {
                commands::permission_status(&storage, &config, json)
            }
            PermissionCommand::Request { allow, deny, json } => {
                let answer = (allow || deny).then_some(allow);
                commands::permission_request(&storage, &config, answer, json)
            }
            PermissionCommand::Settings {
                allow,
                revoke,
                json,
            } => {
                let change = if allow {
                    Some(SettingsChange::Allow)
                } else if revoke {
                    Some(SettingsChange::Revoke)
                } else {
                    None
                };
                commands::permission_settings(&storage, &config, change, json)
            }
            PermissionCommand::Reset => commands::permission_reset(&storage, &config),
        },
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "pingu command failed");
        // exit() skips destructors; flush the log file first.
        drop(logging_guard);
        std::process::exit(1);
    }
}
