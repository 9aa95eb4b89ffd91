//! Match history persistence.
//!
//! [`MatchHistory`] is injected wherever history is read or written; there is
//! no global instance. [`SqliteMatchHistory`] is the durable store backing the
//! app, [`InMemoryMatchHistory`] a drop-in for tests and filesystem-less hosts.
//!
//! Both serialize writes behind a mutex, so readers observe a table either
//! before or after a write, never half of one.

use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{PinguError, Result};
use crate::types::{Gesture, Match, MatchOutcome};

/// Durable, ordered storage of played matches.
pub trait MatchHistory: Send + Sync {
    /// Appends `game`, assigning an id when it has none (a given id replaces
    /// that row). Durable once this returns `Ok`.
    fn insert(&self, game: &Match) -> Result<Match>;

    /// Snapshot of every stored match, most recent first.
    fn list_all(&self) -> Result<Vec<Match>>;

    /// Removes every record. Irreversible.
    fn clear_all(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SQLite
// ═══════════════════════════════════════════════════════════════════════════════

pub struct SqliteMatchHistory {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteMatchHistory {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).map_err(|source| PinguError::Io {
                context: "Failed to create match history directory".to_string(),
                source,
            })?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|err| PinguError::persistence("Failed to open sqlite db", err))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|err| PinguError::persistence("Failed to enable WAL", err))?;
        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(|err| PinguError::persistence("Failed to set synchronous", err))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|err| PinguError::persistence("Failed to set busy_timeout", err))?;

        let store = Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "Match history opened");
        Ok(store)
    }

    /// Private in-memory SQLite database; nothing survives the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| PinguError::persistence("Failed to open in-memory sqlite db", err))?;
        let store = Self {
            path: None,
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(
                "BEGIN;
                 CREATE TABLE IF NOT EXISTS match_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    player_gesture TEXT NOT NULL,
                    opponent_gesture TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_match_history_created_at
                    ON match_history (created_at DESC);
                 COMMIT;",
            )
            .map_err(|err| PinguError::persistence("Failed to initialize schema", err))
        })
    }

    fn with_connection<T>(&self, op: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut conn)
    }
}

impl MatchHistory for SqliteMatchHistory {
    fn insert(&self, game: &Match) -> Result<Match> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO match_history \
                    (id, player_gesture, opponent_gesture, outcome, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    game.id,
                    game.player_gesture.as_str(),
                    game.opponent_gesture.as_str(),
                    game.outcome.as_str(),
                    game.created_at_ms
                ],
            )
            .map_err(|err| PinguError::persistence("Failed to insert match", err))?;

            let id = game.id.unwrap_or_else(|| conn.last_insert_rowid());
            tracing::debug!(id, outcome = %game.outcome, "Match stored");
            Ok(game.clone().with_id(id))
        })
    }

    fn list_all(&self) -> Result<Vec<Match>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, player_gesture, opponent_gesture, outcome, created_at \
                     FROM match_history ORDER BY created_at DESC, id DESC",
                )
                .map_err(|err| PinguError::persistence("Failed to prepare history query", err))?;

            let rows = stmt
                .query_map([], read_row)
                .map_err(|err| PinguError::persistence("Failed to query history", err))?;

            let mut matches = Vec::new();
            for row in rows {
                let raw =
                    row.map_err(|err| PinguError::persistence("Failed to decode history row", err))?;
                matches.push(raw.into_match()?);
            }
            Ok(matches)
        })
    }

    fn clear_all(&self) -> Result<()> {
        self.with_connection(|conn| {
            let removed = conn
                .execute("DELETE FROM match_history", [])
                .map_err(|err| PinguError::persistence("Failed to clear history", err))?;
            tracing::info!(removed, "Match history cleared");
            Ok(())
        })
    }
}

struct RawMatch {
    id: i64,
    player_gesture: String,
    opponent_gesture: String,
    outcome: String,
    created_at: i64,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawMatch> {
    Ok(RawMatch {
        id: row.get(0)?,
        player_gesture: row.get(1)?,
        opponent_gesture: row.get(2)?,
        outcome: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl RawMatch {
    fn into_match(self) -> Result<Match> {
        Ok(Match {
            id: Some(self.id),
            player_gesture: parse_gesture("player_gesture", &self.player_gesture)?,
            opponent_gesture: parse_gesture("opponent_gesture", &self.opponent_gesture)?,
            outcome: MatchOutcome::from_name(&self.outcome).ok_or_else(|| {
                PinguError::CorruptRecord {
                    column: "outcome".to_string(),
                    value: self.outcome.clone(),
                }
            })?,
            created_at_ms: self.created_at,
        })
    }
}

fn parse_gesture(column: &str, value: &str) -> Result<Gesture> {
    Gesture::from_name(value).ok_or_else(|| PinguError::CorruptRecord {
        column: column.to_string(),
        value: value.to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-memory
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct InMemoryMatchHistory {
    inner: Mutex<MemoryTable>,
}

#[derive(Default)]
struct MemoryTable {
    rows: Vec<Match>,
    last_id: i64,
}

impl InMemoryMatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, MemoryTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MatchHistory for InMemoryMatchHistory {
    fn insert(&self, game: &Match) -> Result<Match> {
        let mut table = self.table();
        let id = match game.id {
            Some(id) => {
                table.rows.retain(|row| row.id != Some(id));
                table.last_id = table.last_id.max(id);
                id
            }
            None => {
                table.last_id += 1;
                table.last_id
            }
        };
        let stored = game.clone().with_id(id);
        table.rows.push(stored.clone());
        Ok(stored)
    }

    fn list_all(&self) -> Result<Vec<Match>> {
        let mut rows = self.table().rows.clone();
        rows.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    fn clear_all(&self) -> Result<()> {
        self.table().rows.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(player: Gesture, opponent: Gesture, at: i64) -> Match {
        Match::new(player, opponent, at)
    }

    fn stores() -> Vec<(&'static str, Box<dyn MatchHistory>)> {
        let sqlite: Box<dyn MatchHistory> =
            Box::new(SqliteMatchHistory::open_in_memory().expect("sqlite"));
        let memory: Box<dyn MatchHistory> = Box::new(InMemoryMatchHistory::new());
        vec![("sqlite", sqlite), ("memory", memory)]
    }

    #[test]
    fn insert_then_list_round_trips_fields() {
        for (name, store) in stores() {
            let game = sample(Gesture::Scissors, Gesture::Paper, 1_706_659_200_123);
            let stored = store.insert(&game).expect("insert");
            assert!(stored.id.is_some(), "{name}");

            let listed = store.list_all().expect("list");
            assert_eq!(listed.len(), 1, "{name}");
            assert_eq!(listed[0], stored, "{name}");
            assert_eq!(listed[0].player_gesture, Gesture::Scissors);
            assert_eq!(listed[0].opponent_gesture, Gesture::Paper);
            assert_eq!(listed[0].outcome, MatchOutcome::Win);
            assert_eq!(listed[0].created_at_ms, 1_706_659_200_123);
        }
    }

    #[test]
    fn lists_most_recent_first() {
        for (name, store) in stores() {
            store.insert(&sample(Gesture::Rock, Gesture::Rock, 100)).unwrap();
            store.insert(&sample(Gesture::Rock, Gesture::Paper, 300)).unwrap();
            store.insert(&sample(Gesture::Rock, Gesture::Scissors, 200)).unwrap();

            let times: Vec<_> = store
                .list_all()
                .unwrap()
                .iter()
                .map(|m| m.created_at_ms)
                .collect();
            assert_eq!(times, vec![300, 200, 100], "{name}");
        }
    }

    #[test]
    fn same_timestamp_orders_by_id() {
        for (name, store) in stores() {
            let first = store.insert(&sample(Gesture::Rock, Gesture::Rock, 5)).unwrap();
            let second = store.insert(&sample(Gesture::Paper, Gesture::Rock, 5)).unwrap();
            assert!(second.id > first.id, "{name}");

            let listed = store.list_all().unwrap();
            assert_eq!(listed[0].id, second.id, "{name}");
        }
    }

    #[test]
    fn explicit_id_replaces_row() {
        for (name, store) in stores() {
            let stored = store.insert(&sample(Gesture::Rock, Gesture::Rock, 1)).unwrap();
            let replacement = sample(Gesture::Paper, Gesture::Rock, 2).with_id(stored.id.unwrap());
            store.insert(&replacement).unwrap();

            let listed = store.list_all().unwrap();
            assert_eq!(listed, vec![replacement], "{name}");
        }
    }

    #[test]
    fn clear_all_empties_store() {
        for (name, store) in stores() {
            store.insert(&sample(Gesture::Rock, Gesture::Paper, 1)).unwrap();
            store.insert(&sample(Gesture::Paper, Gesture::Paper, 2)).unwrap();
            store.clear_all().unwrap();
            assert!(store.list_all().unwrap().is_empty(), "{name}");
        }
    }

    #[test]
    fn ids_keep_increasing_after_clear() {
        let store = SqliteMatchHistory::open_in_memory().unwrap();
        let first = store.insert(&sample(Gesture::Rock, Gesture::Paper, 1)).unwrap();
        store.clear_all().unwrap();
        let second = store.insert(&sample(Gesture::Rock, Gesture::Paper, 2)).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn survives_reopen() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let db_path = temp_dir.path().join("nested").join("match_history.db");

        let stored = {
            let store = SqliteMatchHistory::open(&db_path).expect("open");
            store
                .insert(&sample(Gesture::Paper, Gesture::Scissors, 42))
                .expect("insert")
        };

        let reopened = SqliteMatchHistory::open(&db_path).expect("reopen");
        assert_eq!(reopened.path(), Some(db_path.as_path()));
        assert_eq!(reopened.list_all().unwrap(), vec![stored]);
    }

    #[test]
    fn unknown_enum_text_is_a_persistence_failure() {
        let store = SqliteMatchHistory::open_in_memory().unwrap();
        store
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO match_history (player_gesture, opponent_gesture, outcome, created_at) \
                     VALUES ('LIZARD', 'ROCK', 'WIN', 1)",
                    [],
                )
                .map_err(|err| PinguError::persistence("seed", err))
            })
            .unwrap();

        let err = store.list_all().unwrap_err();
        assert!(err.is_persistence_failure());
        assert!(err.to_string().contains("player_gesture"));
    }

    #[test]
    fn schema_stores_enum_names_as_text() {
        let store = SqliteMatchHistory::open_in_memory().unwrap();
        store
            .insert(&sample(Gesture::Scissors, Gesture::Rock, 9))
            .unwrap();
        let row: (String, String, String) = store
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT player_gesture, opponent_gesture, outcome FROM match_history",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map_err(|err| PinguError::persistence("read", err))
            })
            .unwrap();
        assert_eq!(
            row,
            ("SCISSORS".to_string(), "ROCK".to_string(), "LOSE".to_string())
        );
    }
}
