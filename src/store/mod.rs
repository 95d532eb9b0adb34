use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::calendar::SeasonDate;

pub mod models;
use models::MatchRecord;

/// Durable append-only archive of finished matches, ascending by coordinate.
///
/// Single SQLite connection behind a mutex: appends are serialized and run
/// in one transaction, so a concurrent reader never observes a partial
/// batch. Rows are never updated or deleted — the rowid is the append order.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open (or create) the archive at the given path.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = LocalStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// In-memory archive for tests.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = LocalStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)
    }

    /// Coordinate of the most recently appended record, or `None` if empty.
    pub fn last_coordinate(&self) -> Result<Option<SeasonDate>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT matchday, season FROM matches ORDER BY rowid DESC LIMIT 1",
            [],
            |row| {
                Ok(SeasonDate {
                    matchday: row.get(0)?,
                    season: row.get(1)?,
                })
            },
        )
        .optional()
    }

    /// Append records in the given order, atomically.
    ///
    /// The caller guarantees ascending coordinate order and that no present
    /// coordinate is re-appended; neither is enforced here, and violating
    /// the contract produces duplicate rows rather than a rejected write.
    pub fn append(&self, records: &[MatchRecord]) -> Result<(), rusqlite::Error> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO matches (
                    date_time, matchday, home_team, home_score,
                    guest_score, guest_team, season
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
            )?;
            for rec in records {
                stmt.execute(params![
                    rec.date_time,
                    rec.coordinate.matchday,
                    rec.home_team,
                    rec.home_score,
                    rec.guest_score,
                    rec.guest_team,
                    rec.coordinate.season,
                ])?;
            }
        }
        tx.commit()?;
        debug!("appended {} finished matches", records.len());
        Ok(())
    }

    /// All stored records with coordinates in `[start, end]` inclusive, in
    /// stored (ascending) order.
    pub fn read_range(
        &self,
        start: SeasonDate,
        end: SeasonDate,
    ) -> Result<Vec<MatchRecord>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT date_time, matchday, home_team, home_score,
                    guest_score, guest_team, season
             FROM matches
             WHERE season BETWEEN ?1 AND ?2
               AND (season != ?1 OR matchday >= ?3)
               AND (season != ?2 OR matchday <= ?4)
             ORDER BY rowid",
        )?;
        let records = stmt
            .query_map(
                params![start.season, end.season, start.matchday, end.matchday],
                map_match,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Number of archived matches.
    pub fn len(&self) -> Result<u64, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))
    }

    pub fn is_empty(&self) -> Result<bool, rusqlite::Error> {
        Ok(self.len()? == 0)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        date_time: row.get(0)?,
        coordinate: SeasonDate {
            matchday: row.get(1)?,
            season: row.get(6)?,
        },
        home_team: row.get(2)?,
        home_score: row.get(3)?,
        guest_score: row.get(4)?,
        guest_team: row.get(5)?,
        // only finished matches are ever archived
        finished: true,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS). The column set and order
/// is the boundary contract consumed by the prediction/UI layers.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS matches (
    date_time   TEXT    NOT NULL,
    matchday    INTEGER NOT NULL,
    home_team   TEXT    NOT NULL,
    home_score  INTEGER NOT NULL,
    guest_score INTEGER NOT NULL,
    guest_team  TEXT    NOT NULL,
    season      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_matches_coordinate ON matches(season, matchday);
"#;
