use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::TrackRow;

use super::migrations::MIGRATIONS;

/// A connection to the tracklist catalog.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Track writes
impl Database {
    /// Insert (or replace) a batch of track rows in one transaction.
    pub fn insert_tracks(&self, rows: &[TrackRow]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO tracks (tracklist_id, position, duration_ms)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (tracklist_id, position)
                 DO UPDATE SET duration_ms = excluded.duration_ms",
            )?;
            for row in rows {
                let tracklist_id = i64::try_from(row.tracklist_id).map_err(|_| {
                    Error::InvalidData(format!("tracklist id {} out of range", row.tracklist_id))
                })?;
                stmt.execute(rusqlite::params![
                    tracklist_id,
                    i64::from(row.position),
                    row.duration_ms,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }
}

// Track reads
impl Database {
    /// Number of distinct tracklists. Counts include tracklists the index
    /// builder will later drop.
    pub fn count_tracklists(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT tracklist_id) FROM tracks",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Number of track rows.
    pub fn count_tracks(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Durations of one tracklist, in position order.
    pub fn get_tracklist(&self, tracklist_id: u64) -> Result<Option<Vec<i64>>> {
        let Ok(id) = i64::try_from(tracklist_id) else {
            return Ok(None);
        };
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM tracks WHERE tracklist_id = ?1 LIMIT 1",
                [id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(duration_ms, 0) FROM tracks
             WHERE tracklist_id = ?1
             ORDER BY position",
        )?;
        let durations = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(Some(durations))
    }

    /// Page through all track rows ordered by `(tracklist_id, position)`.
    ///
    /// Pages hold at most `chunk_size` rows, so a tracklist may be split
    /// across two pages.
    #[must_use]
    pub fn track_chunks(&self, chunk_size: usize) -> TrackChunks<'_> {
        TrackChunks {
            db: self,
            chunk_size: chunk_size.max(1),
            cursor: None,
            done: false,
        }
    }

    fn fetch_chunk(&self, after: Option<(u64, u32)>, limit: usize) -> Result<Vec<TrackRow>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let raw: Vec<(i64, i64, i64)> = match after {
            None => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT tracklist_id, position, COALESCE(duration_ms, 0)
                     FROM tracks
                     ORDER BY tracklist_id, position
                     LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map([limit], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            Some((tracklist_id, position)) => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT tracklist_id, position, COALESCE(duration_ms, 0)
                     FROM tracks
                     WHERE (tracklist_id, position) > (?1, ?2)
                     ORDER BY tracklist_id, position
                     LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![tracklist_id as i64, i64::from(position), limit],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };

        raw.into_iter()
            .map(|(tracklist_id, position, duration_ms)| {
                let tracklist_id = u64::try_from(tracklist_id).map_err(|_| {
                    Error::InvalidData(format!("negative tracklist id {tracklist_id}"))
                })?;
                let position = u32::try_from(position).map_err(|_| {
                    Error::InvalidData(format!(
                        "track position {position} out of range in tracklist {tracklist_id}"
                    ))
                })?;
                Ok(TrackRow::new(tracklist_id, position, duration_ms))
            })
            .collect()
    }
}

/// Lazy iterator over pages of catalog rows.
///
/// Yields each page once; after an error or a short page the iterator is
/// exhausted.
#[derive(Debug)]
pub struct TrackChunks<'a> {
    db: &'a Database,
    chunk_size: usize,
    cursor: Option<(u64, u32)>,
    done: bool,
}

impl Iterator for TrackChunks<'_> {
    type Item = Result<Vec<TrackRow>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.db.fetch_chunk(self.cursor, self.chunk_size) {
            Ok(rows) => {
                let Some(last) = rows.last() else {
                    self.done = true;
                    return None;
                };
                self.cursor = Some((last.tracklist_id, last.position));
                if rows.len() < self.chunk_size {
                    self.done = true;
                }
                Some(Ok(rows))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
