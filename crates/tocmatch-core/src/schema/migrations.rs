/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per track of a known tracklist. A zero or NULL duration means
-- the recording length is unknown.
CREATE TABLE IF NOT EXISTS tracks (
    tracklist_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    duration_ms INTEGER,
    PRIMARY KEY (tracklist_id, position)
) WITHOUT ROWID;
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
