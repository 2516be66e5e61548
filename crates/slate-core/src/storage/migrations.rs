//! Database schema migrations for the record store.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};
use tracing::warn;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
    "})
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: item and calendar event tables.
///
/// Items are keyed by (organization, kind, id). Assignees are stored as a
/// JSON array of user ids. Timestamps are RFC 3339 text and may be NULL, in
/// which case the record is converted (or skipped) on read.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS items (
            organization_id   TEXT NOT NULL,
            kind              TEXT NOT NULL,
            id                TEXT NOT NULL,
            title             TEXT,
            status            TEXT,
            created_at        TEXT,
            updated_at        TEXT,
            assigned_user_ids TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (organization_id, kind, id)
        );

        CREATE TABLE IF NOT EXISTS calendar_events (
            organization_id TEXT NOT NULL,
            id              TEXT NOT NULL,
            title           TEXT,
            entity_id       TEXT,
            entity_kind     TEXT,
            start_date      TEXT NOT NULL,
            end_date        TEXT,
            PRIMARY KEY (organization_id, id)
        );
    "})?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: indexes for the history window and event linkage.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE INDEX IF NOT EXISTS idx_items_org_created_at
            ON items(organization_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_events_org_entity
            ON calendar_events(organization_id, entity_kind, entity_id);
    "})?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
