//! SQLite-backed record store.
//!
//! Holds raw item records and calendar events per organization and serves
//! them to [`gather`](crate::gather::gather) through [`WorkSource`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use indoc::indoc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::migrations;
use crate::error::{Result, StoreError};
use crate::gather::{ItemQuery, WorkSource};
use crate::item::{CalendarEvent, EntityKind, WorkItem, WorkRecord};

/// Timestamps are stored in one fixed RFC 3339 shape so text comparison
/// orders them correctly.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// The JSON document accepted by [`SqliteStore::import_json`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportDocument {
    #[serde(alias = "organizationId")]
    pub organization_id: String,
    #[serde(default)]
    pub items: Vec<WorkRecord>,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub organization_id: String,
    pub items_imported: usize,
    pub items_skipped: usize,
    pub events_imported: usize,
}

/// SQLite record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the store at `path` and apply migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store connection lock poisoned".into()))
    }

    /// Insert or replace one item record.
    pub fn upsert_record(&self, organization_id: &str, record: &WorkRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        write_record(&conn, organization_id, record)
    }

    /// Insert or replace one calendar event.
    pub fn upsert_event(&self, organization_id: &str, event: &CalendarEvent) -> Result<(), StoreError> {
        let conn = self.lock()?;
        write_event(&conn, organization_id, event)
    }

    /// Import a JSON document of the shape
    /// `{"organizationId": .., "items": [..], "events": [..]}`.
    ///
    /// Item records that cannot be converted are skipped with a warning; the
    /// rest are normalized and written in one transaction.
    pub fn import_json(&self, json: &str) -> Result<ImportSummary> {
        let doc: ImportDocument = serde_json::from_str(json)?;
        Ok(self.import_document(&doc)?)
    }

    pub fn import_document(&self, doc: &ImportDocument) -> Result<ImportSummary, StoreError> {
        let org = doc.organization_id.trim();
        if org.is_empty() {
            return Err(StoreError::QueryFailed("import document has no organizationId".into()));
        }

        let mut summary = ImportSummary {
            organization_id: org.to_string(),
            ..Default::default()
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for record in &doc.items {
            match WorkItem::try_from(record.clone()) {
                Ok(item) => {
                    write_record(&tx, org, &WorkRecord::from(&item))?;
                    summary.items_imported += 1;
                }
                Err(e) => {
                    warn!(error = %e, "skipping record during import");
                    summary.items_skipped += 1;
                }
            }
        }
        for event in &doc.events {
            write_event(&tx, org, event)?;
            summary.events_imported += 1;
        }

        tx.commit()?;
        debug!(
            organization_id = org,
            items = summary.items_imported,
            skipped = summary.items_skipped,
            events = summary.events_imported,
            "import complete"
        );
        Ok(summary)
    }

    /// Number of stored item records for an organization.
    pub fn count_items(&self, organization_id: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE organization_id = ?1",
            params![organization_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}

fn write_record(conn: &Connection, organization_id: &str, record: &WorkRecord) -> Result<(), StoreError> {
    let assignees = serde_json::to_string(&record.assigned_user_ids)
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
    // Kind is normalized so that kind filters match on read.
    let kind = record
        .kind
        .parse::<EntityKind>()
        .map(|k| k.as_str().to_string())
        .unwrap_or_else(|_| record.kind.trim().to_string());

    conn.execute(
        indoc! {"
            INSERT OR REPLACE INTO items
                (organization_id, kind, id, title, status, created_at, updated_at, assigned_user_ids)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "},
        params![
            organization_id,
            kind,
            record.id,
            record.title,
            record.status,
            record.created_at.map(format_ts),
            record.updated_at.map(format_ts),
            assignees,
        ],
    )?;
    Ok(())
}

fn write_event(conn: &Connection, organization_id: &str, event: &CalendarEvent) -> Result<(), StoreError> {
    conn.execute(
        indoc! {"
            INSERT OR REPLACE INTO calendar_events
                (organization_id, id, title, entity_id, entity_kind, start_date, end_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "},
        params![
            organization_id,
            event.id,
            event.title,
            event.entity_id,
            event.entity_kind.map(|k| k.as_str()),
            format_ts(event.start_date),
            event.end_date.map(format_ts),
        ],
    )?;
    Ok(())
}

impl WorkSource for SqliteStore {
    fn fetch_items(&self, organization_id: &str, query: &ItemQuery) -> Result<Vec<WorkRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(indoc! {"
            SELECT id, kind, title, status, created_at, updated_at, assigned_user_ids
            FROM items
            WHERE organization_id = ?1
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR COALESCE(created_at, updated_at) >= ?3)
            ORDER BY kind, id
        "})?;

        let rows = stmt.query_map(
            params![
                organization_id,
                query.kind.map(|k| k.as_str()),
                query.created_after.map(format_ts),
            ],
            |row| {
                let id: String = row.get(0)?;
                let assignees: String = row.get(6)?;
                let assigned_user_ids = match serde_json::from_str(&assignees) {
                    Ok(ids) => ids,
                    Err(e) => {
                        warn!(item_id = %id, error = %e, "ignoring unreadable assignee list");
                        Vec::new()
                    }
                };
                Ok(WorkRecord {
                    id,
                    kind: row.get(1)?,
                    title: row.get(2)?,
                    status: row.get(3)?,
                    created_at: parse_ts(row.get(4)?),
                    updated_at: parse_ts(row.get(5)?),
                    assigned_user_ids,
                })
            },
        )?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn fetch_events(&self, organization_id: &str) -> Result<Vec<CalendarEvent>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(indoc! {"
            SELECT id, title, entity_id, entity_kind, start_date, end_date
            FROM calendar_events
            WHERE organization_id = ?1
            ORDER BY start_date, id
        "})?;

        let rows = stmt.query_map(params![organization_id], |row| {
            let entity_kind: Option<String> = row.get(3)?;
            let start: Option<String> = row.get(4)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                entity_kind.and_then(|k| k.parse::<EntityKind>().ok()),
                parse_ts(start),
                parse_ts(row.get(5)?),
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, title, entity_id, entity_kind, start_date, end_date) = row?;
            let Some(start_date) = start_date else {
                warn!(event_id = %id, "skipping event with unreadable start date");
                continue;
            };
            events.push(CalendarEvent {
                id,
                title,
                entity_id,
                entity_kind,
                start_date,
                end_date,
            });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn record(id: &str, kind: &str, created: u32) -> WorkRecord {
        WorkRecord {
            id: id.into(),
            kind: kind.into(),
            status: Some("Pitched".into()),
            created_at: Some(ts(created)),
            updated_at: Some(ts(created) + Duration::days(1)),
            assigned_user_ids: vec!["ana".into()],
            ..Default::default()
        }
    }

    #[test]
    fn upsert_and_fetch_by_kind() {
        let store = SqliteStore::open_memory().unwrap();
        store.upsert_record("org", &record("p1", "pitch", 1)).unwrap();
        store.upsert_record("org", &record("s1", "Stories", 2)).unwrap();

        let pitches = store.fetch_items("org", &ItemQuery::of_kind(EntityKind::Pitch)).unwrap();
        assert_eq!(pitches.len(), 1);
        assert_eq!(pitches[0].assigned_user_ids, vec!["ana"]);
        assert_eq!(pitches[0].created_at, Some(ts(1)));

        let stories = store.fetch_items("org", &ItemQuery::of_kind(EntityKind::Story)).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].kind, "story");
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let store = SqliteStore::open_memory().unwrap();
        store.upsert_record("org", &record("p1", "pitch", 1)).unwrap();
        let mut changed = record("p1", "pitch", 1);
        changed.status = Some("Killed".into());
        store.upsert_record("org", &changed).unwrap();

        assert_eq!(store.count_items("org").unwrap(), 1);
        let all = store.fetch_items("org", &ItemQuery::default()).unwrap();
        assert_eq!(all[0].status.as_deref(), Some("Killed"));
    }

    #[test]
    fn corrupt_assignee_list_keeps_record() {
        let store = SqliteStore::open_memory().unwrap();
        store.upsert_record("org", &record("p1", "pitch", 1)).unwrap();
        store
            .lock()
            .unwrap()
            .execute("UPDATE items SET assigned_user_ids = '[\"ana\"' WHERE id = 'p1'", [])
            .unwrap();

        let all = store.fetch_items("org", &ItemQuery::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "p1");
        assert!(all[0].assigned_user_ids.is_empty());
    }

    #[test]
    fn created_after_filter() {
        let store = SqliteStore::open_memory().unwrap();
        store.upsert_record("org", &record("old", "pitch", 1)).unwrap();
        store.upsert_record("org", &record("new", "pitch", 20)).unwrap();

        let recent = store.fetch_items("org", &ItemQuery::created_after(ts(10))).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "new");
    }

    #[test]
    fn organizations_are_isolated() {
        let store = SqliteStore::open_memory().unwrap();
        store.upsert_record("a", &record("p1", "pitch", 1)).unwrap();
        store
            .upsert_event("a", &CalendarEvent::new("e1", ts(3)).linked_to(EntityKind::Pitch, "p1"))
            .unwrap();

        assert!(store.fetch_items("b", &ItemQuery::default()).unwrap().is_empty());
        assert!(store.fetch_events("b").unwrap().is_empty());

        let events = store.fetch_events("a").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entity_kind, Some(EntityKind::Pitch));
        assert_eq!(events[0].start_date, ts(3));
    }

    #[test]
    fn import_skips_unconvertible_records() {
        let store = SqliteStore::open_memory().unwrap();
        let json = r#"{
            "organizationId": "org",
            "items": [
                {"id": "p1", "kind": "pitch", "status": " Pitched ", "createdAt": "2026-03-01T00:00:00Z",
                 "assignedUserIds": ["ana", "ana", " "]},
                {"id": "x1", "kind": "episode", "createdAt": "2026-03-01T00:00:00Z"},
                {"id": "s1", "kind": "story"}
            ],
            "events": [
                {"id": "e1", "entityId": "p1", "entityKind": "pitch", "startDate": "2026-03-05T09:00:00Z"}
            ]
        }"#;

        let summary = store.import_json(json).unwrap();
        assert_eq!(summary.items_imported, 1);
        assert_eq!(summary.items_skipped, 2);
        assert_eq!(summary.events_imported, 1);

        let items = store.fetch_items("org", &ItemQuery::default()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status.as_deref(), Some("Pitched"));
        assert_eq!(items[0].assigned_user_ids, vec!["ana"]);
        assert_eq!(items[0].updated_at, items[0].created_at);
    }

    #[test]
    fn import_requires_organization() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.import_json(r#"{"organizationId": "  ", "items": []}"#).is_err());
        assert!(store.import_json("not json").is_err());
    }

    #[test]
    fn open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("slate.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_record("org", &record("p1", "pitch", 1)).unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.count_items("org").unwrap(), 1);
    }
}
