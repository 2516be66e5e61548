//! Concurrent collection of everything the analyzers need for one organization.
//!
//! The four fetches (pitches, stories, calendar events and the historical
//! window) run side by side on the blocking pool. A failing fetch never fails
//! the whole gather: that input becomes empty and the failure is recorded in
//! [`Snapshot::degraded`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::item::{CalendarEvent, EntityKind, WorkItem, WorkRecord};
use crate::schedule::days_before;

/// Filter passed to [`WorkSource::fetch_items`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub kind: Option<EntityKind>,
    pub created_after: Option<DateTime<Utc>>,
}

impl ItemQuery {
    pub fn of_kind(kind: EntityKind) -> Self {
        Self {
            kind: Some(kind),
            created_after: None,
        }
    }

    pub fn created_after(since: DateTime<Utc>) -> Self {
        Self {
            kind: None,
            created_after: Some(since),
        }
    }

    pub fn matches(&self, record: &WorkRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind.parse::<EntityKind>().ok() != Some(kind) {
                return false;
            }
        }
        match (self.created_after, record.created_at.or(record.updated_at)) {
            (Some(since), Some(created)) => created >= since,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// A backing store of raw records, scoped by organization.
///
/// Implementations are blocking; [`gather`] moves every call onto the
/// blocking pool.
pub trait WorkSource: Send + Sync {
    fn fetch_items(&self, organization_id: &str, query: &ItemQuery) -> Result<Vec<WorkRecord>, StoreError>;

    fn fetch_events(&self, organization_id: &str) -> Result<Vec<CalendarEvent>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pitches,
    Stories,
    Events,
    History,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Pitches => "pitches",
            SourceKind::Stories => "stories",
            SourceKind::Events => "events",
            SourceKind::History => "history",
        };
        f.write_str(name)
    }
}

/// A fetch that failed and was replaced by an empty input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub error: String,
}

/// Typed inputs for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub organization_id: String,
    pub pitches: Vec<WorkItem>,
    pub stories: Vec<WorkItem>,
    pub events: Vec<CalendarEvent>,
    /// Items of either kind created inside the lookback window
    pub history: Vec<WorkItem>,
    pub degraded: Vec<SourceFailure>,
    /// Records dropped because they could not be converted
    pub skipped_records: usize,
}

impl Snapshot {
    /// Current pitches followed by current stories.
    pub fn items(&self) -> Vec<WorkItem> {
        self.pitches.iter().chain(self.stories.iter()).cloned().collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn is_degraded_source(&self, source: SourceKind) -> bool {
        self.degraded.iter().any(|f| f.source == source)
    }
}

async fn fetch_items(
    source: Arc<dyn WorkSource>,
    organization_id: String,
    query: ItemQuery,
) -> Result<Vec<WorkRecord>, StoreError> {
    tokio::task::spawn_blocking(move || source.fetch_items(&organization_id, &query)).await?
}

async fn fetch_events(
    source: Arc<dyn WorkSource>,
    organization_id: String,
) -> Result<Vec<CalendarEvent>, StoreError> {
    tokio::task::spawn_blocking(move || source.fetch_events(&organization_id)).await?
}

fn settle<T>(
    kind: SourceKind,
    result: Result<Vec<T>, StoreError>,
    degraded: &mut Vec<SourceFailure>,
) -> Vec<T> {
    match result {
        Ok(values) => values,
        Err(e) => {
            warn!(source = %kind, error = %e, "fetch failed, continuing without it");
            degraded.push(SourceFailure {
                source: kind,
                error: e.to_string(),
            });
            Vec::new()
        }
    }
}

fn convert(records: Vec<WorkRecord>, skipped: &mut usize) -> Vec<WorkItem> {
    records
        .into_iter()
        .filter_map(|record| match WorkItem::try_from(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "skipping unusable record");
                *skipped += 1;
                None
            }
        })
        .collect()
}

/// Fetch every input for `organization_id` concurrently.
pub async fn gather(
    source: Arc<dyn WorkSource>,
    organization_id: &str,
    now: DateTime<Utc>,
    lookback_days: i64,
) -> Snapshot {
    let org = organization_id.to_string();
    let history_query = days_before(now, lookback_days)
        .map_or_else(ItemQuery::default, ItemQuery::created_after);

    let (pitches, stories, events, history) = tokio::join!(
        fetch_items(Arc::clone(&source), org.clone(), ItemQuery::of_kind(EntityKind::Pitch)),
        fetch_items(Arc::clone(&source), org.clone(), ItemQuery::of_kind(EntityKind::Story)),
        fetch_events(Arc::clone(&source), org.clone()),
        fetch_items(Arc::clone(&source), org.clone(), history_query),
    );

    let mut degraded = Vec::new();
    let mut skipped_records = 0usize;

    let pitches = convert(settle(SourceKind::Pitches, pitches, &mut degraded), &mut skipped_records);
    let stories = convert(settle(SourceKind::Stories, stories, &mut degraded), &mut skipped_records);
    let events = settle(SourceKind::Events, events, &mut degraded);
    let history = convert(settle(SourceKind::History, history, &mut degraded), &mut skipped_records);

    debug!(
        organization_id,
        pitches = pitches.len(),
        stories = stories.len(),
        events = events.len(),
        history = history.len(),
        degraded = degraded.len(),
        "snapshot gathered"
    );

    Snapshot {
        organization_id: org,
        pitches,
        stories,
        events,
        history,
        degraded,
        skipped_records,
    }
}

/// In-memory [`WorkSource`] holding the records of a single organization.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    organization_id: String,
    records: Vec<WorkRecord>,
    events: Vec<CalendarEvent>,
}

impl MemorySource {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            ..Default::default()
        }
    }

    pub fn with_items<'a>(mut self, items: impl IntoIterator<Item = &'a WorkItem>) -> Self {
        self.records.extend(items.into_iter().map(WorkRecord::from));
        self
    }

    pub fn with_records(mut self, records: impl IntoIterator<Item = WorkRecord>) -> Self {
        self.records.extend(records);
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = CalendarEvent>) -> Self {
        self.events.extend(events);
        self
    }
}

impl WorkSource for MemorySource {
    fn fetch_items(&self, organization_id: &str, query: &ItemQuery) -> Result<Vec<WorkRecord>, StoreError> {
        if organization_id != self.organization_id {
            return Ok(Vec::new());
        }
        Ok(self.records.iter().filter(|r| query.matches(r)).cloned().collect())
    }

    fn fetch_events(&self, organization_id: &str) -> Result<Vec<CalendarEvent>, StoreError> {
        if organization_id != self.organization_id {
            return Ok(Vec::new());
        }
        Ok(self.events.clone())
    }
}
