//! Work items and calendar events.
//!
//! Items arrive from the store as loosely-typed records (see [`WorkRecord`])
//! and are converted once at the boundary into [`WorkItem`]. Everything
//! downstream reads items through the accessors here and never probes
//! kind-specific fields directly.

mod record;
mod status;

pub use record::WorkRecord;
pub use status::{ItemStatus, Phase, PitchStatus, StoryStatus, MISSING_STATUS};

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two kinds of item tracked through the production pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Pitch,
    Story,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Pitch => "pitch",
            EntityKind::Story => "story",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pitch" | "pitches" => Ok(EntityKind::Pitch),
            "story" | "stories" => Ok(EntityKind::Story),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Hashable reference to one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: EntityKind,
    pub id: String,
}

impl ItemRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Fields shared by every item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_user_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pitch {
    #[serde(flatten)]
    pub meta: ItemMeta,
    pub status: PitchStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(flatten)]
    pub meta: ItemMeta,
    pub status: StoryStatus,
}

/// A production-workflow item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkItem {
    Pitch(Pitch),
    Story(Story),
}

impl WorkItem {
    /// Create a pitch with no assignees.
    pub fn pitch(
        id: impl Into<String>,
        status: PitchStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        WorkItem::Pitch(Pitch {
            meta: ItemMeta::new(id, created_at, updated_at),
            status,
        })
    }

    /// Create a story with no assignees.
    pub fn story(
        id: impl Into<String>,
        status: StoryStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        WorkItem::Story(Story {
            meta: ItemMeta::new(id, created_at, updated_at),
            status,
        })
    }

    /// Replace the assignee set. Blank ids are dropped; duplicates collapse.
    pub fn with_assignees<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta_mut().assigned_user_ids = normalize_assignees(users);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta_mut().title = Some(title.into());
        self
    }

    pub fn meta(&self) -> &ItemMeta {
        match self {
            WorkItem::Pitch(p) => &p.meta,
            WorkItem::Story(s) => &s.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        match self {
            WorkItem::Pitch(p) => &mut p.meta,
            WorkItem::Story(s) => &mut s.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            WorkItem::Pitch(_) => EntityKind::Pitch,
            WorkItem::Story(_) => EntityKind::Story,
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef::new(self.kind(), self.id())
    }

    pub fn title(&self) -> Option<&str> {
        self.meta().title.as_deref()
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            WorkItem::Pitch(p) => ItemStatus::Pitch(p.status.clone()),
            WorkItem::Story(s) => ItemStatus::Story(s.status.clone()),
        }
    }

    pub fn status_label(&self) -> &str {
        match self {
            WorkItem::Pitch(p) => p.status.label(),
            WorkItem::Story(s) => s.status.label(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            WorkItem::Pitch(p) => p.status.phase(),
            WorkItem::Story(s) => s.status.phase(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            WorkItem::Pitch(p) => p.status.is_complete(),
            WorkItem::Story(s) => s.status.is_complete(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            WorkItem::Pitch(p) => p.status.is_active(),
            WorkItem::Story(s) => s.status.is_active(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            WorkItem::Pitch(p) => p.status.is_success(),
            WorkItem::Story(s) => s.status.is_success(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.meta().created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.meta().updated_at
    }

    pub fn assignees(&self) -> &BTreeSet<String> {
        &self.meta().assigned_user_ids
    }

    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.meta().assigned_user_ids.contains(user_id)
    }

    /// Seconds between creation and the last update, clamped at zero.
    pub fn age_at_update_secs(&self) -> i64 {
        (self.updated_at() - self.created_at()).num_seconds().max(0)
    }

    /// Seconds since the last update, clamped at zero.
    pub fn secs_since_update(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at()).num_seconds().max(0)
    }
}

impl ItemMeta {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: None,
            created_at,
            updated_at,
            assigned_user_ids: BTreeSet::new(),
        }
    }
}

pub(crate) fn normalize_assignees<I, S>(users: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    users
        .into_iter()
        .map(Into::into)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

/// A calendar event, optionally linked to a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, alias = "entityId")]
    pub entity_id: Option<String>,
    #[serde(default, alias = "entityKind")]
    pub entity_kind: Option<EntityKind>,
    #[serde(alias = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    pub fn new(id: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: None,
            entity_id: None,
            entity_kind: None,
            start_date,
            end_date: None,
        }
    }

    /// Link this event to an item.
    pub fn linked_to(mut self, kind: EntityKind, entity_id: impl Into<String>) -> Self {
        self.entity_kind = Some(kind);
        self.entity_id = Some(entity_id.into());
        self
    }

    /// The item this event is attached to; `None` unless both the entity id
    /// and kind are present.
    pub fn link(&self) -> Option<ItemRef> {
        match (&self.entity_kind, &self.entity_id) {
            (Some(kind), Some(id)) if !id.trim().is_empty() => Some(ItemRef::new(*kind, id.trim())),
            _ => None,
        }
    }
}
