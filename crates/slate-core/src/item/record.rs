//! Untyped store records and their conversion into [`WorkItem`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::MISSING_STATUS;
use super::{normalize_assignees, EntityKind, ItemMeta, Pitch, PitchStatus, Story, StoryStatus, WorkItem};
use crate::error::ValidationError;

/// A work item as the store hands it over: every field but the id and kind
/// may be missing, and the assignee list may contain duplicates or blanks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "assignedUserIds")]
    pub assigned_user_ids: Vec<String>,
}

impl TryFrom<WorkRecord> for WorkItem {
    type Error = ValidationError;

    fn try_from(record: WorkRecord) -> Result<Self, Self::Error> {
        let id = record.id.trim().to_string();
        if id.is_empty() {
            return Err(ValidationError::MissingId);
        }

        let kind: EntityKind = record
            .kind
            .parse()
            .map_err(|_| ValidationError::UnknownKind {
                id: id.clone(),
                kind: record.kind.clone(),
            })?;

        let (created_at, updated_at) = match (record.created_at, record.updated_at) {
            (Some(c), Some(u)) => (c, u),
            (Some(c), None) => (c, c),
            (None, Some(u)) => (u, u),
            (None, None) => return Err(ValidationError::MissingTimestamps { id }),
        };

        let status = record
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(MISSING_STATUS);

        let meta = ItemMeta {
            id,
            title: record.title.filter(|t| !t.trim().is_empty()),
            created_at,
            updated_at,
            assigned_user_ids: normalize_assignees(record.assigned_user_ids),
        };

        Ok(match kind {
            EntityKind::Pitch => WorkItem::Pitch(Pitch {
                meta,
                status: PitchStatus::parse(status),
            }),
            EntityKind::Story => WorkItem::Story(Story {
                meta,
                status: StoryStatus::parse(status),
            }),
        })
    }
}

impl From<&WorkItem> for WorkRecord {
    fn from(item: &WorkItem) -> Self {
        WorkRecord {
            id: item.id().to_string(),
            kind: item.kind().to_string(),
            title: item.title().map(str::to_string),
            status: Some(item.status_label().to_string()),
            created_at: Some(item.created_at()),
            updated_at: Some(item.updated_at()),
            assigned_user_ids: item.assignees().iter().cloned().collect(),
        }
    }
}
