//! Entity classifier.
//!
//! Maps a status to its canonical phase and completion flag. Pure lookup;
//! unknown statuses classify as [`Phase::Unknown`] and not complete.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::item::{EntityKind, ItemStatus, Phase, WorkItem};

/// Phase and completion flag for one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub phase: Phase,
    pub is_complete: bool,
}

/// Classify a typed status.
pub fn classify(status: &ItemStatus) -> Classification {
    Classification {
        phase: status.phase(),
        is_complete: status.is_complete(),
    }
}

/// Classify a raw status label for the given kind.
pub fn classify_label(kind: EntityKind, label: &str) -> Classification {
    classify(&ItemStatus::parse(kind, label))
}

/// Item counts per phase, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDistribution {
    pub pitch: BTreeMap<Phase, usize>,
    pub story: BTreeMap<Phase, usize>,
}

impl PhaseDistribution {
    /// Count every item into exactly one phase of its kind.
    pub fn from_items(items: &[WorkItem]) -> Self {
        let mut dist = Self::default();
        for item in items {
            let bucket = match item.kind() {
                EntityKind::Pitch => &mut dist.pitch,
                EntityKind::Story => &mut dist.story,
            };
            *bucket.entry(item.phase()).or_insert(0) += 1;
        }
        dist
    }

    pub fn count(&self, kind: EntityKind, phase: Phase) -> usize {
        let bucket = match kind {
            EntityKind::Pitch => &self.pitch,
            EntityKind::Story => &self.story,
        };
        bucket.get(&phase).copied().unwrap_or(0)
    }

    /// Total items counted; always equals the number of items classified.
    pub fn total(&self) -> usize {
        self.pitch.values().sum::<usize>() + self.story.values().sum::<usize>()
    }
}
