//! Per-kind status taxonomies.
//!
//! Each kind has a closed set of known statuses plus an `Other` case that
//! carries any label the store hands us that we don't recognize. Parsing is
//! infallible: unknown labels stay visible instead of being dropped.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::EntityKind;

/// Label used when a record carries no status at all.
pub const MISSING_STATUS: &str = "Unknown";

/// Canonical production phase.
///
/// Several fine-grained statuses map onto one phase. Ordering follows the
/// pipeline so distributions print in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Development,
    Research,
    Clearance,
    #[serde(rename = "Pre-Production")]
    PreProduction,
    #[serde(rename = "Script Development")]
    ScriptDevelopment,
    Production,
    #[serde(rename = "Post-Production")]
    PostProduction,
    Delivered,
    Closed,
    Unknown,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Development => "Development",
            Phase::Research => "Research",
            Phase::Clearance => "Clearance",
            Phase::PreProduction => "Pre-Production",
            Phase::ScriptDevelopment => "Script Development",
            Phase::Production => "Production",
            Phase::PostProduction => "Post-Production",
            Phase::Delivered => "Delivered",
            Phase::Closed => "Closed",
            Phase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status of a pitch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PitchStatus {
    Idea,
    Pitched,
    NeedsResearch,
    Researching,
    PursueClearance,
    ClearanceInProgress,
    ReadyForScript,
    DoNotPursueClearance,
    Killed,
    Other(String),
}

impl PitchStatus {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "Idea" => Self::Idea,
            "Pitched" => Self::Pitched,
            "Needs Research" => Self::NeedsResearch,
            "Researching" => Self::Researching,
            "Pursue Clearance" => Self::PursueClearance,
            "Clearance In Progress" => Self::ClearanceInProgress,
            "Ready for Script" => Self::ReadyForScript,
            "Do Not Pursue Clearance" => Self::DoNotPursueClearance,
            "Killed" => Self::Killed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Idea => "Idea",
            Self::Pitched => "Pitched",
            Self::NeedsResearch => "Needs Research",
            Self::Researching => "Researching",
            Self::PursueClearance => "Pursue Clearance",
            Self::ClearanceInProgress => "Clearance In Progress",
            Self::ReadyForScript => "Ready for Script",
            Self::DoNotPursueClearance => "Do Not Pursue Clearance",
            Self::Killed => "Killed",
            Self::Other(label) => label,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Idea | Self::Pitched => Phase::Development,
            Self::NeedsResearch | Self::Researching => Phase::Research,
            Self::PursueClearance | Self::ClearanceInProgress => Phase::Clearance,
            Self::ReadyForScript => Phase::ScriptDevelopment,
            Self::DoNotPursueClearance | Self::Killed => Phase::Closed,
            Self::Other(_) => Phase::Unknown,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            Self::Killed | Self::DoNotPursueClearance | Self::ReadyForScript
        )
    }

    /// Statuses where a pitch is expected to keep moving; the staleness
    /// overdue rule only applies to these.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Pitched
                | Self::NeedsResearch
                | Self::Researching
                | Self::PursueClearance
                | Self::ClearanceInProgress
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::ReadyForScript)
    }
}

/// Status of a story.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StoryStatus {
    Assigned,
    ScriptWriting,
    ScriptReview,
    Scheduled,
    Shooting,
    ARoll,
    V1Edit,
    V2Edit,
    FinalReview,
    Assembled,
    Killed,
    Other(String),
}

impl StoryStatus {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "Assigned" => Self::Assigned,
            "Script Writing" => Self::ScriptWriting,
            "Script Review" => Self::ScriptReview,
            "Scheduled" => Self::Scheduled,
            "Shooting" => Self::Shooting,
            "A Roll" => Self::ARoll,
            "v1 Edit" => Self::V1Edit,
            "v2 Edit" => Self::V2Edit,
            "Final Review" => Self::FinalReview,
            "Assembled" => Self::Assembled,
            "Killed" => Self::Killed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Assigned => "Assigned",
            Self::ScriptWriting => "Script Writing",
            Self::ScriptReview => "Script Review",
            Self::Scheduled => "Scheduled",
            Self::Shooting => "Shooting",
            Self::ARoll => "A Roll",
            Self::V1Edit => "v1 Edit",
            Self::V2Edit => "v2 Edit",
            Self::FinalReview => "Final Review",
            Self::Assembled => "Assembled",
            Self::Killed => "Killed",
            Self::Other(label) => label,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Assigned => Phase::PreProduction,
            Self::ScriptWriting | Self::ScriptReview => Phase::ScriptDevelopment,
            Self::Scheduled | Self::Shooting => Phase::Production,
            Self::ARoll | Self::V1Edit | Self::V2Edit | Self::FinalReview => {
                Phase::PostProduction
            }
            Self::Assembled => Phase::Delivered,
            Self::Killed => Phase::Closed,
            Self::Other(_) => Phase::Unknown,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Assembled | Self::Killed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_complete() && !matches!(self, Self::Assigned | Self::Other(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Assembled)
    }
}

/// A status qualified by its entity kind.
///
/// This is the composite key for every per-status aggregation. It renders as
/// `"<kind>/<label>"` so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemStatus {
    Pitch(PitchStatus),
    Story(StoryStatus),
}

impl ItemStatus {
    pub fn parse(kind: EntityKind, label: &str) -> Self {
        match kind {
            EntityKind::Pitch => Self::Pitch(PitchStatus::parse(label)),
            EntityKind::Story => Self::Story(StoryStatus::parse(label)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Pitch(_) => EntityKind::Pitch,
            Self::Story(_) => EntityKind::Story,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Pitch(s) => s.label(),
            Self::Story(s) => s.label(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Pitch(s) => s.phase(),
            Self::Story(s) => s.phase(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Pitch(s) => s.is_complete(),
            Self::Story(s) => s.is_complete(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Pitch(s) => s.is_active(),
            Self::Story(s) => s.is_active(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Pitch(s) => s.is_success(),
            Self::Story(s) => s.is_success(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(
            self,
            Self::Pitch(PitchStatus::Other(_)) | Self::Story(StoryStatus::Other(_))
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.label())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, label) = s
            .split_once('/')
            .ok_or_else(|| format!("expected '<kind>/<status>', got '{s}'"))?;
        let kind: EntityKind = kind.parse()?;
        Ok(Self::parse(kind, label))
    }
}

impl Serialize for ItemStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl From<String> for PitchStatus {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<PitchStatus> for String {
    fn from(status: PitchStatus) -> Self {
        status.label().to_string()
    }
}

impl From<String> for StoryStatus {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<StoryStatus> for String {
    fn from(status: StoryStatus) -> Self {
        status.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_labels_roundtrip() {
        for label in [
            "Idea",
            "Pitched",
            "Needs Research",
            "Researching",
            "Pursue Clearance",
            "Clearance In Progress",
            "Ready for Script",
            "Do Not Pursue Clearance",
            "Killed",
        ] {
            let status = PitchStatus::parse(label);
            assert!(!matches!(status, PitchStatus::Other(_)), "{label} unmapped");
            assert_eq!(status.label(), label);
        }
    }

    #[test]
    fn story_labels_roundtrip() {
        for label in [
            "Assigned",
            "Script Writing",
            "Script Review",
            "Scheduled",
            "Shooting",
            "A Roll",
            "v1 Edit",
            "v2 Edit",
            "Final Review",
            "Assembled",
            "Killed",
        ] {
            let status = StoryStatus::parse(label);
            assert!(!matches!(status, StoryStatus::Other(_)), "{label} unmapped");
            assert_eq!(status.label(), label);
        }
    }

    #[test]
    fn unknown_status_keeps_label() {
        let status = StoryStatus::parse("Color Grade");
        assert_eq!(status, StoryStatus::Other("Color Grade".to_string()));
        assert_eq!(status.phase(), Phase::Unknown);
        assert!(!status.is_complete());
        assert!(!status.is_active());
    }

    #[test]
    fn terminal_statuses() {
        assert!(PitchStatus::Killed.is_complete());
        assert!(PitchStatus::DoNotPursueClearance.is_complete());
        assert!(PitchStatus::ReadyForScript.is_complete());
        assert!(!PitchStatus::Pitched.is_complete());
        assert!(StoryStatus::Assembled.is_complete());
        assert!(StoryStatus::Killed.is_complete());
        assert!(!StoryStatus::V2Edit.is_complete());
    }

    #[test]
    fn active_excludes_terminal_and_idle() {
        assert!(PitchStatus::Pitched.is_active());
        assert!(!PitchStatus::Idea.is_active());
        assert!(!PitchStatus::Killed.is_active());
        assert!(StoryStatus::ARoll.is_active());
        assert!(!StoryStatus::Assigned.is_active());
        assert!(!StoryStatus::Assembled.is_active());
    }

    #[test]
    fn item_status_string_form() {
        let status = ItemStatus::Story(StoryStatus::V2Edit);
        assert_eq!(status.to_string(), "story/v2 Edit");
        let parsed: ItemStatus = "story/v2 Edit".parse().unwrap();
        assert_eq!(parsed, status);
        assert!("v2 Edit".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn item_status_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(ItemStatus::Pitch(PitchStatus::Pitched), 3usize);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"pitch/Pitched":3}"#);
        let back: std::collections::BTreeMap<ItemStatus, usize> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
