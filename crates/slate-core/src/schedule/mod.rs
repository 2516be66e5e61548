//! Schedule analysis over items and their linked calendar events.
//!
//! Produces four views of the same item set:
//! - overdue items, by either the deadline rule or the staleness rule
//! - items whose deadline falls inside the look-ahead window
//! - same-day conflicts per assignee
//! - a timeline of every open item ordered by deadline

mod deadline;

pub use deadline::{
    days_after, days_before, days_overdue, days_to_secs, days_until, DeadlineIndex, SECS_PER_DAY,
};

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::item::{CalendarEvent, ItemRef, Phase, WorkItem};

/// Schedule analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// Look-ahead window for at-risk detection (days)
    pub days_ahead: i64,
    /// Days without an update before an active item counts as overdue
    pub staleness_days: i64,
    /// Restrict every output to items/conflicts involving this user
    pub user_id: Option<String>,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            days_ahead: 7,
            staleness_days: 14,
            user_id: None,
        }
    }
}

/// Which rule marked an item overdue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OverdueReason {
    /// The linked event's start date has passed.
    Deadline { deadline: DateTime<Utc> },
    /// An active item has not been touched for too long.
    Stale { last_updated: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueItem {
    pub item: ItemRef,
    pub title: Option<String>,
    pub status: String,
    pub phase: Phase,
    pub reason: OverdueReason,
    pub days_overdue: i64,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtRiskItem {
    pub item: ItemRef,
    pub title: Option<String>,
    pub status: String,
    pub deadline: DateTime<Utc>,
    pub days_until_deadline: i64,
    pub assignees: Vec<String>,
}

/// One item inside a conflict group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictItem {
    pub item: ItemRef,
    pub title: Option<String>,
    pub status: String,
    pub event_id: String,
    pub start_date: DateTime<Utc>,
}

/// Several items due the same day for the same assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub user_id: String,
    pub date: NaiveDate,
    pub items: Vec<ConflictItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub item: ItemRef,
    pub title: Option<String>,
    pub status: String,
    pub phase: Phase,
    pub deadline: Option<DateTime<Utc>>,
    pub days_until_deadline: Option<i64>,
    pub assignees: Vec<String>,
}

/// Everything the schedule analyzer derives for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSignals {
    pub overdue_items: Vec<OverdueItem>,
    pub at_risk_items: Vec<AtRiskItem>,
    pub conflicts: Vec<ScheduleConflict>,
    pub active_items_timeline: Vec<TimelineEntry>,
}

impl ScheduleSignals {
    /// Overdue entries assigned to `user_id`, most overdue first.
    pub fn overdue_for<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a OverdueItem> + 'a {
        self.overdue_items
            .iter()
            .filter(move |o| o.assignees.iter().any(|a| a == user_id))
    }

    pub fn at_risk_for<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a AtRiskItem> + 'a {
        self.at_risk_items
            .iter()
            .filter(move |o| o.assignees.iter().any(|a| a == user_id))
    }

    pub fn is_empty(&self) -> bool {
        self.overdue_items.is_empty()
            && self.at_risk_items.is_empty()
            && self.conflicts.is_empty()
            && self.active_items_timeline.is_empty()
    }
}

/// Schedule analyzer.
#[derive(Debug, Clone, Default)]
pub struct ScheduleAnalyzer {
    options: ScheduleOptions,
}

impl ScheduleAnalyzer {
    /// Create an analyzer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options.
    pub fn with_options(options: ScheduleOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScheduleOptions {
        &self.options
    }

    /// Run every schedule check against `items` and `events` as of `now`.
    pub fn analyze(
        &self,
        items: &[WorkItem],
        events: &[CalendarEvent],
        now: DateTime<Utc>,
    ) -> ScheduleSignals {
        let scoped: Vec<&WorkItem> = items
            .iter()
            .filter(|item| !item.is_complete())
            .filter(|item| match &self.options.user_id {
                Some(user) => item.is_assigned_to(user),
                None => true,
            })
            .collect();

        let deadlines = DeadlineIndex::build(events);

        let mut overdue_items = Vec::new();
        let mut at_risk_items = Vec::new();
        let mut active_items_timeline = Vec::with_capacity(scoped.len());

        for item in &scoped {
            let deadline = deadlines.deadline_for(&item.item_ref());

            if let Some(entry) = self.check_overdue(item, deadline, now) {
                overdue_items.push(entry);
            }
            if let Some(entry) = self.check_at_risk(item, deadline, now) {
                at_risk_items.push(entry);
            }

            active_items_timeline.push(TimelineEntry {
                item: item.item_ref(),
                title: item.title().map(str::to_string),
                status: item.status_label().to_string(),
                phase: item.phase(),
                deadline,
                days_until_deadline: deadline.map(|d| days_until(d, now)),
                assignees: assignee_list(item),
            });
        }

        let conflicts = self.find_conflicts(&scoped, events);

        overdue_items.sort_by(|a, b| {
            b.days_overdue
                .cmp(&a.days_overdue)
                .then_with(|| a.item.cmp(&b.item))
        });
        at_risk_items.sort_by(|a, b| {
            a.days_until_deadline
                .cmp(&b.days_until_deadline)
                .then_with(|| a.item.cmp(&b.item))
        });
        // Undated items sort last.
        active_items_timeline.sort_by(|a, b| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.item.cmp(&b.item)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.item.cmp(&b.item),
        });

        debug!(
            overdue = overdue_items.len(),
            at_risk = at_risk_items.len(),
            conflicts = conflicts.len(),
            open = active_items_timeline.len(),
            "schedule analysis complete"
        );

        ScheduleSignals {
            overdue_items,
            at_risk_items,
            conflicts,
            active_items_timeline,
        }
    }

    /// Deadline rule first; the staleness rule only runs when the deadline
    /// rule did not fire, so an item is never counted twice.
    fn check_overdue(
        &self,
        item: &WorkItem,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<OverdueItem> {
        let (reason, days) = match deadline {
            Some(d) if d < now => (OverdueReason::Deadline { deadline: d }, days_overdue(d, now)),
            _ => {
                if !item.is_active() {
                    return None;
                }
                let days_since_update = item.secs_since_update(now) / SECS_PER_DAY;
                if days_since_update < self.options.staleness_days {
                    return None;
                }
                (
                    OverdueReason::Stale {
                        last_updated: item.updated_at(),
                    },
                    days_since_update.saturating_sub(self.options.staleness_days),
                )
            }
        };

        Some(OverdueItem {
            item: item.item_ref(),
            title: item.title().map(str::to_string),
            status: item.status_label().to_string(),
            phase: item.phase(),
            reason,
            days_overdue: days,
            assignees: assignee_list(item),
        })
    }

    fn check_at_risk(
        &self,
        item: &WorkItem,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<AtRiskItem> {
        let deadline = deadline?;
        // No horizon means the window reaches past the last representable instant.
        let horizon = days_after(now, self.options.days_ahead);
        if deadline < now || horizon.is_some_and(|h| deadline > h) {
            return None;
        }
        Some(AtRiskItem {
            item: item.item_ref(),
            title: item.title().map(str::to_string),
            status: item.status_label().to_string(),
            deadline,
            days_until_deadline: days_until(deadline, now),
            assignees: assignee_list(item),
        })
    }

    fn find_conflicts(&self, scoped: &[&WorkItem], events: &[CalendarEvent]) -> Vec<ScheduleConflict> {
        let by_ref: BTreeMap<ItemRef, &WorkItem> =
            scoped.iter().map(|item| (item.item_ref(), *item)).collect();

        let mut groups: BTreeMap<(String, NaiveDate), BTreeMap<ItemRef, ConflictItem>> =
            BTreeMap::new();

        for event in events {
            let Some(link) = event.link() else { continue };
            let Some(item) = by_ref.get(&link) else { continue };
            let day = event.start_date.date_naive();

            for user in item.assignees() {
                if let Some(only) = &self.options.user_id {
                    if user != only {
                        continue;
                    }
                }
                let group = groups.entry((user.clone(), day)).or_default();
                // Keep the first event seen per item; one item is one entry.
                group.entry(link.clone()).or_insert_with(|| ConflictItem {
                    item: link.clone(),
                    title: item.title().map(str::to_string),
                    status: item.status_label().to_string(),
                    event_id: event.id.clone(),
                    start_date: event.start_date,
                });
            }
        }

        let mut conflicts: Vec<ScheduleConflict> = groups
            .into_iter()
            .filter(|(_, items)| items.len() > 1)
            .map(|((user_id, date), items)| ScheduleConflict {
                user_id,
                date,
                items: items.into_values().collect(),
            })
            .collect();

        conflicts.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.user_id.cmp(&b.user_id)));
        conflicts
    }
}

fn assignee_list(item: &WorkItem) -> Vec<String> {
    item.assignees().iter().cloned().collect()
}
