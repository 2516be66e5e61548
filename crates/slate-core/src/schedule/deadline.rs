//! Deadline lookup and whole-day arithmetic.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::item::{CalendarEvent, ItemRef};

pub const SECS_PER_DAY: i64 = 86_400;

/// Earliest linked event start per item.
#[derive(Debug, Clone, Default)]
pub struct DeadlineIndex {
    deadlines: HashMap<ItemRef, DateTime<Utc>>,
}

impl DeadlineIndex {
    /// Index every linked event; unlinked events are skipped.
    pub fn build(events: &[CalendarEvent]) -> Self {
        let mut deadlines: HashMap<ItemRef, DateTime<Utc>> = HashMap::new();
        for event in events {
            let Some(link) = event.link() else { continue };
            deadlines
                .entry(link)
                .and_modify(|d| *d = (*d).min(event.start_date))
                .or_insert(event.start_date);
        }
        Self { deadlines }
    }

    pub fn deadline_for(&self, item: &ItemRef) -> Option<DateTime<Utc>> {
        self.deadlines.get(item).copied()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

/// Whole days as seconds, saturating at the `i64` bounds.
pub fn days_to_secs(days: i64) -> i64 {
    days.saturating_mul(SECS_PER_DAY)
}

/// `now` moved forward by `days`, or `None` past the representable range.
pub fn days_after(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| now.checked_add_signed(d))
}

/// `now` moved back by `days`, or `None` past the representable range.
pub fn days_before(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| now.checked_sub_signed(d))
}

/// Whole days elapsed since `deadline`, rounded down.
pub fn days_overdue(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - deadline).num_seconds().div_euclid(SECS_PER_DAY)
}

/// Days until `deadline`, rounded up. Negative once the deadline has passed.
pub fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (deadline - now).num_seconds();
    let whole = secs.div_euclid(SECS_PER_DAY);
    if secs.rem_euclid(SECS_PER_DAY) > 0 {
        whole + 1
    } else {
        whole
    }
}
