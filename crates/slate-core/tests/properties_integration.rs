//! Property tests for analyzer invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use slate_core::schedule::ScheduleAnalyzer;
use slate_core::workload::WorkloadScore;
use slate_core::{
    CalendarEvent, EntityKind, PhaseDistribution, PitchStatus, StoryStatus, WorkItem,
    WorkflowAnalyzer,
};

const PITCH_LABELS: &[&str] = &[
    "Idea",
    "Pitched",
    "Needs Research",
    "Researching",
    "Pursue Clearance",
    "Clearance In Progress",
    "Ready for Script",
    "Do Not Pursue Clearance",
    "Killed",
    "On Hold",
];

const STORY_LABELS: &[&str] = &[
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
    "Archived",
];

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap()
}

fn arb_item() -> impl Strategy<Value = WorkItem> {
    (
        any::<bool>(),
        0usize..12,
        0i64..120,
        0i64..60,
        prop::collection::vec(prop::sample::select(vec!["ana", "ben", "cy"]), 0..3),
        0u32..10_000,
    )
        .prop_map(|(is_pitch, label, created_ago, updated_ago, users, n)| {
            let updated_ago = updated_ago.min(created_ago);
            let created = now() - Duration::days(created_ago);
            let updated = now() - Duration::days(updated_ago);
            let item = if is_pitch {
                let status = PitchStatus::parse(PITCH_LABELS[label % PITCH_LABELS.len()]);
                WorkItem::pitch(format!("p{n}"), status, created, updated)
            } else {
                let status = StoryStatus::parse(STORY_LABELS[label % STORY_LABELS.len()]);
                WorkItem::story(format!("s{n}"), status, created, updated)
            };
            item.with_assignees(users)
        })
}

fn dedupe(items: Vec<WorkItem>) -> Vec<WorkItem> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.item_ref())).collect()
}

proptest! {
    #[test]
    fn phase_distribution_partitions_items(items in prop::collection::vec(arb_item(), 0..60)) {
        let dist = PhaseDistribution::from_items(&items);
        prop_assert_eq!(dist.total(), items.len());
    }

    #[test]
    fn workload_score_bounded(total in 0usize..1000, overdue in 0usize..1000, at_risk in 0usize..1000) {
        let score = WorkloadScore::compute(total, overdue, at_risk);
        prop_assert!(score.total <= 100);
        prop_assert_eq!(score.total, score.items_score + score.overdue_score + score.at_risk_score);
    }

    #[test]
    fn workload_score_monotonic(total in 0usize..50, overdue in 0usize..50, at_risk in 0usize..50) {
        let base = WorkloadScore::compute(total, overdue, at_risk).total;
        prop_assert!(WorkloadScore::compute(total, overdue + 1, at_risk).total >= base);
        prop_assert!(WorkloadScore::compute(total, overdue, at_risk + 1).total >= base);
        prop_assert!(WorkloadScore::compute(total + 1, overdue, at_risk).total >= base);
    }

    #[test]
    fn items_overdue_by_at_most_one_rule(
        items in prop::collection::vec(arb_item(), 0..40),
        offsets in prop::collection::vec(-20i64..20, 0..40),
    ) {
        let items = dedupe(items);
        let events: Vec<CalendarEvent> = items
            .iter()
            .zip(offsets.iter())
            .enumerate()
            .map(|(i, (item, days))| {
                CalendarEvent::new(format!("e{i}"), now() + Duration::days(*days))
                    .linked_to(item.kind(), item.id())
            })
            .collect();

        let signals = ScheduleAnalyzer::new().analyze(&items, &events, now());
        let mut seen = std::collections::HashSet::new();
        for overdue in &signals.overdue_items {
            prop_assert!(seen.insert(overdue.item.clone()), "{} listed twice", overdue.item);
            prop_assert!(overdue.days_overdue >= 0);
        }
        for at_risk in &signals.at_risk_items {
            prop_assert!(at_risk.days_until_deadline >= 0);
        }
    }

    #[test]
    fn bottlenecks_need_two_open_items_over_a_week(items in prop::collection::vec(arb_item(), 0..60)) {
        let items = dedupe(items);
        for b in WorkflowAnalyzer::new().find_bottlenecks(&items, now()) {
            prop_assert!(b.item_count >= 2);
            prop_assert!(b.average_wait_days() > 7.0);
            prop_assert!(!b.status.is_complete());
        }
    }
}

#[test]
fn same_assignee_different_days_never_conflict() {
    let a = WorkItem::story("s1", StoryStatus::Shooting, now(), now()).with_assignees(["ana"]);
    let b = WorkItem::story("s2", StoryStatus::Shooting, now(), now()).with_assignees(["ana"]);
    let events = vec![
        CalendarEvent::new("e1", now() + Duration::hours(30)).linked_to(EntityKind::Story, "s1"),
        CalendarEvent::new("e2", now() + Duration::hours(60)).linked_to(EntityKind::Story, "s2"),
    ];
    let signals = ScheduleAnalyzer::new().analyze(&[a, b], &events, now());
    assert!(signals.conflicts.is_empty());
}
