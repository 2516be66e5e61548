//! Integration tests for the full analysis pipeline.
//!
//! Feeds records through gather, boundary conversion and every analyzer,
//! checking the worked scenarios end to end.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use slate_core::alerts::Severity;
use slate_core::error::StoreError;
use slate_core::schedule::OverdueReason;
use slate_core::workload::{WorkloadLevel, WorkloadScore};
use slate_core::{
    gather, AlertType, CalendarEvent, EntityKind, IntelligenceEngine, ItemQuery, ItemStatus,
    MemorySource, PitchStatus, SourceKind, StoryStatus, WorkItem, WorkRecord, WorkSource,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 15, 0, 0).unwrap()
}

fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

#[tokio::test]
async fn test_linked_event_in_past_is_overdue_by_deadline() {
    let story = WorkItem::story("s1", StoryStatus::V1Edit, days_ago(30), days_ago(1)).with_assignees(["ana"]);
    let source = MemorySource::new("org")
        .with_items([&story])
        .with_events([CalendarEvent::new("e1", days_ago(3)).linked_to(EntityKind::Story, "s1")]);

    let snapshot = gather(Arc::new(source), "org", now(), 90).await;
    let report = IntelligenceEngine::new().analyze(&snapshot, now(), None);

    assert_eq!(report.schedule.overdue_items.len(), 1);
    let overdue = &report.schedule.overdue_items[0];
    assert_eq!(overdue.days_overdue, 3);
    assert!(matches!(overdue.reason, OverdueReason::Deadline { .. }));
    assert_eq!(report.alerts[0].alert_type, AlertType::Overdue);
    assert_eq!(report.alerts[0].severity, Severity::Medium);
}

#[tokio::test]
async fn test_stale_pitch_is_overdue_by_staleness() {
    let pitch = WorkItem::pitch("p1", PitchStatus::Pitched, days_ago(40), days_ago(20));
    let source = MemorySource::new("org").with_items([&pitch]);

    let snapshot = gather(Arc::new(source), "org", now(), 90).await;
    let report = IntelligenceEngine::new().analyze(&snapshot, now(), None);

    let overdue = &report.schedule.overdue_items[0];
    assert_eq!(overdue.days_overdue, 6);
    assert!(matches!(overdue.reason, OverdueReason::Stale { .. }));
}

#[test]
fn test_workload_example_scores_ninety() {
    let score = WorkloadScore::compute(10, 3, 2);
    assert_eq!((score.items_score, score.overdue_score, score.at_risk_score), (50, 30, 10));
    assert_eq!(score.total, 90);
}

#[tokio::test]
async fn test_heavy_assignee_is_overloaded_with_rebalancing() {
    let mut items: Vec<WorkItem> = (0..10)
        .map(|i| {
            WorkItem::story(format!("s{i}"), StoryStatus::Shooting, days_ago(20), days_ago(1))
                .with_assignees(["ana"])
        })
        .collect();
    items.push(WorkItem::story("light", StoryStatus::Shooting, days_ago(5), days_ago(1)).with_assignees(["ben"]));

    let mut events: Vec<CalendarEvent> = (0..3)
        .map(|i| CalendarEvent::new(format!("late{i}"), days_ago(2 + i)).linked_to(EntityKind::Story, format!("s{i}")))
        .collect();
    events.extend((3..5).map(|i| {
        CalendarEvent::new(format!("soon{i}"), now() + Duration::days(i)).linked_to(EntityKind::Story, format!("s{i}"))
    }));

    let source = MemorySource::new("org").with_items(&items).with_events(events);
    let snapshot = gather(Arc::new(source), "org", now(), 90).await;
    let report = IntelligenceEngine::new().analyze(&snapshot, now(), None);

    let ana = &report.workload.users[0];
    assert_eq!(ana.user_id, "ana");
    assert_eq!((ana.total_items, ana.overdue_items, ana.at_risk_items), (10, 3, 2));
    assert_eq!(ana.workload_score, 90);
    assert_eq!(ana.level, WorkloadLevel::Overloaded);

    let suggestion = &report.workload.rebalancing[0];
    assert_eq!(suggestion.from_user, "ana");
    assert_eq!(suggestion.to_user, "ben");
    assert_eq!(suggestion.item.id, "s2", "most overdue item moves first");
}

#[tokio::test]
async fn test_edit_bottleneck_raises_high_alert() {
    let items: Vec<WorkItem> = (0..4)
        .map(|i| WorkItem::story(format!("e{i}"), StoryStatus::V2Edit, days_ago(30), days_ago(10)))
        .collect();
    let source = MemorySource::new("org").with_items(&items);

    let snapshot = gather(Arc::new(source), "org", now(), 90).await;
    let report = IntelligenceEngine::new().analyze(&snapshot, now(), None);

    assert_eq!(report.workflow.bottlenecks.len(), 1);
    let alert = report
        .alerts
        .iter()
        .find(|a| a.alert_type == AlertType::Bottleneck)
        .expect("bottleneck alert");
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.items.len(), 4);

    // Every open edit is predicted to get stuck.
    assert!(report.predictions.iter().all(|p| p.likely_to_get_stuck));
}

#[tokio::test]
async fn test_baseline_needs_minimum_samples() {
    let items = vec![
        WorkItem::story("a1", StoryStatus::ARoll, days_ago(20), days_ago(15)),
        WorkItem::story("a2", StoryStatus::ARoll, days_ago(20), days_ago(12)),
    ];
    let source = MemorySource::new("org").with_items(&items);

    let snapshot = gather(Arc::new(source), "org", now(), 90).await;
    let report = IntelligenceEngine::new().analyze(&snapshot, now(), None);

    let a_roll = ItemStatus::Story(StoryStatus::ARoll);
    assert_eq!(report.baseline.status_frequency[&a_roll], 2);
    assert!(report.baseline.average_for(&a_roll).is_none());
}

#[tokio::test]
async fn test_shared_assignee_same_day_conflict() {
    let items = vec![
        WorkItem::story("s1", StoryStatus::Scheduled, days_ago(5), days_ago(1)).with_assignees(["ana"]),
        WorkItem::story("s2", StoryStatus::Scheduled, days_ago(5), days_ago(1)).with_assignees(["ana"]),
        WorkItem::story("s3", StoryStatus::Scheduled, days_ago(5), days_ago(1)).with_assignees(["ana"]),
    ];
    let shoot_day = Utc.with_ymd_and_hms(2026, 10, 4, 9, 0, 0).unwrap();
    let events = vec![
        CalendarEvent::new("e1", shoot_day).linked_to(EntityKind::Story, "s1"),
        CalendarEvent::new("e2", shoot_day + Duration::hours(5)).linked_to(EntityKind::Story, "s2"),
        CalendarEvent::new("e3", shoot_day + Duration::days(1)).linked_to(EntityKind::Story, "s3"),
    ];
    let source = MemorySource::new("org").with_items(&items).with_events(events);

    let snapshot = gather(Arc::new(source), "org", now(), 90).await;
    let report = IntelligenceEngine::new().analyze(&snapshot, now(), None);

    assert_eq!(report.schedule.conflicts.len(), 1);
    let conflict = &report.schedule.conflicts[0];
    assert_eq!(conflict.user_id, "ana");
    assert_eq!(conflict.items.len(), 2);
    assert!(report.alerts.iter().any(|a| a.alert_type == AlertType::Conflict && a.user_id.as_deref() == Some("ana")));
}

struct FlakyCalendar(MemorySource);

impl WorkSource for FlakyCalendar {
    fn fetch_items(&self, org: &str, query: &ItemQuery) -> Result<Vec<WorkRecord>, StoreError> {
        self.0.fetch_items(org, query)
    }

    fn fetch_events(&self, _org: &str) -> Result<Vec<CalendarEvent>, StoreError> {
        Err(StoreError::QueryFailed("calendar index missing".into()))
    }
}

#[tokio::test]
async fn test_failed_calendar_still_yields_report() {
    let pitch = WorkItem::pitch("p1", PitchStatus::Researching, days_ago(40), days_ago(30));
    let source = MemorySource::new("org")
        .with_items([&pitch])
        .with_events([CalendarEvent::new("e1", days_ago(1)).linked_to(EntityKind::Pitch, "p1")]);

    let snapshot = gather(Arc::new(FlakyCalendar(source)), "org", now(), 90).await;
    assert!(snapshot.is_degraded_source(SourceKind::Events));

    let report = IntelligenceEngine::new().analyze(&snapshot, now(), None);
    // Without the event the staleness rule applies instead.
    assert_eq!(report.schedule.overdue_items.len(), 1);
    assert!(matches!(report.schedule.overdue_items[0].reason, OverdueReason::Stale { .. }));
    assert_eq!(report.degraded.len(), 1);
}

#[tokio::test]
async fn test_messy_records_are_normalized() {
    let records = vec![
        WorkRecord {
            id: "p1".into(),
            kind: "Pitches".into(),
            status: Some("  Needs Research ".into()),
            updated_at: Some(days_ago(2)),
            assigned_user_ids: vec!["ana".into(), "".into(), "ana".into()],
            ..Default::default()
        },
        WorkRecord {
            id: "s1".into(),
            kind: "story".into(),
            created_at: Some(days_ago(3)),
            ..Default::default()
        },
    ];
    let source = MemorySource::new("org").with_records(records);
    let snapshot = gather(Arc::new(source), "org", now(), 90).await;

    let pitch = &snapshot.pitches[0];
    assert_eq!(pitch.status(), ItemStatus::Pitch(PitchStatus::NeedsResearch));
    assert_eq!(pitch.assignees().len(), 1);
    assert_eq!(pitch.created_at(), pitch.updated_at());

    let story = &snapshot.stories[0];
    assert_eq!(story.status_label(), "Unknown");
    assert!(!story.is_complete());
}
