//! Live workflow metrics: phase distribution, bottlenecks and velocity.
//!
//! Everything here is computed from the current item snapshot alone. For
//! longer-window baselines see [`crate::history`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::PhaseDistribution;
use crate::item::{EntityKind, ItemRef, ItemStatus, Phase, WorkItem};
use crate::schedule::{days_to_secs, SECS_PER_DAY};

/// Workflow analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOptions {
    /// Minimum open items sharing a status before it can be a bottleneck
    pub bottleneck_min_items: usize,
    /// Mean wait (days) a status must exceed to be a bottleneck
    pub bottleneck_wait_days: i64,
    /// Sample items attached to each bottleneck
    pub sample_limit: usize,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            bottleneck_min_items: 2,
            bottleneck_wait_days: 7,
            sample_limit: 10,
        }
    }
}

/// A status where open items pile up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub status: ItemStatus,
    pub phase: Phase,
    pub item_count: usize,
    /// Mean seconds since last update across the group
    pub average_wait_secs: f64,
    pub sample_items: Vec<ItemRef>,
}

impl Bottleneck {
    pub fn kind(&self) -> EntityKind {
        self.status.kind()
    }

    pub fn average_wait_days(&self) -> f64 {
        self.average_wait_secs / SECS_PER_DAY as f64
    }
}

/// Throughput numbers for a set of items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub completed: usize,
    pub in_progress: usize,
    /// completed / (completed + in_progress); 0 when both are 0
    pub completion_rate: f64,
    /// Mean seconds from creation to last update over completed items
    pub average_time_to_complete_secs: f64,
}

impl Velocity {
    fn from_items<'a>(items: impl IntoIterator<Item = &'a WorkItem>) -> Self {
        let mut completed = 0usize;
        let mut in_progress = 0usize;
        let mut total_secs = 0i64;

        for item in items {
            if item.is_complete() {
                completed += 1;
                total_secs += item.age_at_update_secs();
            } else {
                in_progress += 1;
            }
        }

        let denominator = completed + in_progress;
        let completion_rate = if denominator > 0 {
            completed as f64 / denominator as f64
        } else {
            0.0
        };
        let average_time_to_complete_secs = if completed > 0 {
            total_secs as f64 / completed as f64
        } else {
            0.0
        };

        Self {
            completed,
            in_progress,
            completion_rate,
            average_time_to_complete_secs,
        }
    }
}

/// Overall velocity plus a per-kind breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityMetrics {
    #[serde(flatten)]
    pub overall: Velocity,
    pub by_kind: BTreeMap<EntityKind, Velocity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSignals {
    pub phase_distribution: PhaseDistribution,
    pub bottlenecks: Vec<Bottleneck>,
    pub velocity: VelocityMetrics,
}

impl WorkflowSignals {
    pub fn is_bottleneck(&self, status: &ItemStatus) -> bool {
        self.bottlenecks.iter().any(|b| &b.status == status)
    }
}

/// Workflow analyzer.
#[derive(Debug, Clone, Default)]
pub struct WorkflowAnalyzer {
    options: WorkflowOptions,
}

impl WorkflowAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WorkflowOptions) -> Self {
        Self { options }
    }

    pub fn analyze(&self, items: &[WorkItem], now: DateTime<Utc>) -> WorkflowSignals {
        let phase_distribution = PhaseDistribution::from_items(items);
        let bottlenecks = self.find_bottlenecks(items, now);
        let velocity = self.velocity(items);

        debug!(
            items = items.len(),
            bottlenecks = bottlenecks.len(),
            completion_rate = velocity.overall.completion_rate,
            "workflow analysis complete"
        );

        WorkflowSignals {
            phase_distribution,
            bottlenecks,
            velocity,
        }
    }

    /// Open items grouped by status; a group qualifies with enough items and a
    /// mean wait strictly above the threshold.
    pub fn find_bottlenecks(&self, items: &[WorkItem], now: DateTime<Utc>) -> Vec<Bottleneck> {
        let mut groups: HashMap<ItemStatus, Vec<&WorkItem>> = HashMap::new();
        for item in items.iter().filter(|i| !i.is_complete()) {
            groups.entry(item.status()).or_default().push(item);
        }

        let threshold_secs = days_to_secs(self.options.bottleneck_wait_days) as f64;

        let mut bottlenecks: Vec<Bottleneck> = groups
            .into_iter()
            .filter(|(_, group)| group.len() >= self.options.bottleneck_min_items)
            .filter_map(|(status, mut group)| {
                let total: i64 = group.iter().map(|i| i.secs_since_update(now)).sum();
                let average_wait_secs = total as f64 / group.len() as f64;
                if average_wait_secs <= threshold_secs {
                    return None;
                }
                // Longest-waiting items make the most useful samples.
                group.sort_by(|a, b| a.updated_at().cmp(&b.updated_at()).then_with(|| a.id().cmp(b.id())));
                Some(Bottleneck {
                    phase: status.phase(),
                    item_count: group.len(),
                    average_wait_secs,
                    sample_items: group
                        .iter()
                        .take(self.options.sample_limit)
                        .map(|i| i.item_ref())
                        .collect(),
                    status,
                })
            })
            .collect();

        bottlenecks.sort_by(|a, b| {
            b.average_wait_secs
                .total_cmp(&a.average_wait_secs)
                .then_with(|| a.status.cmp(&b.status))
        });
        bottlenecks
    }

    pub fn velocity(&self, items: &[WorkItem]) -> VelocityMetrics {
        let mut by_kind = BTreeMap::new();
        for kind in [EntityKind::Pitch, EntityKind::Story] {
            by_kind.insert(kind, Velocity::from_items(items.iter().filter(|i| i.kind() == kind)));
        }
        VelocityMetrics {
            overall: Velocity::from_items(items),
            by_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{PitchStatus, StoryStatus};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn story(id: &str, status: StoryStatus, waiting_days: i64) -> WorkItem {
        WorkItem::story(
            id,
            status,
            now() - Duration::days(90),
            now() - Duration::days(waiting_days),
        )
    }

    #[test]
    fn four_items_waiting_ten_days_make_one_bottleneck() {
        let items: Vec<_> = (0..4)
            .map(|i| story(&format!("s{i}"), StoryStatus::V2Edit, 10))
            .collect();
        let bottlenecks = WorkflowAnalyzer::new().find_bottlenecks(&items, now());
        assert_eq!(bottlenecks.len(), 1);
        assert_eq!(bottlenecks[0].item_count, 4);
        assert!((bottlenecks[0].average_wait_days() - 10.0).abs() < 1e-9);
        assert_eq!(bottlenecks[0].phase, Phase::PostProduction);
    }

    #[test]
    fn huge_wait_threshold_finds_nothing() {
        let items: Vec<_> = (0..4)
            .map(|i| story(&format!("s{i}"), StoryStatus::V2Edit, 10))
            .collect();
        let analyzer = WorkflowAnalyzer::with_options(WorkflowOptions {
            bottleneck_wait_days: 200_000_000_000_000,
            ..Default::default()
        });
        assert!(analyzer.find_bottlenecks(&items, now()).is_empty());
    }

    #[test]
    fn single_item_is_never_a_bottleneck() {
        let items = vec![story("s1", StoryStatus::V2Edit, 40)];
        assert!(WorkflowAnalyzer::new().find_bottlenecks(&items, now()).is_empty());
    }

    #[test]
    fn wait_must_exceed_threshold() {
        let items = vec![
            story("s1", StoryStatus::ARoll, 7),
            story("s2", StoryStatus::ARoll, 7),
        ];
        assert!(WorkflowAnalyzer::new().find_bottlenecks(&items, now()).is_empty());

        let items = vec![
            story("s1", StoryStatus::ARoll, 1),
            story("s2", StoryStatus::ARoll, 1),
        ];
        assert!(WorkflowAnalyzer::new().find_bottlenecks(&items, now()).is_empty());
    }

    #[test]
    fn completed_items_do_not_count_towards_bottlenecks() {
        let items = vec![
            story("s1", StoryStatus::Assembled, 30),
            story("s2", StoryStatus::Assembled, 30),
        ];
        assert!(WorkflowAnalyzer::new().find_bottlenecks(&items, now()).is_empty());
    }

    #[test]
    fn same_label_in_different_kinds_groups_separately() {
        let items = vec![
            story("s1", StoryStatus::Killed, 30),
            WorkItem::pitch("p1", PitchStatus::Other("Hold".into()), now(), now() - Duration::days(20)),
            WorkItem::story("s2", StoryStatus::Other("Hold".into()), now(), now() - Duration::days(20)),
        ];
        assert!(WorkflowAnalyzer::new().find_bottlenecks(&items, now()).is_empty());
    }

    #[test]
    fn bottlenecks_sorted_by_wait_and_samples_capped() {
        let mut items: Vec<_> = (0..12)
            .map(|i| story(&format!("edit{i:02}"), StoryStatus::V1Edit, 9))
            .collect();
        items.push(story("r1", StoryStatus::ARoll, 20));
        items.push(story("r2", StoryStatus::ARoll, 20));

        let bottlenecks = WorkflowAnalyzer::new().find_bottlenecks(&items, now());
        assert_eq!(bottlenecks.len(), 2);
        assert_eq!(bottlenecks[0].status, ItemStatus::Story(StoryStatus::ARoll));
        assert_eq!(bottlenecks[1].item_count, 12);
        assert_eq!(bottlenecks[1].sample_items.len(), 10);
    }

    #[test]
    fn velocity_over_completed_items_only() {
        let created = now() - Duration::days(30);
        let items = vec![
            WorkItem::story("s1", StoryStatus::Assembled, created, created + Duration::days(10)),
            WorkItem::story("s2", StoryStatus::Killed, created, created + Duration::days(20)),
            WorkItem::story("s3", StoryStatus::V1Edit, created, now()),
            WorkItem::pitch("p1", PitchStatus::Pitched, created, now()),
        ];
        let velocity = WorkflowAnalyzer::new().velocity(&items);
        assert_eq!(velocity.overall.completed, 2);
        assert_eq!(velocity.overall.in_progress, 2);
        assert!((velocity.overall.completion_rate - 0.5).abs() < 1e-9);
        assert!((velocity.overall.average_time_to_complete_secs - 15.0 * 86_400.0).abs() < 1e-6);

        let pitch = &velocity.by_kind[&EntityKind::Pitch];
        assert_eq!(pitch.completed, 0);
        assert_eq!(pitch.average_time_to_complete_secs, 0.0);
    }

    #[test]
    fn velocity_of_nothing_is_zero() {
        let velocity = WorkflowAnalyzer::new().velocity(&[]);
        assert_eq!(velocity.overall, Velocity::default());
    }

    #[test]
    fn analyze_bundles_distribution() {
        let items = vec![story("s1", StoryStatus::Shooting, 1), story("s2", StoryStatus::Assembled, 1)];
        let signals = WorkflowAnalyzer::new().analyze(&items, now());
        assert_eq!(signals.phase_distribution.total(), 2);
        assert!(signals.bottlenecks.is_empty());
    }
}
