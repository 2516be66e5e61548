//! Per-user workload scoring and rebalancing suggestions.
//!
//! Score components:
//!
//! ```text
//! items    = min(total   × 5, 50)
//! overdue  = min(overdue × 10, 30)
//! at_risk  = min(at_risk × 5, 20)
//! score    = items + overdue + at_risk        (0..=100)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::item::{ItemRef, WorkItem};
use crate::schedule::ScheduleSignals;

/// Workload scorer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadOptions {
    /// Score strictly above which a user is overloaded
    pub overloaded_above: u32,
    /// Score strictly below which a user may take more work
    pub low_below: u32,
    /// A low-workload user must also hold fewer than this many items
    pub low_max_items: usize,
    /// Overdue items offered for reassignment per overloaded user
    pub max_reassignments: usize,
    /// Fixed confidence attached to each suggestion
    pub suggestion_confidence: f64,
}

impl Default for WorkloadOptions {
    fn default() -> Self {
        Self {
            overloaded_above: 60,
            low_below: 30,
            low_max_items: 5,
            max_reassignments: 5,
            suggestion_confidence: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadLevel {
    Overloaded,
    Balanced,
    Low,
}

/// Score breakdown for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadScore {
    pub items_score: u32,
    pub overdue_score: u32,
    pub at_risk_score: u32,
    pub total: u32,
}

impl WorkloadScore {
    pub fn compute(total_items: usize, overdue_items: usize, at_risk_items: usize) -> Self {
        let items_score = capped(total_items, 5, 50);
        let overdue_score = capped(overdue_items, 10, 30);
        let at_risk_score = capped(at_risk_items, 5, 20);
        Self {
            items_score,
            overdue_score,
            at_risk_score,
            total: items_score + overdue_score + at_risk_score,
        }
    }
}

fn capped(count: usize, per_item: u32, cap: u32) -> u32 {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    count.saturating_mul(per_item).min(cap)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserWorkload {
    pub user_id: String,
    pub total_items: usize,
    pub overdue_items: usize,
    pub at_risk_items: usize,
    pub items_score: u32,
    pub overdue_score: u32,
    pub at_risk_score: u32,
    pub workload_score: u32,
    pub level: WorkloadLevel,
    pub recommendations: Vec<String>,
}

impl UserWorkload {
    pub fn is_overloaded(&self) -> bool {
        self.level == WorkloadLevel::Overloaded
    }

    pub fn is_low(&self) -> bool {
        self.level == WorkloadLevel::Low
    }
}

/// Proposal to move one overdue item between users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSuggestion {
    pub item: ItemRef,
    pub from_user: String,
    pub to_user: String,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub users: Vec<UserWorkload>,
    pub rebalancing: Vec<RebalanceSuggestion>,
}

#[derive(Default)]
struct Counts {
    total: usize,
    overdue: usize,
    at_risk: usize,
}

/// Workload scorer.
#[derive(Debug, Clone, Default)]
pub struct WorkloadScorer {
    options: WorkloadOptions,
}

impl WorkloadScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WorkloadOptions) -> Self {
        Self { options }
    }

    /// Score every assignee of an open item, plus anyone on `roster`.
    pub fn score(&self, items: &[WorkItem], schedule: &ScheduleSignals, roster: &[String]) -> WorkloadReport {
        let mut counts: BTreeMap<String, Counts> = BTreeMap::new();
        for user in roster.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            counts.entry(user.to_string()).or_default();
        }
        for item in items.iter().filter(|i| !i.is_complete()) {
            for user in item.assignees() {
                counts.entry(user.clone()).or_default().total += 1;
            }
        }
        for overdue in &schedule.overdue_items {
            for user in &overdue.assignees {
                counts.entry(user.clone()).or_default().overdue += 1;
            }
        }
        for at_risk in &schedule.at_risk_items {
            for user in &at_risk.assignees {
                counts.entry(user.clone()).or_default().at_risk += 1;
            }
        }

        let mut users: Vec<UserWorkload> = counts
            .into_iter()
            .map(|(user_id, c)| self.user_workload(user_id, c))
            .collect();
        users.sort_by(|a, b| {
            b.workload_score
                .cmp(&a.workload_score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        let rebalancing = self.rebalance(&users, schedule);

        debug!(
            users = users.len(),
            overloaded = users.iter().filter(|u| u.is_overloaded()).count(),
            suggestions = rebalancing.len(),
            "workload scored"
        );

        WorkloadReport { users, rebalancing }
    }

    fn user_workload(&self, user_id: String, counts: Counts) -> UserWorkload {
        let score = WorkloadScore::compute(counts.total, counts.overdue, counts.at_risk);

        let level = if score.total > self.options.overloaded_above {
            WorkloadLevel::Overloaded
        } else if score.total < self.options.low_below && counts.total < self.options.low_max_items {
            WorkloadLevel::Low
        } else {
            WorkloadLevel::Balanced
        };

        let mut recommendations = Vec::new();
        if level == WorkloadLevel::Overloaded {
            recommendations.push(format!(
                "Workload score {} is high; consider redistributing some of {} open items",
                score.total, counts.total
            ));
        }
        if counts.overdue > 0 {
            recommendations.push(format!("Prioritize {} overdue item(s)", counts.overdue));
        }
        if counts.at_risk > 0 {
            recommendations.push(format!(
                "{} item(s) due within the look-ahead window",
                counts.at_risk
            ));
        }
        if level == WorkloadLevel::Low {
            recommendations.push("Has capacity for additional assignments".to_string());
        }

        UserWorkload {
            user_id,
            total_items: counts.total,
            overdue_items: counts.overdue,
            at_risk_items: counts.at_risk,
            items_score: score.items_score,
            overdue_score: score.overdue_score,
            at_risk_score: score.at_risk_score,
            workload_score: score.total,
            level,
            recommendations,
        }
    }

    /// Pair each overloaded user's most overdue items positionally with the
    /// least-loaded users. Stops when either side runs out.
    fn rebalance(&self, users: &[UserWorkload], schedule: &ScheduleSignals) -> Vec<RebalanceSuggestion> {
        let mut low: Vec<&UserWorkload> = users.iter().filter(|u| u.is_low()).collect();
        low.sort_by(|a, b| {
            a.workload_score
                .cmp(&b.workload_score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        if low.is_empty() {
            return Vec::new();
        }

        let mut suggestions = Vec::new();
        for from in users.iter().filter(|u| u.is_overloaded()) {
            let overdue = schedule
                .overdue_for(&from.user_id)
                .take(self.options.max_reassignments);
            for (item, to) in overdue.zip(low.iter()) {
                suggestions.push(RebalanceSuggestion {
                    item: item.item.clone(),
                    from_user: from.user_id.clone(),
                    to_user: to.user_id.clone(),
                    confidence: self.options.suggestion_confidence,
                    reason: format!(
                        "{} is overloaded (score {}); {} has capacity (score {})",
                        from.user_id, from.workload_score, to.user_id, to.workload_score
                    ),
                });
            }
        }
        suggestions
    }
}
