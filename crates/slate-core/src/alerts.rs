//! Alert generation from schedule and workflow signals.
//!
//! Suggested actions are advisory only: every action carries
//! `requires_confirmation = true` and nothing here applies them.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::item::ItemRef;
use crate::schedule::{AtRiskItem, OverdueItem, OverdueReason, ScheduleConflict, ScheduleSignals};
use crate::workflow::{Bottleneck, WorkflowSignals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Overdue,
    Conflict,
    AtRisk,
    Bottleneck,
}

/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    NotifyTeam,
    Reassign,
    ExtendDeadline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: ActionKind,
    pub description: String,
    pub confidence: f64,
    pub requires_confirmation: bool,
}

impl SuggestedAction {
    fn new(action: ActionKind, confidence: f64, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
            confidence,
            requires_confirmation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub items: Vec<ItemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub suggested_actions: Vec<SuggestedAction>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertOptions {
    /// Minimum open items in a bottleneck before it raises an alert
    pub bottleneck_min_items: usize,
    /// Item count at which a bottleneck counts as large
    pub bottleneck_high_count: usize,
    /// Mean wait (days) at which a bottleneck counts as slow
    pub bottleneck_high_wait_days: f64,
}

impl Default for AlertOptions {
    fn default() -> Self {
        Self {
            bottleneck_min_items: 3,
            bottleneck_high_count: 4,
            bottleneck_high_wait_days: 14.0,
        }
    }
}

/// Alert counts by severity and type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_type: BTreeMap<AlertType, usize>,
}

impl AlertSummary {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut summary = Self {
            total: alerts.len(),
            ..Default::default()
        };
        for alert in alerts {
            *summary.by_severity.entry(alert.severity).or_insert(0) += 1;
            *summary.by_type.entry(alert.alert_type).or_insert(0) += 1;
        }
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

pub fn overdue_severity(days_overdue: i64) -> Severity {
    match days_overdue {
        d if d >= 14 => Severity::Critical,
        d if d >= 7 => Severity::High,
        d if d >= 3 => Severity::Medium,
        _ => Severity::Low,
    }
}

pub fn conflict_severity(item_count: usize) -> Severity {
    match item_count {
        n if n >= 4 => Severity::Critical,
        3 => Severity::High,
        _ => Severity::Medium,
    }
}

pub fn at_risk_severity(days_until_deadline: i64) -> Severity {
    match days_until_deadline {
        d if d <= 1 => Severity::Critical,
        d if d <= 3 => Severity::High,
        d if d <= 5 => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Alert generator.
#[derive(Debug, Clone, Default)]
pub struct AlertGenerator {
    options: AlertOptions,
}

impl AlertGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: AlertOptions) -> Self {
        Self { options }
    }

    pub fn bottleneck_severity(&self, bottleneck: &Bottleneck) -> Severity {
        let many = bottleneck.item_count >= self.options.bottleneck_high_count;
        let slow = bottleneck.average_wait_days() >= self.options.bottleneck_high_wait_days;
        match (many, slow) {
            (true, true) => Severity::Critical,
            (true, false) | (false, true) => Severity::High,
            (false, false) => Severity::Medium,
        }
    }

    /// Build every alert, most severe first.
    pub fn generate(
        &self,
        schedule: &ScheduleSignals,
        workflow: &WorkflowSignals,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = Vec::new();

        alerts.extend(schedule.overdue_items.iter().map(|o| overdue_alert(o, now)));
        alerts.extend(schedule.conflicts.iter().map(|c| conflict_alert(c, now)));
        alerts.extend(schedule.at_risk_items.iter().map(|a| at_risk_alert(a, now)));
        alerts.extend(
            workflow
                .bottlenecks
                .iter()
                .filter(|b| b.item_count >= self.options.bottleneck_min_items)
                .map(|b| self.bottleneck_alert(b, now)),
        );

        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.alert_type.cmp(&b.alert_type))
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(alerts = alerts.len(), "alerts generated");
        alerts
    }

    fn bottleneck_alert(&self, b: &Bottleneck, now: DateTime<Utc>) -> Alert {
        let days = b.average_wait_days();
        Alert {
            id: format!("bottleneck:{}", b.status),
            alert_type: AlertType::Bottleneck,
            severity: self.bottleneck_severity(b),
            title: format!("Bottleneck in '{}'", b.status.label()),
            message: format!(
                "{} {} item(s) have been waiting in '{}' for {:.1} days on average",
                b.item_count,
                b.kind(),
                b.status.label(),
                days
            ),
            items: b.sample_items.clone(),
            user_id: None,
            date: None,
            suggested_actions: vec![
                SuggestedAction::new(
                    ActionKind::NotifyTeam,
                    0.7,
                    format!("Flag the '{}' queue to the team", b.status.label()),
                ),
                SuggestedAction::new(
                    ActionKind::Reassign,
                    0.6,
                    "Spread the queued items across more people",
                ),
            ],
            created_at: now,
        }
    }
}

fn item_label(item: &ItemRef, title: Option<&str>) -> String {
    match title {
        Some(t) => format!("{} '{}'", item.kind, t),
        None => format!("{} {}", item.kind, item.id),
    }
}

fn overdue_alert(o: &OverdueItem, now: DateTime<Utc>) -> Alert {
    let label = item_label(&o.item, o.title.as_deref());
    let message = match &o.reason {
        OverdueReason::Deadline { deadline } => format!(
            "{label} passed its deadline of {} by {} day(s)",
            deadline.format("%Y-%m-%d"),
            o.days_overdue
        ),
        OverdueReason::Stale { last_updated } => format!(
            "{label} has not moved from '{}' since {} ({} day(s) past the staleness limit)",
            o.status,
            last_updated.format("%Y-%m-%d"),
            o.days_overdue
        ),
    };

    let mut suggested_actions = vec![SuggestedAction::new(
        ActionKind::NotifyTeam,
        0.9,
        "Notify the assignees about the overdue item",
    )];
    if matches!(o.reason, OverdueReason::Deadline { .. }) {
        suggested_actions.push(SuggestedAction::new(
            ActionKind::ExtendDeadline,
            0.6,
            "Move the deadline to a realistic date",
        ));
    } else if o.days_overdue >= 7 {
        suggested_actions.push(SuggestedAction::new(
            ActionKind::Reassign,
            0.5,
            "Hand the item to someone with capacity",
        ));
    }

    Alert {
        id: format!("overdue:{}", o.item),
        alert_type: AlertType::Overdue,
        severity: overdue_severity(o.days_overdue),
        title: format!("Overdue: {label}"),
        message,
        items: vec![o.item.clone()],
        user_id: None,
        date: None,
        suggested_actions,
        created_at: now,
    }
}

fn conflict_alert(c: &ScheduleConflict, now: DateTime<Utc>) -> Alert {
    Alert {
        id: format!("conflict:{}:{}", c.user_id, c.date),
        alert_type: AlertType::Conflict,
        severity: conflict_severity(c.items.len()),
        title: format!("{} has {} items due {}", c.user_id, c.items.len(), c.date),
        message: format!(
            "{} is assigned {} items scheduled on {}",
            c.user_id,
            c.items.len(),
            c.date
        ),
        items: c.items.iter().map(|i| i.item.clone()).collect(),
        user_id: Some(c.user_id.clone()),
        date: Some(c.date),
        suggested_actions: vec![
            SuggestedAction::new(
                ActionKind::Reassign,
                0.7,
                "Reassign one of the items to another team member",
            ),
            SuggestedAction::new(
                ActionKind::ExtendDeadline,
                0.5,
                "Move one of the items to a different day",
            ),
        ],
        created_at: now,
    }
}

fn at_risk_alert(a: &AtRiskItem, now: DateTime<Utc>) -> Alert {
    let label = item_label(&a.item, a.title.as_deref());
    let mut suggested_actions = vec![SuggestedAction::new(
        ActionKind::NotifyTeam,
        0.8,
        "Remind the assignees of the upcoming deadline",
    )];
    if a.days_until_deadline <= 1 {
        suggested_actions.push(SuggestedAction::new(
            ActionKind::ExtendDeadline,
            0.5,
            "Consider extending the deadline",
        ));
    }

    Alert {
        id: format!("at_risk:{}", a.item),
        alert_type: AlertType::AtRisk,
        severity: at_risk_severity(a.days_until_deadline),
        title: format!("Due soon: {label}"),
        message: format!(
            "{label} in '{}' is due {} ({} day(s) left)",
            a.status,
            a.deadline.format("%Y-%m-%d"),
            a.days_until_deadline
        ),
        items: vec![a.item.clone()],
        user_id: None,
        date: Some(a.deadline.date_naive()),
        suggested_actions,
        created_at: now,
    }
}
