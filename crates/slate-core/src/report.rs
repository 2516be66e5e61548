//! One-shot intelligence report over a [`Snapshot`].
//!
//! [`IntelligenceEngine`] owns the configured analyzers and runs them in
//! dependency order: schedule and workflow first, then the historical
//! baseline, predictions, workload and alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alerts::{Alert, AlertGenerator, AlertSummary};
use crate::gather::{Snapshot, SourceFailure};
use crate::history::{HistoricalBaseline, HistoricalPatternLearner};
use crate::predict::{OutcomePredictor, Prediction};
use crate::schedule::{ScheduleAnalyzer, ScheduleOptions, ScheduleSignals};
use crate::storage::Config;
use crate::workflow::{WorkflowAnalyzer, WorkflowSignals};
use crate::workload::{WorkloadReport, WorkloadScorer};

/// Every derived signal for one organization at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceReport {
    pub organization_id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub schedule: ScheduleSignals,
    pub workflow: WorkflowSignals,
    pub baseline: HistoricalBaseline,
    pub predictions: Vec<Prediction>,
    pub workload: WorkloadReport,
    pub alerts: Vec<Alert>,
    pub alert_summary: AlertSummary,
    /// Inputs that could not be fetched and were treated as empty
    pub degraded: Vec<SourceFailure>,
    pub skipped_records: usize,
}

/// The configured analyzer pipeline.
#[derive(Debug, Clone, Default)]
pub struct IntelligenceEngine {
    schedule: ScheduleOptions,
    workflow: WorkflowAnalyzer,
    history: HistoricalPatternLearner,
    predictor: OutcomePredictor,
    workload: WorkloadScorer,
    alerts: AlertGenerator,
    roster: Vec<String>,
}

impl IntelligenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            schedule: config.schedule_options(None),
            workflow: WorkflowAnalyzer::with_options(config.workflow_options()),
            history: HistoricalPatternLearner::with_options(config.history_options()),
            predictor: OutcomePredictor::with_options(config.predictor_options()),
            workload: WorkloadScorer::with_options(config.workload_options()),
            alerts: AlertGenerator::with_options(config.alert_options()),
            roster: config.workload.roster.clone(),
        }
    }

    /// Users scored even when nothing is assigned to them.
    pub fn with_roster(mut self, roster: Vec<String>) -> Self {
        self.roster = roster;
        self
    }

    /// Lookback window the historical fetch should cover.
    pub fn lookback_days(&self) -> i64 {
        self.history.options().lookback_days
    }

    pub fn schedule(&self, snapshot: &Snapshot, now: DateTime<Utc>, user_id: Option<&str>) -> ScheduleSignals {
        let options = ScheduleOptions {
            user_id: user_id.map(str::to_string),
            ..self.schedule.clone()
        };
        ScheduleAnalyzer::with_options(options).analyze(&snapshot.items(), &snapshot.events, now)
    }

    pub fn workflow(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> WorkflowSignals {
        self.workflow.analyze(&snapshot.items(), now)
    }

    pub fn baseline(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> HistoricalBaseline {
        self.history.learn(&snapshot.history, now)
    }

    pub fn predictions(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Prediction> {
        let baseline = self.baseline(snapshot, now);
        let workflow = self.workflow(snapshot, now);
        self.predictor.predict_all(&snapshot.items(), &baseline, &workflow)
    }

    pub fn workload(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> WorkloadReport {
        let schedule = self.schedule(snapshot, now, None);
        self.workload.score(&snapshot.items(), &schedule, &self.roster)
    }

    pub fn alerts(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
        let schedule = self.schedule(snapshot, now, None);
        let workflow = self.workflow(snapshot, now);
        self.alerts.generate(&schedule, &workflow, now)
    }

    /// Run every analyzer once. With `user_id` set, schedule signals,
    /// predictions, workload entries and alerts are narrowed to that user;
    /// workflow and baseline stay organization-wide.
    pub fn analyze(&self, snapshot: &Snapshot, now: DateTime<Utc>, user_id: Option<&str>) -> IntelligenceReport {
        let items = snapshot.items();

        let org_schedule = self.schedule(snapshot, now, None);
        let schedule = match user_id {
            Some(user) => self.schedule(snapshot, now, Some(user)),
            None => org_schedule.clone(),
        };
        let workflow = self.workflow.analyze(&items, now);
        let baseline = self.history.learn(&snapshot.history, now);

        let mut predictions = self.predictor.predict_all(&items, &baseline, &workflow);
        let mut workload = self.workload.score(&items, &org_schedule, &self.roster);
        let alerts = self.alerts.generate(&schedule, &workflow, now);

        if let Some(user) = user_id {
            let assigned: std::collections::HashSet<_> = items
                .iter()
                .filter(|i| i.is_assigned_to(user))
                .map(|i| i.item_ref())
                .collect();
            predictions.retain(|p| assigned.contains(&p.item));
            workload.users.retain(|u| u.user_id == user);
            workload
                .rebalancing
                .retain(|s| s.from_user == user || s.to_user == user);
        }

        let alert_summary = AlertSummary::from_alerts(&alerts);

        debug!(
            organization_id = %snapshot.organization_id,
            alerts = alerts.len(),
            predictions = predictions.len(),
            users = workload.users.len(),
            "intelligence report built"
        );

        IntelligenceReport {
            organization_id: snapshot.organization_id.clone(),
            generated_at: now,
            user_id: user_id.map(str::to_string),
            schedule,
            workflow,
            baseline,
            predictions,
            workload,
            alerts,
            alert_summary,
            degraded: snapshot.degraded.clone(),
            skipped_records: snapshot.skipped_records,
        }
    }
}

impl IntelligenceReport {
    /// Render the report as ASCII tables.
    pub fn render_report(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("\nProduction Intelligence: {}\n", self.organization_id));
        output.push_str(&"=".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "Generated {}",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        if let Some(user) = &self.user_id {
            output.push_str(&format!(" for {user}"));
        }
        output.push_str("\n\n");

        for failure in &self.degraded {
            output.push_str(&format!(
                "WARNING: {} unavailable ({})\n",
                failure.source, failure.error
            ));
        }
        if !self.degraded.is_empty() {
            output.push('\n');
        }

        // Alerts
        output.push_str(&format!("Alerts ({})\n", self.alerts.len()));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        if self.alerts.is_empty() {
            output.push_str("No alerts.\n");
        }
        for alert in &self.alerts {
            output.push_str(&format!(
                "{:<10} {}\n",
                format!("[{:?}]", alert.severity).to_uppercase(),
                truncate(&alert.title, 68)
            ));
        }
        output.push('\n');

        // Overdue
        output.push_str(&format!(
            "{:<30} {:<20} {:>8} {:<18}\n",
            "Overdue", "Status", "Days", "Rule"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        for item in &self.schedule.overdue_items {
            let rule = match item.reason {
                crate::schedule::OverdueReason::Deadline { .. } => "deadline",
                crate::schedule::OverdueReason::Stale { .. } => "stale",
            };
            output.push_str(&format!(
                "{:<30} {:<20} {:>8} {:<18}\n",
                truncate(&item.title.clone().unwrap_or_else(|| item.item.to_string()), 30),
                truncate(&item.status, 20),
                item.days_overdue,
                rule
            ));
        }
        output.push('\n');

        // Bottlenecks
        output.push_str(&format!(
            "{:<30} {:<20} {:>8} {:>10}\n",
            "Bottleneck", "Phase", "Items", "Avg wait"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        for b in &self.workflow.bottlenecks {
            output.push_str(&format!(
                "{:<30} {:<20} {:>8} {:>9.1}d\n",
                truncate(&b.status.to_string(), 30),
                b.phase.name(),
                b.item_count,
                b.average_wait_days()
            ));
        }
        output.push('\n');

        // Workload
        output.push_str(&format!(
            "{:<24} {:>6} {:>8} {:>8} {:>6} {:<10}\n",
            "User", "Items", "Overdue", "At risk", "Score", "Level"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        for user in &self.workload.users {
            output.push_str(&format!(
                "{:<24} {:>6} {:>8} {:>8} {:>6} {:<10}\n",
                truncate(&user.user_id, 24),
                user.total_items,
                user.overdue_items,
                user.at_risk_items,
                user.workload_score,
                format!("{:?}", user.level).to_lowercase()
            ));
        }
        if !self.workload.rebalancing.is_empty() {
            output.push_str("\nSuggested reassignments:\n");
            for s in &self.workload.rebalancing {
                output.push_str(&format!("  {} : {} -> {}\n", s.item, s.from_user, s.to_user));
            }
        }

        output
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
