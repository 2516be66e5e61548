//! Per-item outcome prediction.
//!
//! Combines one item's live state with the historical baseline and the live
//! bottleneck list. Confidence is a fixed heuristic per estimate source, not a
//! statistical interval.

use serde::{Deserialize, Serialize};

use crate::history::HistoricalBaseline;
use crate::item::{ItemRef, ItemStatus, PitchStatus, StoryStatus, WorkItem};
use crate::schedule::{days_to_secs, SECS_PER_DAY};
use crate::workflow::WorkflowSignals;

/// Confidence when the estimate comes from the per-status baseline.
pub const BASELINE_CONFIDENCE: f64 = 0.7;
/// Confidence when falling back to overall time-to-complete.
pub const VELOCITY_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorOptions {
    /// Baseline average (days) above which an item is likely to stall
    pub stuck_days: i64,
}

impl Default for PredictorOptions {
    fn default() -> Self {
        Self { stuck_days: 14 }
    }
}

/// Where a prediction's estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Baseline,
    Velocity,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub item: ItemRef,
    pub status: ItemStatus,
    pub predicted_secs: f64,
    pub confidence: f64,
    pub source: EstimateSource,
    pub optimal_next_status: Option<ItemStatus>,
    pub likely_to_get_stuck: bool,
    pub recommendations: Vec<String>,
}

impl Prediction {
    pub fn predicted_days(&self) -> f64 {
        self.predicted_secs / SECS_PER_DAY as f64
    }
}

/// Outcome predictor.
#[derive(Debug, Clone, Default)]
pub struct OutcomePredictor {
    options: PredictorOptions,
}

impl OutcomePredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PredictorOptions) -> Self {
        Self { options }
    }

    pub fn predict(
        &self,
        item: &WorkItem,
        baseline: &HistoricalBaseline,
        workflow: &WorkflowSignals,
    ) -> Prediction {
        let status = item.status();
        let baseline_avg = baseline.average_for(&status);
        let fallback = workflow.velocity.overall.average_time_to_complete_secs;

        let (predicted_secs, confidence, source) = match baseline_avg {
            Some(avg) => (avg, BASELINE_CONFIDENCE, EstimateSource::Baseline),
            None if fallback > 0.0 => (fallback, VELOCITY_CONFIDENCE, EstimateSource::Velocity),
            None => (0.0, 0.0, EstimateSource::None),
        };

        let stuck_secs = days_to_secs(self.options.stuck_days) as f64;
        let likely_to_get_stuck = workflow.is_bottleneck(&status)
            || baseline_avg.is_some_and(|avg| avg > stuck_secs);

        let optimal_next_status = baseline
            .common_paths
            .iter()
            .filter(|p| p.from.as_ref() == Some(&status))
            .max_by(|a, b| a.weight().total_cmp(&b.weight()))
            .map(|p| p.to.clone());

        let recommendations = recommendations_for(item, &status, likely_to_get_stuck);

        Prediction {
            item: item.item_ref(),
            status,
            predicted_secs,
            confidence,
            source,
            optimal_next_status,
            likely_to_get_stuck,
            recommendations,
        }
    }

    /// Predict every open item.
    pub fn predict_all(
        &self,
        items: &[WorkItem],
        baseline: &HistoricalBaseline,
        workflow: &WorkflowSignals,
    ) -> Vec<Prediction> {
        items
            .iter()
            .filter(|item| !item.is_complete())
            .map(|item| self.predict(item, baseline, workflow))
            .collect()
    }
}

fn recommendations_for(item: &WorkItem, status: &ItemStatus, stuck: bool) -> Vec<String> {
    let mut out = Vec::new();

    if stuck {
        out.push(format!(
            "Items in '{}' tend to stall; check in with the assignee about blockers",
            status.label()
        ));
    }

    match status {
        ItemStatus::Pitch(PitchStatus::PursueClearance)
        | ItemStatus::Pitch(PitchStatus::ClearanceInProgress) => {
            out.push("Ensure the clearance coordinator has the required info".to_string());
        }
        ItemStatus::Pitch(PitchStatus::Pitched) => {
            out.push("Schedule a pitch review to reach a pursue/kill decision".to_string());
        }
        ItemStatus::Pitch(PitchStatus::NeedsResearch) => {
            out.push("Assign a researcher so the pitch can move forward".to_string());
        }
        ItemStatus::Story(StoryStatus::ScriptReview) => {
            out.push("Book a script review slot with the editor".to_string());
        }
        ItemStatus::Story(StoryStatus::V1Edit) | ItemStatus::Story(StoryStatus::V2Edit) => {
            out.push("Consolidate edit notes into a single round to shorten the cycle".to_string());
        }
        ItemStatus::Story(StoryStatus::Scheduled) => {
            out.push("Confirm crew and location ahead of the shoot date".to_string());
        }
        _ => {}
    }

    if item.assignees().is_empty() {
        out.push("Assign an owner; nobody is responsible for this item".to_string());
    }

    out
}
