//! Historical pattern learning over a lookback window.
//!
//! The store keeps no log of status changes, so "time in status" is
//! approximated by each item's creation-to-last-update span, and transition
//! paths only know their destination (the current status). The `from` side of
//! every learned [`TransitionPattern`] is therefore `None`. Callers that do
//! have a real status-change log can build patterns with `from` populated and
//! the predictor will use them.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::item::{ItemStatus, WorkItem};
use crate::schedule::{days_before, days_to_secs};

/// Historical learner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryOptions {
    /// Only items created within this many days are considered
    pub lookback_days: i64,
    /// Observations a status needs before any average is reported
    pub min_samples: usize,
    /// Average days in status above which a status is a baseline bottleneck
    pub bottleneck_days: i64,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            min_samples: 3,
            bottleneck_days: 7,
        }
    }
}

/// A status that is habitually slow over the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineBottleneck {
    pub status: ItemStatus,
    pub frequency: usize,
    pub average_secs: f64,
}

/// An observed move into `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPattern {
    /// Origin status; `None` when no transition history exists.
    pub from: Option<ItemStatus>,
    pub to: ItemStatus,
    pub count: usize,
    /// Fraction of these items that satisfy their kind's success predicate
    pub success_rate: f64,
}

impl TransitionPattern {
    pub fn weight(&self) -> f64 {
        self.count as f64 * self.success_rate
    }
}

/// Statistical baseline learned from the lookback window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBaseline {
    pub window_start: Option<DateTime<Utc>>,
    pub sample_size: usize,
    /// Mean seconds per status, only for statuses with enough samples
    pub average_time_in_status: BTreeMap<ItemStatus, f64>,
    pub status_frequency: BTreeMap<ItemStatus, usize>,
    pub bottlenecks: Vec<BaselineBottleneck>,
    pub common_paths: Vec<TransitionPattern>,
}

impl HistoricalBaseline {
    pub fn average_for(&self, status: &ItemStatus) -> Option<f64> {
        self.average_time_in_status.get(status).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_size == 0
    }
}

#[derive(Default)]
struct StatusAccumulator {
    count: usize,
    total_secs: i64,
    successes: usize,
}

/// Learns per-status baselines from item records.
#[derive(Debug, Clone, Default)]
pub struct HistoricalPatternLearner {
    options: HistoryOptions,
}

impl HistoricalPatternLearner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: HistoryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HistoryOptions {
        &self.options
    }

    /// Start of the lookback window relative to `now`. `None` when the
    /// window is unbounded.
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        days_before(now, self.options.lookback_days)
    }

    pub fn learn(&self, items: &[WorkItem], now: DateTime<Utc>) -> HistoricalBaseline {
        let window_start = self.window_start(now);
        let min_samples = self.options.min_samples.max(1);

        let mut acc: HashMap<ItemStatus, StatusAccumulator> = HashMap::new();
        let mut sample_size = 0usize;
        for item in items
            .iter()
            .filter(|i| window_start.map_or(true, |start| i.created_at() >= start))
        {
            sample_size += 1;
            let entry = acc.entry(item.status()).or_default();
            entry.count += 1;
            entry.total_secs += item.age_at_update_secs();
            if item.is_success() {
                entry.successes += 1;
            }
        }

        let status_frequency: BTreeMap<ItemStatus, usize> =
            acc.iter().map(|(s, a)| (s.clone(), a.count)).collect();

        let average_time_in_status: BTreeMap<ItemStatus, f64> = acc
            .iter()
            .filter(|(_, a)| a.count >= min_samples)
            .map(|(s, a)| (s.clone(), a.total_secs as f64 / a.count as f64))
            .collect();

        let threshold_secs = days_to_secs(self.options.bottleneck_days) as f64;
        let mut bottlenecks: Vec<BaselineBottleneck> = average_time_in_status
            .iter()
            .filter(|(_, avg)| **avg > threshold_secs)
            .map(|(status, avg)| BaselineBottleneck {
                status: status.clone(),
                frequency: status_frequency.get(status).copied().unwrap_or(0),
                average_secs: *avg,
            })
            .collect();
        bottlenecks.sort_by(|a, b| {
            b.average_secs
                .total_cmp(&a.average_secs)
                .then_with(|| a.status.cmp(&b.status))
        });

        let mut common_paths: Vec<TransitionPattern> = acc
            .into_iter()
            .filter(|(_, a)| a.count >= min_samples)
            .map(|(to, a)| TransitionPattern {
                from: None,
                to,
                count: a.count,
                success_rate: a.successes as f64 / a.count as f64,
            })
            .collect();
        common_paths.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.to.cmp(&b.to)));

        debug!(
            sample_size,
            statuses = status_frequency.len(),
            baseline_bottlenecks = bottlenecks.len(),
            "historical baseline learned"
        );

        HistoricalBaseline {
            window_start,
            sample_size,
            average_time_in_status,
            status_frequency,
            bottlenecks,
            common_paths,
        }
    }
}
