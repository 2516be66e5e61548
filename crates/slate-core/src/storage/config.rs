//! TOML-based configuration.
//!
//! Holds the organization to analyze, the store location and every analyzer
//! threshold. Stored at `~/.config/slate/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::alerts::AlertOptions;
use crate::error::ConfigError;
use crate::history::HistoryOptions;
use crate::predict::PredictorOptions;
use crate::schedule::ScheduleOptions;
use crate::workflow::WorkflowOptions;
use crate::workload::WorkloadOptions;

/// `[schedule]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_days_ahead")]
    pub days_ahead: i64,
    #[serde(default = "default_staleness_days")]
    pub staleness_days: i64,
}

/// `[workflow]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_bottleneck_min_items")]
    pub bottleneck_min_items: usize,
    #[serde(default = "default_seven")]
    pub bottleneck_wait_days: i64,
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
}

/// `[history]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_seven")]
    pub bottleneck_days: i64,
}

/// `[prediction]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_staleness_days")]
    pub stuck_days: i64,
}

/// `[workload]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default = "default_overloaded_above")]
    pub overloaded_above: u32,
    #[serde(default = "default_low_below")]
    pub low_below: u32,
    #[serde(default = "default_five")]
    pub low_max_items: usize,
    #[serde(default = "default_five")]
    pub max_reassignments: usize,
    #[serde(default = "default_suggestion_confidence")]
    pub suggestion_confidence: f64,
    /// Users who should be scored even with nothing assigned
    #[serde(default)]
    pub roster: Vec<String>,
}

/// `[alerts]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_alert_min_items")]
    pub bottleneck_min_items: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/slate/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Organization analyzed when `--org` is not given.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Store location; defaults to `slate.db` in the data directory.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

// Default functions
fn default_days_ahead() -> i64 {
    7
}
fn default_staleness_days() -> i64 {
    14
}
fn default_seven() -> i64 {
    7
}
fn default_bottleneck_min_items() -> usize {
    2
}
fn default_sample_limit() -> usize {
    10
}
fn default_lookback_days() -> i64 {
    90
}
fn default_min_samples() -> usize {
    3
}
fn default_overloaded_above() -> u32 {
    60
}
fn default_low_below() -> u32 {
    30
}
fn default_five() -> usize {
    5
}
fn default_suggestion_confidence() -> f64 {
    0.7
}
fn default_alert_min_items() -> usize {
    3
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            days_ahead: default_days_ahead(),
            staleness_days: default_staleness_days(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            bottleneck_min_items: default_bottleneck_min_items(),
            bottleneck_wait_days: default_seven(),
            sample_limit: default_sample_limit(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            min_samples: default_min_samples(),
            bottleneck_days: default_seven(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            stuck_days: default_staleness_days(),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            overloaded_above: default_overloaded_above(),
            low_below: default_low_below(),
            low_max_items: default_five(),
            max_reassignments: default_five(),
            suggestion_confidence: default_suggestion_confidence(),
            roster: Vec::new(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            bottleneck_min_items: default_alert_min_items(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization_id: None,
            database_path: None,
            schedule: ScheduleConfig::default(),
            workflow: WorkflowConfig::default(),
            history: HistoryConfig::default(),
            prediction: PredictionConfig::default(),
            workload: WorkloadConfig::default(),
            alerts: AlertsConfig::default(),
        }
    }
}

/// Upper bound for every day-valued setting (about a century).
pub const MAX_DAYS: i64 = 36_500;

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(key, e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(key, format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(key, format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Array(_) => {
                    let items: Vec<serde_json::Value> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| serde_json::Value::String(s.to_string()))
                        .collect();
                    serde_json::Value::Array(items)
                }
                serde_json::Value::Object(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(key, e.to_string()))?
                }
                // Strings and unset optionals
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load and validate a config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The result must still pass
    /// [`Config::validate`]; on error `self` is left untouched.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, in dot-path form.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<String>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                _ => out.push(prefix.to_string()),
            }
        }

        let Ok(json) = serde_json::to_value(self) else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        walk("", &json, &mut keys);
        keys.into_iter()
            .map(|k| {
                let v = self.get(&k).unwrap_or_default();
                (k, v)
            })
            .collect()
    }

    /// Reject values the analyzers cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let day_knobs = [
            ("schedule.days_ahead", self.schedule.days_ahead),
            ("schedule.staleness_days", self.schedule.staleness_days),
            ("workflow.bottleneck_wait_days", self.workflow.bottleneck_wait_days),
            ("history.bottleneck_days", self.history.bottleneck_days),
            ("history.lookback_days", self.history.lookback_days),
            ("prediction.stuck_days", self.prediction.stuck_days),
        ];
        for (key, days) in day_knobs {
            if days < 0 {
                return Err(invalid(key, "must not be negative"));
            }
            if days > MAX_DAYS {
                return Err(invalid(key, format!("must not exceed {MAX_DAYS} days")));
            }
        }
        if self.history.lookback_days == 0 {
            return Err(invalid("history.lookback_days", "must be positive"));
        }
        if self.history.min_samples == 0 {
            return Err(invalid("history.min_samples", "must be at least 1"));
        }
        if self.workflow.bottleneck_min_items == 0 {
            return Err(invalid("workflow.bottleneck_min_items", "must be at least 1"));
        }
        if self.workload.overloaded_above > 100 {
            return Err(invalid("workload.overloaded_above", "scores never exceed 100"));
        }
        if self.workload.low_below > self.workload.overloaded_above {
            return Err(invalid(
                "workload.low_below",
                "must not be above workload.overloaded_above",
            ));
        }
        if !(0.0..=1.0).contains(&self.workload.suggestion_confidence) {
            return Err(invalid("workload.suggestion_confidence", "must be within 0..=1"));
        }
        Ok(())
    }

    /// Schedule options for an optional single user.
    pub fn schedule_options(&self, user_id: Option<String>) -> ScheduleOptions {
        ScheduleOptions {
            days_ahead: self.schedule.days_ahead,
            staleness_days: self.schedule.staleness_days,
            user_id,
        }
    }

    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            bottleneck_min_items: self.workflow.bottleneck_min_items,
            bottleneck_wait_days: self.workflow.bottleneck_wait_days,
            sample_limit: self.workflow.sample_limit,
        }
    }

    pub fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            lookback_days: self.history.lookback_days,
            min_samples: self.history.min_samples,
            bottleneck_days: self.history.bottleneck_days,
        }
    }

    pub fn predictor_options(&self) -> PredictorOptions {
        PredictorOptions {
            stuck_days: self.prediction.stuck_days,
        }
    }

    pub fn workload_options(&self) -> WorkloadOptions {
        WorkloadOptions {
            overloaded_above: self.workload.overloaded_above,
            low_below: self.workload.low_below,
            low_max_items: self.workload.low_max_items,
            max_reassignments: self.workload.max_reassignments,
            suggestion_confidence: self.workload.suggestion_confidence,
        }
    }

    pub fn alert_options(&self) -> AlertOptions {
        AlertOptions {
            bottleneck_min_items: self.alerts.bottleneck_min_items,
            ..AlertOptions::default()
        }
    }

    /// Store location: the configured path or `slate.db` in the data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(p) if !p.trim().is_empty() => Ok(PathBuf::from(p)),
            _ => Ok(data_dir()?.join("slate.db")),
        }
    }
}
