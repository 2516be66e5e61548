mod config;
pub mod migrations;
pub mod store;

pub use config::{
    AlertsConfig, Config, HistoryConfig, PredictionConfig, ScheduleConfig, WorkflowConfig,
    WorkloadConfig,
};
pub use store::{ImportDocument, ImportSummary, SqliteStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/slate[-dev]/` based on SLATE_ENV.
///
/// Set SLATE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SLATE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("slate-dev")
    } else {
        base_dir.join("slate")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
