pub mod analyze;
pub mod config;
pub mod import;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use slate_core::{gather, Config, IntelligenceEngine, Snapshot, SqliteStore};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Global flags plus the loaded configuration.
pub struct Context {
    org: Option<String>,
    db: Option<PathBuf>,
}

impl Context {
    pub fn new(org: Option<String>, db: Option<PathBuf>) -> Self {
        Self { org, db }
    }

    pub fn config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        Ok(Config::load()?)
    }

    pub fn organization_id(&self, config: &Config) -> Result<String, Box<dyn std::error::Error>> {
        self.org
            .clone()
            .or_else(|| config.organization_id.clone())
            .filter(|o| !o.trim().is_empty())
            .ok_or_else(|| "no organization: pass --org or set organization_id in config".into())
    }

    pub fn open_store(&self, config: &Config) -> Result<SqliteStore, Box<dyn std::error::Error>> {
        let path = match &self.db {
            Some(p) => p.clone(),
            None => config.database_path()?,
        };
        Ok(SqliteStore::open(&path)?)
    }

    /// Gather a snapshot for the resolved organization.
    pub fn snapshot(&self, config: &Config, engine: &IntelligenceEngine) -> Result<Snapshot, Box<dyn std::error::Error>> {
        let org = self.organization_id(config)?;
        let store = Arc::new(self.open_store(config)?);
        let runtime = tokio::runtime::Runtime::new()?;
        Ok(runtime.block_on(gather(store, &org, Utc::now(), engine.lookback_days())))
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
