//! # Slate Core Library
//!
//! Derived operational intelligence for a production pipeline of pitches and
//! stories. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Items**: typed pitch/story records with per-kind status taxonomies,
//!   converted from untyped store records at the boundary
//! - **Analyzers**: synchronous, side-effect free functions of their inputs
//!   and an explicit `now`
//! - **Gather**: concurrent per-source fetch that degrades a failing source to
//!   an empty input instead of failing the request
//! - **Storage**: SQLite record store and TOML configuration
//!
//! ## Key Components
//!
//! - [`ScheduleAnalyzer`]: overdue, at-risk, conflicts and timeline
//! - [`WorkflowAnalyzer`]: phase distribution, bottlenecks and velocity
//! - [`HistoricalPatternLearner`]: per-status baselines over a lookback window
//! - [`OutcomePredictor`]: per-item completion estimate and stuck risk
//! - [`WorkloadScorer`]: per-user load scores and reassignment proposals
//! - [`AlertGenerator`]: severity-ranked alerts with suggested actions
//! - [`IntelligenceEngine`]: runs all of the above over a [`Snapshot`]

pub mod alerts;
pub mod classifier;
pub mod error;
pub mod gather;
pub mod history;
pub mod item;
pub mod predict;
pub mod report;
pub mod schedule;
pub mod storage;
pub mod workflow;
pub mod workload;

pub use alerts::{Alert, AlertGenerator, AlertOptions, AlertSummary, AlertType, Severity};
pub use classifier::{classify, classify_label, Classification, PhaseDistribution};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use gather::{gather, ItemQuery, MemorySource, Snapshot, SourceFailure, SourceKind, WorkSource};
pub use history::{HistoricalBaseline, HistoricalPatternLearner, HistoryOptions};
pub use item::{
    CalendarEvent, EntityKind, ItemRef, ItemStatus, Phase, PitchStatus, StoryStatus, WorkItem,
    WorkRecord,
};
pub use predict::{OutcomePredictor, Prediction, PredictorOptions};
pub use report::{IntelligenceEngine, IntelligenceReport};
pub use schedule::{ScheduleAnalyzer, ScheduleOptions, ScheduleSignals};
pub use storage::{Config, SqliteStore};
pub use workflow::{WorkflowAnalyzer, WorkflowOptions, WorkflowSignals};
pub use workload::{WorkloadOptions, WorkloadReport, WorkloadScorer};
