use chrono::Utc;
use slate_core::{Config, IntelligenceEngine};

use super::{print_json, CommandResult, Context};

fn engine_for(config: &Config) -> IntelligenceEngine {
    IntelligenceEngine::from_config(config)
}

pub fn report(ctx: &Context, text: bool, user: Option<String>) -> CommandResult {
    let config = ctx.config()?;
    let engine = engine_for(&config);
    let snapshot = ctx.snapshot(&config, &engine)?;
    let report = engine.analyze(&snapshot, Utc::now(), user.as_deref());

    if text {
        print!("{}", report.render_report());
        Ok(())
    } else {
        print_json(&report)
    }
}

pub fn schedule(ctx: &Context, user: Option<String>, days_ahead: Option<i64>) -> CommandResult {
    let mut config = ctx.config()?;
    if let Some(days) = days_ahead {
        config.schedule.days_ahead = days;
        config.validate()?;
    }
    let engine = engine_for(&config);
    let snapshot = ctx.snapshot(&config, &engine)?;
    print_json(&engine.schedule(&snapshot, Utc::now(), user.as_deref()))
}

pub fn workflow(ctx: &Context) -> CommandResult {
    let config = ctx.config()?;
    let engine = engine_for(&config);
    let snapshot = ctx.snapshot(&config, &engine)?;
    print_json(&engine.workflow(&snapshot, Utc::now()))
}

pub fn history(ctx: &Context, lookback_days: Option<i64>, min_samples: Option<usize>) -> CommandResult {
    let mut config = ctx.config()?;
    if let Some(days) = lookback_days {
        config.history.lookback_days = days;
    }
    if let Some(n) = min_samples {
        config.history.min_samples = n;
    }
    config.validate()?;

    let engine = engine_for(&config);
    let snapshot = ctx.snapshot(&config, &engine)?;
    print_json(&engine.baseline(&snapshot, Utc::now()))
}

pub fn predict(ctx: &Context, item_id: Option<String>) -> CommandResult {
    let config = ctx.config()?;
    let engine = engine_for(&config);
    let snapshot = ctx.snapshot(&config, &engine)?;
    let mut predictions = engine.predictions(&snapshot, Utc::now());

    if let Some(id) = item_id {
        predictions.retain(|p| p.item.id == id);
        if predictions.is_empty() {
            return Err(format!("no open item with id '{id}'").into());
        }
    }
    print_json(&predictions)
}

pub fn workload(ctx: &Context) -> CommandResult {
    let config = ctx.config()?;
    let engine = engine_for(&config);
    let snapshot = ctx.snapshot(&config, &engine)?;
    print_json(&engine.workload(&snapshot, Utc::now()))
}

pub fn alerts(ctx: &Context) -> CommandResult {
    let config = ctx.config()?;
    let engine = engine_for(&config);
    let snapshot = ctx.snapshot(&config, &engine)?;
    print_json(&engine.alerts(&snapshot, Utc::now()))
}
