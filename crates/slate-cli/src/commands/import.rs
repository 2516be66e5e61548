use std::path::Path;

use super::{print_json, CommandResult, Context};

pub fn run(ctx: &Context, file: &Path) -> CommandResult {
    let config = ctx.config()?;
    let json = std::fs::read_to_string(file)
        .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let store = ctx.open_store(&config)?;
    let summary = store.import_json(&json)?;
    print_json(&summary)
}
