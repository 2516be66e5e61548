use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "slate", version, about = "Production pipeline intelligence")]
struct Cli {
    /// Organization to analyze (defaults to organization_id in config)
    #[arg(long, global = true)]
    org: Option<String>,

    /// Record store path (defaults to database_path in config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full intelligence report
    Report {
        /// Render ASCII tables instead of JSON
        #[arg(long)]
        text: bool,
        /// Narrow user-facing sections to one assignee
        #[arg(long)]
        user: Option<String>,
    },
    /// Overdue, at-risk, conflicts and timeline
    Schedule {
        #[arg(long)]
        user: Option<String>,
        /// At-risk horizon in days
        #[arg(long)]
        days_ahead: Option<i64>,
    },
    /// Phase distribution, bottlenecks and velocity
    Workflow,
    /// Historical baseline over the lookback window
    History {
        #[arg(long)]
        lookback_days: Option<i64>,
        #[arg(long)]
        min_samples: Option<usize>,
    },
    /// Outcome predictions for open items
    Predict {
        /// Only predict this item id
        item_id: Option<String>,
    },
    /// Per-user workload and reassignment suggestions
    Workload,
    /// Severity-ranked alerts
    Alerts,
    /// Import items and events from a JSON document
    Import {
        /// Path to a {"organizationId", "items", "events"} document
        file: PathBuf,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::new(cli.org, cli.db);
    let result = match cli.command {
        Commands::Report { text, user } => commands::analyze::report(&ctx, text, user),
        Commands::Schedule { user, days_ahead } => commands::analyze::schedule(&ctx, user, days_ahead),
        Commands::Workflow => commands::analyze::workflow(&ctx),
        Commands::History {
            lookback_days,
            min_samples,
        } => commands::analyze::history(&ctx, lookback_days, min_samples),
        Commands::Predict { item_id } => commands::analyze::predict(&ctx, item_id),
        Commands::Workload => commands::analyze::workload(&ctx),
        Commands::Alerts => commands::analyze::alerts(&ctx),
        Commands::Import { file } => commands::import::run(&ctx, &file),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
