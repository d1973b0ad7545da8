//! nerloop - human feedback loop for named-entity recognition
//!
//! Main entry point for the nerloop CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;

use commands::{lookup, prefs, review, start, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// nerloop - review NER output and learn from the feedback
#[derive(Parser)]
#[command(name = "nerloop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://localhost:8080)
    #[arg(long, global = true, env = "NERLOOP_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the nerloop server
    Start(start::StartArgs),

    /// Show server status
    Status(status::StatusArgs),

    /// Review the entities found in a text
    Review(review::ReviewArgs),

    /// Show the preference table
    Prefs(prefs::PrefsArgs),

    /// Look up stored corrections for a text
    Lookup(lookup::LookupArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = nerloop_config::load_config(None).config.logging();

    // Initialize tracing: console (human-readable) + rotating JSON file
    let console_filter = match (&logging.level, cli.verbose) {
        (_, true) => "nerloop=debug,nerloop_feedback=debug,nerloop_server=debug,nerloop_ner=debug,nerloop_storage=debug,nerloop_config=debug,info".to_string(),
        (Some(level), false) => level.clone(),
        (None, false) => "nerloop=info,nerloop_feedback=info,nerloop_server=info,nerloop_ner=info,warn".to_string(),
    };

    use tracing_subscriber::prelude::*;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new(console_filter));

    let (file_layer, _guard) = if logging.json_file {
        let log_dir = logging
            .dir
            .clone()
            .or_else(|| nerloop_config::config_dir().map(|d| d.join("logs")))
            .unwrap_or_else(|| std::path::PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "nerloop.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "nerloop=trace,nerloop_feedback=trace,nerloop_server=trace,nerloop_ner=trace,nerloop_storage=trace,nerloop_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    // Get server URL
    let server_url = cli
        .server
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    // Create context for commands
    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Review(args) => review::run(args, &ctx).await,
        Commands::Prefs(args) => prefs::run(args, &ctx).await,
        Commands::Lookup(args) => lookup::run(args, &ctx).await,
    }
}
