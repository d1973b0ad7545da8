//! Status command - reports whether the server is up and what it runs.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use nerloop_feedback::CyclePhase;
use serde::Serialize;

use super::Context;
use crate::client::Client;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also show the current review cycle
    #[arg(short, long)]
    pub detailed: bool,
}

#[derive(Debug, Default, Serialize)]
struct StatusOutput {
    running: bool,
    server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<CyclePhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exploration_rate: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip)]
    error: Option<String>,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;
    let mut output = StatusOutput {
        server_url: ctx.server_url.clone(),
        ..Default::default()
    };

    match client.health().await {
        Ok(health) => {
            output.running = true;
            output.version = Some(health.version);
            output.engine = Some(health.engine);
            output.storage = Some(health.storage);
            output.warnings = health.warnings.iter().map(ToString::to_string).collect();

            if args.detailed
                && let Ok(cycle) = client.cycle().await
            {
                output.phase = Some(cycle.phase);
                output.input = cycle.input;
                output.exploration_rate = Some(cycle.exploration_rate);
            }
        }
        Err(e) => output.error = Some(e.to_string()),
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        render(&output, ctx.verbose);
    }
    Ok(())
}

fn render(output: &StatusOutput, verbose: bool) {
    let dim = Style::new().dim();
    let field = |label: &str, value: &dyn std::fmt::Display| {
        println!("  {:<13} {}", dim.apply_to(label), value);
    };

    println!();
    println!("{}", style("nerloop server").bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    if output.running {
        field("status", &Style::new().green().apply_to("● running"));
    } else {
        field("status", &Style::new().red().apply_to("● not running"));
    }
    field("server", &output.server_url);

    for (label, value) in [
        ("version", &output.version),
        ("engine", &output.engine),
        ("storage", &output.storage),
    ] {
        if let Some(value) = value {
            field(label, value);
        }
    }
    if let Some(phase) = output.phase {
        field("cycle", &phase);
    }
    if let Some(ref input) = output.input {
        field("input", input);
    }
    if let Some(rate) = output.exploration_rate {
        field("exploration", &format!("{rate:.3}"));
    }
    for warning in &output.warnings {
        println!("  {} {}", Style::new().yellow().apply_to("warning:"), warning);
    }

    if !output.running {
        if verbose && let Some(ref error) = output.error {
            field("error", error);
        }
        println!();
        println!("  {}", dim.apply_to("Start the server with: nerloop start"));
    }
    println!();
}
