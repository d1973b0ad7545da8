//! Prefs command - shows the preference table.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;
use crate::client::Client;

/// Arguments for the prefs command.
#[derive(Args, Debug)]
pub struct PrefsArgs {
    /// Only show entities whose text contains this string
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Run the prefs command.
pub async fn run(args: PrefsArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;
    let prefs = client.preferences().await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&prefs)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Preference table").bold());
    println!("{}", dim.apply_to("─".repeat(48)));
    println!(
        "  {} {:.3} (floor {:.3})",
        dim.apply_to("Exploration rate:"),
        prefs.exploration_rate,
        prefs.min_exploration_rate
    );
    println!(
        "  {} lr={} gamma={}{}",
        dim.apply_to("Update:"),
        prefs.learning_rate,
        prefs.discount_factor,
        if prefs.persisted { ", persisted" } else { "" }
    );
    println!();

    let rows: Vec<_> = prefs
        .preferences
        .iter()
        .filter(|(entity, _)| {
            args.filter
                .as_deref()
                .is_none_or(|needle| entity.contains(needle))
        })
        .collect();

    if rows.is_empty() {
        println!("  {}", dim.apply_to("No entities yet."));
        println!();
        return Ok(());
    }

    println!(
        "  {:<28} {:>9} {:>9}  {}",
        "entity", "accept", "reject", "best"
    );
    for (entity, scores) in rows {
        let best = scores.best_action();
        println!(
            "  {:<28} {:>9.3} {:>9.3}  {}",
            entity, scores.accept, scores.reject, best
        );
    }
    println!();
    Ok(())
}
