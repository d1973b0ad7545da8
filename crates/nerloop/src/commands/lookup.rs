//! Lookup command - shows stored corrections for a text.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;
use crate::client::Client;

/// Arguments for the lookup command.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Exact input text
    pub text: String,
}

/// Run the lookup command.
pub async fn run(args: LookupArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;
    let found = client.corrections(&args.text).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    match found {
        Some(found) => {
            println!();
            println!("{}", style("Stored corrections").bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            for (entity, corrected) in &found.corrections {
                println!("  {} {} {}", entity, dim.apply_to("→"), corrected);
            }
            println!();
        }
        None => {
            println!("{}", dim.apply_to("No corrections stored for this text."));
        }
    }
    Ok(())
}
