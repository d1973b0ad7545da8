//! Review command - interactive judgment of NER output.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};

use nerloop_feedback::{Action, CyclePhase, CycleSummary, CycleView, ReviewPrompt};
use nerloop_server::routes::{FinishRequest, JudgeRequest};

use super::Context;
use crate::client::Client;

/// Arguments for the review command.
#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Text to run NER over
    pub text: String,

    /// Accept every entity without prompting
    #[arg(long)]
    pub accept_all: bool,

    /// Skip the prompt for a missed entity
    #[arg(long)]
    pub no_manual: bool,

    /// Abandon a cycle already in progress
    #[arg(short, long)]
    pub force: bool,
}

/// Reviewer's answer for one entity.
#[derive(Debug, PartialEq)]
enum Answer {
    Judge {
        is_correct: bool,
        correction: Option<String>,
    },
    Quit,
}

/// Run the review command.
pub async fn run(args: ReviewArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;

    let current = client.cycle().await?;
    if matches!(
        current.phase,
        CyclePhase::ReviewEntities | CyclePhase::AwaitManualAdd
    ) {
        if !args.force {
            bail!(
                "a cycle is already in progress ({}); rerun with --force to abandon it",
                current.phase
            );
        }
        client.reset().await?;
    }

    let mut view = client.submit(&args.text).await?;

    if view.phase == CyclePhase::ShowStored {
        print_stored(&view, ctx)?;
        return Ok(());
    }

    while let Some(prompt) = view.prompt.clone() {
        let answer = if args.accept_all {
            Answer::Judge {
                is_correct: true,
                correction: None,
            }
        } else {
            ask_judgment(&prompt)?
        };

        let Answer::Judge {
            is_correct,
            correction,
        } = answer
        else {
            client.reset().await?;
            if !ctx.json_output {
                println!("{}", Style::new().dim().apply_to("Review abandoned."));
            }
            return Ok(());
        };

        let response = client
            .judge(&JudgeRequest {
                entity: Some(prompt.entity.text.clone()),
                is_correct,
                correction,
            })
            .await?;
        if ctx.verbose {
            let j = &response.judgment;
            eprintln!(
                "{} {} -> accept={:.3} reject={:.3} exploration={:.3}",
                j.entity, j.action, j.scores.accept, j.scores.reject, j.exploration_rate
            );
        }
        view = response.cycle;
    }

    if view.phase != CyclePhase::AwaitManualAdd {
        bail!("unexpected cycle state: {}", view.phase);
    }
    if view.entities.is_empty() && !ctx.json_output {
        println!("{}", Style::new().yellow().apply_to("No entities recognized."));
    }

    let summary = if args.no_manual || args.accept_all {
        client.finish(&FinishRequest::default()).await?
    } else {
        loop {
            let finish = ask_manual()?;
            let manual = finish.entity_text.is_some();
            match client.finish(&finish).await {
                Ok(summary) => break summary,
                // Without a manual entity there is nothing to re-enter.
                Err(e) if !manual => return Err(e),
                Err(e) => println!(
                    "  {} {}",
                    Style::new().red().apply_to("Could not add entity:"),
                    e
                ),
            }
        }
    };
    print_summary(&summary, ctx)
}

fn read_line(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn ask_judgment(prompt: &ReviewPrompt) -> Result<Answer> {
    let dim = Style::new().dim();
    println!();
    println!(
        "{} {} {}",
        dim.apply_to(format!("[{}/{}]", prompt.index + 1, prompt.total)),
        style(&prompt.entity.text).bold(),
        dim.apply_to(format!(
            "({}, {:.2})",
            prompt.entity.label, prompt.entity.score
        ))
    );
    println!(
        "  {} accept={:.3} reject={:.3}  suggested: {}",
        dim.apply_to("scores:"),
        prompt.scores.accept,
        prompt.scores.reject,
        suggestion_style(prompt.suggested_action).apply_to(prompt.suggested_action)
    );

    loop {
        let input = read_line("  Is this entity correct? [y/n/q] ")?;
        match parse_judgment(&input) {
            Some(Answer::Quit) => return Ok(Answer::Quit),
            Some(Answer::Judge { is_correct, .. }) => {
                let correction = read_line("  Correction (blank for none): ")?;
                return Ok(Answer::Judge {
                    is_correct,
                    correction: (!correction.is_empty()).then_some(correction),
                });
            }
            None => println!("  Please answer y, n or q."),
        }
    }
}

fn parse_judgment(input: &str) -> Option<Answer> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(Answer::Judge {
            is_correct: true,
            correction: None,
        }),
        "n" | "no" => Some(Answer::Judge {
            is_correct: false,
            correction: None,
        }),
        "q" | "quit" => Some(Answer::Quit),
        _ => None,
    }
}

fn suggestion_style(action: Action) -> Style {
    match action {
        Action::Accept => Style::new().green(),
        Action::Reject => Style::new().red(),
    }
}

fn ask_manual() -> Result<FinishRequest> {
    println!();
    let entity_text = read_line("Missed entity text (blank to skip): ")?;
    if entity_text.is_empty() {
        return Ok(FinishRequest::default());
    }
    let entity_type = read_line("Entity type: ")?;
    Ok(FinishRequest {
        entity_text: Some(entity_text),
        entity_type: Some(entity_type),
    })
}

fn print_stored(view: &CycleView, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Stored corrections").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    for (entity, corrected) in &view.corrections {
        println!("  {} {} {}", entity, dim.apply_to("→"), corrected);
    }
    println!();
    Ok(())
}

fn print_summary(summary: &CycleSummary, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let red = Style::new().red();
    println!();
    println!("{}", style("Cycle finished").bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    if !summary.corrections.is_empty() {
        println!("  {}", dim.apply_to("Corrections:"));
        for (entity, corrected) in &summary.corrections {
            println!("    {} {} {}", entity, dim.apply_to("→"), corrected);
        }
    }

    for status in [
        Some(&summary.persist.corrected_entities),
        Some(&summary.persist.feedback_history),
        summary.persist.preference_table.as_ref(),
    ]
    .into_iter()
    .flatten()
    {
        if let Some(ref error) = status.error {
            println!("  {} {}: {}", red.apply_to("save failed"), status.key, error);
        }
    }

    println!();
    println!(
        "  {:<24} {:>9} {:>9}",
        dim.apply_to("entity"),
        dim.apply_to("accept"),
        dim.apply_to("reject")
    );
    for (entity, scores) in summary.preferences.iter() {
        println!("  {:<24} {:>9.3} {:>9.3}", entity, scores.accept, scores.reject);
    }
    println!();
    Ok(())
}
