use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::ProgressBar;
use scout_pipeline::{Orchestrator, Outcome};
use scout_protocol::{Candidate, ContextOption, Query, ReportArtifact};
use std::future::Future;
use std::time::Duration;

use crate::render;

const BACK: &str = "<- Back to list";

async fn with_spinner<T>(message: &str, work: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let out = work.await;
    spinner.finish_and_clear();
    out
}

fn pick_candidate(candidates: &[Candidate]) -> Result<&Candidate> {
    let items: Vec<String> = candidates.iter().map(render::candidate_line).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select player")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(&candidates[index])
}

/// `None` means the caller wants to go back to the candidate list.
fn pick_context(options: &[ContextOption]) -> Result<Option<&ContextOption>> {
    let mut items: Vec<String> = options.iter().map(render::context_line).collect();
    items.push(BACK.to_string());
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select season")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(options.get(index))
}

/// Search, pick a player, pick a season, generate.
pub async fn run(orchestrator: Orchestrator, query: Query) -> Result<ReportArtifact> {
    let mut session = orchestrator.session();
    let mut outcome = with_spinner("Searching...", session.search(query)).await?;

    loop {
        let candidates = match outcome {
            Outcome::Report(artifact) => return Ok(artifact),
            Outcome::Candidates(candidates) => candidates,
        };
        if candidates.is_empty() {
            anyhow::bail!("No players matched the query");
        }

        let context = loop {
            let candidate = pick_candidate(&candidates)?;
            let options = with_spinner(
                "Loading seasons...",
                session.select_candidate(&candidate.id),
            )
            .await?
            .to_vec();
            if let Some(option) = pick_context(&options)? {
                break option.clone();
            }
        };
        session.select_context(&context.key())?;

        outcome = with_spinner(
            &format!("Generating report for {}...", context.label),
            session.generate_report(),
        )
        .await?;
    }
}
