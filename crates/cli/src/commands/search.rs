//! Model search CLI command.
//!
//! Runs every configured regressor over the predictor pool, prints the best
//! candidates and optionally writes all of them as JSON.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use flowcast_core::config_loader::DEFAULT_CONFIG_PATH;
use flowcast_core::{CancellationFlag, ConfigLoader};
use flowcast_search::{
    rank_candidates, CollectingObserver, ModelSearch, ScoredCandidate, SearchObserver,
    SearchSummary,
};

use crate::dataset::load_dataset;

/// Arguments for the search command.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Dataset CSV (first column `year`, one column per series)
    #[arg(short, long)]
    pub data: String,

    /// Write every candidate to this JSON file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Number of candidates to print
    #[arg(long, default_value = "10")]
    pub top: usize,
}

/// Collects candidates and forwards progress to the log.
#[derive(Debug, Default)]
struct LoggingObserver {
    inner: CollectingObserver,
    last_logged: u8,
}

impl SearchObserver for LoggingObserver {
    fn on_progress(&mut self, percent: u8) {
        if percent >= self.last_logged.saturating_add(10) || percent == 100 {
            tracing::info!("Search progress: {}%", percent);
            self.last_logged = percent;
        }
        self.inner.on_progress(percent);
    }

    fn on_message(&mut self, message: &str) {
        tracing::info!("{}", message);
        self.inner.on_message(message);
    }

    fn on_candidate(&mut self, candidate: &ScoredCandidate) {
        tracing::debug!("New candidate: {}", candidate.summary());
        self.inner.on_candidate(candidate);
    }
}

#[derive(Serialize)]
struct SearchReport<'a> {
    summary: &'a SearchSummary,
    candidates: &'a [ScoredCandidate],
}

/// Runs the search command.
///
/// # Errors
/// Returns an error if configuration or data cannot be loaded, the search
/// fails, or the output file cannot be written.
pub async fn run_search(args: SearchArgs) -> Result<()> {
    let problem = ConfigLoader::load_from(&args.config)?;
    let dataset = load_dataset(&args.data)?;

    tracing::info!(
        "Searching {} predictors with {} regressor(s)",
        problem.predictors.len(),
        problem.regressors.len()
    );

    let cancel = CancellationFlag::new();
    super::cancel_on_ctrl_c(&cancel);

    let (summary, mut candidates) = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut observer = LoggingObserver::default();
        let summary = ModelSearch::new(&problem, &dataset)
            .with_cancellation(cancel)
            .run(&mut observer)?;
        Ok((summary, observer.inner.into_candidates()))
    })
    .await
    .context("Search task failed")??;

    rank_candidates(&mut candidates);

    if summary.cancelled {
        tracing::warn!("Search cancelled; showing candidates found so far");
    }
    println!(
        "Evaluated {} subsets: {} candidates, {} rejected",
        summary.evaluated, summary.emitted, summary.rejected
    );
    println!("{}", format_top(&candidates, args.top));

    if let Some(path) = &args.output {
        let report = SearchReport {
            summary: &summary,
            candidates: &candidates,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {path}"))?;
        tracing::info!("Wrote {} candidates to {}", candidates.len(), path);
    }

    Ok(())
}

fn format_top(candidates: &[ScoredCandidate], top: usize) -> String {
    if candidates.is_empty() {
        return "No candidates found".to_string();
    }
    let mut output = String::new();
    for (rank, candidate) in candidates.iter().take(top).enumerate() {
        output.push_str(&format!("{:>3}. {}\n", rank + 1, candidate.summary()));
        output.push_str(&format!("     {}\n", candidate.predictors.join(", ")));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidate_list_is_reported() {
        assert_eq!(format_top(&[], 5), "No candidates found");
    }

    #[test]
    fn observer_collects_messages_and_progress() {
        let mut observer = LoggingObserver::default();
        observer.on_message("Starting");
        observer.on_progress(5);
        observer.on_progress(40);

        assert_eq!(observer.inner.messages, vec!["Starting".to_string()]);
        assert_eq!(observer.inner.last_progress, 40);
        assert_eq!(observer.last_logged, 40);
    }
}
