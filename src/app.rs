use crate::config::Config;
use crate::errors::Result;
use crate::fetch::GitHubClient;
use crate::merge::{join_series, reconcile};
use crate::models::MergeOutcome;
use crate::storage::{load_dataset, save_dataset};
use crate::ui::{render_report, write_report, ReportContext};
use chrono::Local;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: MergeOutcome,
    pub total_rows: usize,
    pub referrers: usize,
    pub report_path: PathBuf,
}

pub async fn run(config: &Config) -> Result<RunSummary> {
    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    run_at(config, &generated_at).await
}

/// One full pass: fetch, merge, render, persist. Nothing touches disk until
/// all three fetches have succeeded, and the dataset is saved only after the
/// report is on disk, so a failed run leaves the history as it found it.
pub async fn run_at(config: &Config, generated_at: &str) -> Result<RunSummary> {
    let client = GitHubClient::with_base_url(&config.token, &config.api_base)?;
    let snapshot = client.fetch_snapshot(&config.owner, &config.repo).await?;

    let existing = load_dataset(&config.data_path).await?;
    let fresh = join_series(&snapshot.clones, &snapshot.views);
    let (dataset, outcome) = reconcile(existing, fresh);

    let html = render_report(&ReportContext {
        owner: &config.owner,
        repo: &config.repo,
        dataset: &dataset,
        referrers: &snapshot.referrers,
        generated_at,
    });
    write_report(&config.output_path, &html).await?;

    if outcome.needs_write() {
        save_dataset(&config.data_path, &dataset).await?;
    }
    match &outcome {
        MergeOutcome::Created { rows } => {
            info!(rows, "created {}", config.data_path.display());
        }
        MergeOutcome::Appended { rows } => {
            info!(rows, "added new rows to {}", config.data_path.display());
        }
        MergeOutcome::Unchanged => info!("no new data to add to {}", config.data_path.display()),
    }

    Ok(RunSummary {
        outcome,
        total_rows: dataset.len(),
        referrers: snapshot.referrers.len(),
        report_path: config.output_path.clone(),
    })
}
