//! Background approval runs started from the web UI.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::catalog::{Catalog, Category, ImageType};
use crate::decision::RemoteDecider;
use crate::error::FetchError;
use crate::fetcher::{CategoryFetcher, RunReport};

use super::AppState;

/// Where the background run is at.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Nothing has been started yet
    #[default]
    Idle,
    /// A run is walking its pairs
    Running,
    /// The last run is done, see its report
    Finished,
}

/// Reported by `GET /api/runs`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStatus {
    /// Current state
    pub state: RunState,
    /// RFC 3339 start time of the current or last run
    pub started_at: Option<String>,
    /// RFC 3339 end time of the last run
    pub finished_at: Option<String>,
    /// Categories the run covers
    pub categories: Vec<Category>,
    /// Image types the run covers
    pub image_types: Vec<ImageType>,
    /// Report of the last finished run
    pub report: Option<RunReport>,
}

/// Body of `POST /api/runs`, both lists default to the whole catalog.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Category names
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// Image type names
    #[serde(default)]
    pub image_types: Option<Vec<String>>,
}

impl RunRequest {
    fn resolve(&self, catalog: &Catalog) -> Result<(Vec<Category>, Vec<ImageType>), FetchError> {
        let categories = match &self.categories {
            Some(names) => names
                .iter()
                .map(|name| catalog.category(name))
                .collect::<Result<Vec<_>, _>>()?,
            None => catalog.categories().to_vec(),
        };
        let image_types = match &self.image_types {
            Some(names) => names
                .iter()
                .map(|name| catalog.image_type(name))
                .collect::<Result<Vec<_>, _>>()?,
            None => catalog.image_types().to_vec(),
        };
        if categories.is_empty() || image_types.is_empty() {
            return Err(FetchError::InvalidInput(
                "a run needs at least one category and one image type".to_string(),
            ));
        }
        Ok((categories, image_types))
    }
}

/// Marks a run as started and spawns it. Conflict if one is still going.
pub(crate) async fn start_run(
    state: &AppState,
    request: &RunRequest,
) -> Result<RunStatus, FetchError> {
    let (categories, image_types) = request.resolve(&state.catalog)?;

    let mut status = state.runs.write().await;
    if status.state == RunState::Running {
        return Err(FetchError::Conflict("a run is already in progress".to_string()));
    }
    *status = RunStatus {
        state: RunState::Running,
        started_at: Some(Utc::now().to_rfc3339()),
        finished_at: None,
        categories: categories.clone(),
        image_types: image_types.clone(),
        report: None,
    };
    let started = status.clone();
    drop(status);

    info!(
        "Starting approval run over {} categories x {} types",
        categories.len(),
        image_types.len()
    );
    let mut fetcher = CategoryFetcher::new(
        state.catalog.clone(),
        state.store.clone(),
        state.sources.clone(),
        RemoteDecider::new(state.approvals.clone()),
        state.retriever.clone(),
        state.config.clone(),
    )
    .with_save_lock(state.save_lock.clone());
    let progress = state.progress.clone();
    let approvals = state.approvals.clone();
    let runs = state.runs.clone();
    tokio::spawn(async move {
        let report = fetcher.run(&categories, &image_types, &progress).await;
        approvals.cancel();
        finish_run(&runs, report).await;
    });
    Ok(started)
}

async fn finish_run(runs: &Arc<RwLock<RunStatus>>, report: RunReport) {
    let mut status = runs.write().await;
    status.state = RunState::Finished;
    status.finished_at = Some(Utc::now().to_rfc3339());
    status.report = Some(report);
}
