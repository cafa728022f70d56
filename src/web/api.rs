//! JSON handlers under `/api`.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::candidate::{Candidate, is_retrievable_url};
use crate::catalog::{Category, ImageType};
use crate::constants::MAX_CANDIDATES_PER_REQUEST;
use crate::decision::Decision;
use crate::error::FetchError;
use crate::normalize::normalize_image_blocking;
use crate::progress::Progress;
use crate::retrieve::Retriever;
use crate::sources::CandidateSource;

use super::AppState;
use super::runs::{RunRequest, RunStatus, start_run};

const DEFAULT_CANDIDATE_COUNT: u32 = 10;

#[derive(Serialize)]
pub(crate) struct CategoriesResponse {
    categories: Vec<Category>,
    image_types: Vec<ImageType>,
}

pub(crate) async fn categories_handler(State(state): State<AppState>) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: state.catalog.categories().to_vec(),
        image_types: state.catalog.image_types().to_vec(),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidatesQuery {
    category: String,
    count: Option<u32>,
}

#[derive(Serialize)]
pub(crate) struct CandidatesResponse {
    images: Vec<Candidate>,
}

pub(crate) async fn candidates_handler(
    State(state): State<AppState>,
    Path(image_type): Path<String>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<CandidatesResponse>, FetchError> {
    let image_type = state.catalog.image_type(&image_type)?;
    let category = state.catalog.category(&query.category)?;
    let count = query
        .count
        .unwrap_or(DEFAULT_CANDIDATE_COUNT)
        .clamp(1, MAX_CANDIDATES_PER_REQUEST);

    let images = state.sources.candidates(&image_type, &category, count).await;
    debug!(
        "Offering {} {} candidates for {}",
        images.len(),
        image_type,
        category
    );
    Ok(Json(CandidatesResponse { images }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadRequest {
    candidate: Candidate,
    category: String,
    image_type: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadResponse {
    success: bool,
    filename: String,
    index: u32,
    count: u32,
    target: u32,
}

pub(crate) async fn download_handler(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<DownloadResponse>, FetchError> {
    let category = state.catalog.category(&request.category)?;
    let image_type = state.catalog.image_type(&request.image_type)?;
    let url = request.candidate.url.trim();
    if !is_retrievable_url(url) {
        return Err(FetchError::InvalidInput(
            "candidate has no usable url".to_string(),
        ));
    }

    let target = state.config.target_count;
    // quota check and save have to be atomic across concurrent requests
    let _guard = state.save_lock.lock().await;
    let existing = state.store.count_existing(&category, &image_type).await?;
    if existing >= target {
        return Err(FetchError::Conflict(format!(
            "{category} ({image_type}) already has {existing}/{target} images"
        )));
    }

    let bytes = state.retriever.retrieve(url).await?;
    let jpeg = normalize_image_blocking(bytes, state.config.normalize).await?;
    let (index, path) = state.store.save_next(&category, &image_type, &jpeg).await?;
    let count = state.store.count_existing(&category, &image_type).await?;
    state
        .progress
        .record(&image_type, &category, count, target)
        .await?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    info!("Saved {filename} ({count}/{target})");
    Ok(Json(DownloadResponse {
        success: true,
        filename,
        index,
        count,
        target,
    }))
}

pub(crate) async fn progress_handler(State(state): State<AppState>) -> Json<Progress> {
    Json(state.progress.snapshot().await)
}

pub(crate) async fn run_status_handler(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.runs.read().await.clone())
}

pub(crate) async fn start_run_handler(
    State(state): State<AppState>,
    body: Option<Json<RunRequest>>,
) -> Result<(StatusCode, Json<RunStatus>), FetchError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let status = start_run(&state, &request).await?;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

pub(crate) async fn pending_approval_handler(State(state): State<AppState>) -> Response {
    match state.approvals.pending() {
        Some(summary) => Json(summary).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovalRequest {
    decision: Decision,
}

pub(crate) async fn answer_approval_handler(
    State(state): State<AppState>,
    Json(request): Json<ApprovalRequest>,
) -> Result<Json<serde_json::Value>, FetchError> {
    state.approvals.answer(request.decision)?;
    Ok(Json(json!({ "decision": request.decision })))
}
