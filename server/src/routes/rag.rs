use axum::{
    extract::{Query, State},
    Json,
};
use deckhand::retrieval::load_directory;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_MAX_RESULTS: usize = 5;

/// Indexes everything in the documents directory.
pub async fn ingest(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let documents = load_directory(&state.documents_dir).await?;
    let report = state.index.ingest(documents).await?;
    info!(
        ingested = report.ingested_count,
        chunks = report.chunk_count,
        "Documents ingested"
    );

    Ok(Json(json!({
        "message": format!("Ingested {} of {} documents", report.ingested_count, report.total_files),
        "ingested_count": report.ingested_count,
        "total_files": report.total_files,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub max_results: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    if params.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    let results = state.index.search(&params.query, max_results).await?;

    Ok(Json(json!({
        "query": params.query,
        "results_count": results.len(),
        "results": results,
    })))
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "statistics": state.index.stats().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
