use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::events::job_events;
use crate::state::AppState;

pub mod documents;
pub mod jobs;
pub mod rag;
pub mod upload;

/// Every HTTP and WebSocket route, with request tracing and CORS.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route(
            "/upload/presentation",
            post(upload::upload_presentation),
        )
        .route("/upload/documents", post(upload::upload_documents))
        .route("/process/{job_id}", post(jobs::process_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", axum::routing::delete(jobs::delete_job))
        .route("/jobs/{job_id}/status", get(jobs::job_status))
        .route(
            "/jobs/{job_id}/presentation",
            get(jobs::get_presentation).put(jobs::put_presentation),
        )
        .route("/download/{job_id}/{kind}", get(jobs::download))
        .route("/rag/ingest", post(rag::ingest))
        .route("/rag/search", get(rag::search))
        .route("/rag/stats", get(rag::stats))
        .route("/documents", get(documents::list));

    Router::new()
        .nest("/api", api)
        .route("/ws", get(job_events))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "jobs": state.store.counts(),
            "running_jobs": state.runner.running(),
        })),
    )
}
