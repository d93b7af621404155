use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use deckhand::processor::Presentation;
use deckhand::storage::guess_content_type;
use deckhand::{Job, JobStatus, ProcessingOptions};
use serde_json::json;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

fn completed_job(state: &AppState, job_id: &str) -> Result<Job, ApiError> {
    let job = state.store.get(job_id)?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "Job {} is {}, results are not available",
            job_id, job.status
        )));
    }
    Ok(job)
}

fn result_ref<'a>(job: &'a Job, extension: &str) -> Result<&'a String, ApiError> {
    let suffix = format!(".{}", extension);
    job.result_refs
        .iter()
        .find(|locator| locator.ends_with(&suffix))
        .ok_or_else(|| ApiError::NotFound(format!("No {} result for job {}", extension, job.job_id)))
}

pub async fn process_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let options = processing_options(request).await?;

    // The handle is dropped; the job reports through the store and notifier.
    state.runner.submit(&job_id, options)?;
    info!(job_id = %job_id, strategy = %options.naming_strategy, "Job scheduled");

    Ok((
        StatusCode::OK,
        Json(json!({ "job_id": job_id, "status": JobStatus::Processing })),
    ))
}

/// Options come as form fields or a JSON body; an empty body means defaults.
async fn processing_options(request: Request) -> Result<ProcessingOptions, ApiError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(options) = Form::<ProcessingOptions>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid processing options: {}", e.body_text())))?;
        return Ok(options);
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if body.is_empty() {
        return Ok(ProcessingOptions::default());
    }
    serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid processing options: {}", e)))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.store.get(&job_id)?))
}

pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "jobs": state.store.list() }))
}

/// Removes the job and its artifacts. Deleting an unknown job is not an error.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let removed = state.store.delete(&job_id);

    if let Some(job) = &removed {
        for locator in job.source.iter().chain(job.result_refs.iter()) {
            if let Err(e) = state.artifacts.remove(locator).await {
                warn!(job_id = %job_id, "Failed to remove artifact {}: {}", locator, e);
            }
        }
        info!(job_id = %job_id, "Job deleted");
    }

    Json(json!({ "job_id": job_id, "deleted": removed.is_some() }))
}

pub async fn download(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    if kind != "json" && kind != "pptx" {
        return Err(ApiError::NotFound(format!("Unknown result type: {}", kind)));
    }

    let job = completed_job(&state, &job_id)?;
    let locator = result_ref(&job, &kind)?;
    let bytes = state.artifacts.read(locator).await?;

    let filename = format!("{}_enhanced.{}", job_id, kind);
    let headers = [
        (header::CONTENT_TYPE, guess_content_type(&filename)),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, bytes))
}

pub async fn get_presentation(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Presentation>, ApiError> {
    let job = completed_job(&state, &job_id)?;
    let bytes = state.artifacts.read(result_ref(&job, "json")?).await?;
    let presentation = serde_json::from_slice(&bytes).map_err(ApiError::internal)?;
    Ok(Json(presentation))
}

/// Replaces the enhanced JSON with an edited presentation.
pub async fn put_presentation(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let job = completed_job(&state, &job_id)?;
    let presentation: Presentation = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid presentation: {}", e)))?;

    let json = serde_json::to_vec_pretty(&presentation).map_err(ApiError::internal)?;
    let name = format!("{}_enhanced.json", job.job_id);
    state.artifacts.write_output(&name, &json).await?;
    info!(job_id = %job_id, shapes = presentation.shape_count(), "Presentation updated");

    Ok(Json(json!({
        "message": "Presentation updated",
        "job_id": job_id,
    })))
}
