use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    Json,
};
use deckhand::retrieval::documents::{is_supported_document, save_document};
use deckhand::sanitize::extension;
use deckhand::{Job, TOTAL_STEPS};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

const PRESENTATION_EXTENSIONS: &[&str] = &["pptx", "ppt"];

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
}

/// Stores an uploaded presentation and creates its job.
pub async fn upload_presentation(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Job>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Missing file name".to_string()))?;
        let is_presentation = extension(&filename)
            .is_some_and(|ext| PRESENTATION_EXTENSIONS.contains(&ext.as_str()));
        if !is_presentation {
            return Err(ApiError::BadRequest(
                "Only .pptx and .ppt files are supported".to_string(),
            ));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        let locator = state.artifacts.store(&filename, &bytes).await?;

        let job = match state.store.create_with_source(
            &filename,
            TOTAL_STEPS,
            Some(locator.clone()),
            bytes.len() as u64,
        ) {
            Ok(job) => job,
            Err(e) => {
                if let Err(remove_err) = state.artifacts.remove(&locator).await {
                    warn!("Failed to remove orphaned upload {}: {}", locator, remove_err);
                }
                return Err(e.into());
            }
        };

        state.broadcaster.publish(job.clone());
        info!(job_id = %job.job_id, filename = %filename, size = job.file_size, "Presentation uploaded");
        return Ok(Json(job));
    }

    Err(ApiError::BadRequest("Missing 'file' field".to_string()))
}

#[derive(Debug, Serialize)]
struct DocumentResult {
    filename: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DocumentResult {
    fn saved(filename: String, size: usize) -> Self {
        Self {
            filename,
            status: "uploaded",
            size: Some(size),
            error: None,
        }
    }

    fn failed(filename: String, error: impl Into<String>) -> Self {
        Self {
            filename,
            status: "error",
            size: None,
            error: Some(error.into()),
        }
    }
}

/// Saves reference documents; each file succeeds or fails on its own.
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut results = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        if !is_supported_document(&filename) {
            results.push(DocumentResult::failed(filename, "Unsupported file type"));
            continue;
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        match save_document(&state.documents_dir, &filename, &bytes).await {
            Ok(_) => results.push(DocumentResult::saved(filename, bytes.len())),
            Err(e) => {
                warn!("Failed to save document {}: {}", filename, e);
                results.push(DocumentResult::failed(filename, e.to_string()));
            }
        }
    }

    let uploaded_count = results.iter().filter(|r| r.status == "uploaded").count();
    let error_count = results.len() - uploaded_count;
    info!(uploaded_count, error_count, "Documents uploaded");

    Ok(Json(json!({
        "uploaded_count": uploaded_count,
        "error_count": error_count,
        "results": results,
    })))
}
