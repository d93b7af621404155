use axum::{extract::State, Json};
use deckhand::retrieval::documents::list_documents;
use deckhand::retrieval::DocumentInfo;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<DocumentInfo>>, ApiError> {
    Ok(Json(list_documents(&state.documents_dir).await?))
}
