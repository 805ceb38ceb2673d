use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Extension,
};
use std::sync::Arc;

use super::render::{render_error, render_not_found, render_paste};
use crate::api::handlers::AppState;
use crate::clock::RequestClock;
use crate::pastes::PasteError;

/// Render a paste as an HTML page. Counts as a view, like the JSON read.
pub async fn view_paste(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(RequestClock(now)): Extension<RequestClock>,
) -> (StatusCode, Html<String>) {
    match state.pastes.open(&id, now).await {
        Ok(paste) => (StatusCode::OK, Html(render_paste(&paste))),
        Err(PasteError::NotFound(_)) | Err(PasteError::Validation(_)) => {
            (StatusCode::NOT_FOUND, Html(render_not_found()))
        }
        Err(PasteError::Storage(e)) => {
            tracing::error!(paste_id = %id, error = %e, "failed to open paste");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(render_error()))
        }
    }
}
