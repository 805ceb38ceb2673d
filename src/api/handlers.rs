use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::clock::RequestClock;
use crate::lifecycle::format_timestamp;
use crate::models::{CreatePasteRequest, CreatePasteResponse, NewPaste, PasteView};
use crate::pastes::{PasteError, PasteStore};

pub struct AppState {
    pub pastes: PasteStore,
    /// Share links are built from this when set, otherwise from the Host
    /// header of the creating request.
    pub public_base_url: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: PasteError) -> ApiError {
    let (status, message) = match err {
        PasteError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        PasteError::NotFound(_) => (StatusCode::NOT_FOUND, "Paste not found".to_string()),
        PasteError::Storage(e) => {
            tracing::error!(error = %e, "storage operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse { error: message }))
}

/// Build the shareable `/p/{id}` link for a paste.
pub fn share_url(public_base_url: Option<&str>, headers: &HeaderMap, id: &str) -> String {
    if let Some(base) = public_base_url {
        return format!("{base}/p/{id}");
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .unwrap_or("http");

    format!("{scheme}://{host}/p/{id}")
}

/// Create a new paste
pub async fn create_paste(
    State(state): State<Arc<AppState>>,
    Extension(RequestClock(now)): Extension<RequestClock>,
    headers: HeaderMap,
    payload: Result<Json<CreatePasteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePasteResponse>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        (
            rejection.status(),
            Json(ErrorResponse {
                error: format!("Invalid request body: {}", rejection.body_text()),
            }),
        )
    })?;

    let paste = NewPaste::try_from(payload).map_err(|e| error_response(e.into()))?;
    let record = state
        .pastes
        .create(paste, now)
        .await
        .map_err(error_response)?;

    let url = share_url(state.public_base_url.as_deref(), &headers, &record.id);
    Ok((
        StatusCode::CREATED,
        Json(CreatePasteResponse { id: record.id, url }),
    ))
}

/// Fetch a paste's content. Counts as a view.
pub async fn get_paste(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(RequestClock(now)): Extension<RequestClock>,
) -> Result<Json<PasteView>, ApiError> {
    let paste = state.pastes.open(&id, now).await.map_err(error_response)?;

    Ok(Json(PasteView {
        content: paste.content,
        remaining_views: paste.remaining_views,
        expires_at: paste.expires_at.map(format_timestamp),
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    if state.pastes.is_healthy().await {
        (StatusCode::OK, Json(HealthResponse { ok: true }))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse { ok: false }),
        )
    }
}
