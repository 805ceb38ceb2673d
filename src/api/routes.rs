use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Uri},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::clock::{record_request_clock, ClockPolicy};
use crate::config::Config;
use crate::page;
use crate::pastes::PasteStore;
use crate::storage::Storage;

use super::handlers::{create_paste, get_paste, health_check, AppState};
use super::static_files::serve_static;

pub fn create_router(storage: Arc<dyn Storage>, config: &Config) -> Router {
    let state = Arc::new(AppState {
        pastes: PasteStore::new(storage, config.lifecycle.strict_view_limit),
        public_base_url: config.public_base_url.clone(),
    });

    let clock = ClockPolicy {
        allow_override: config.lifecycle.allow_clock_override,
    };

    let static_dir = config.frontend.static_dir.clone();

    Router::new()
        .route("/healthz", get(health_check))
        .route("/pastes", post(create_paste))
        .route("/pastes/{id}", get(get_paste))
        .route("/p/{id}", get(page::view_paste))
        .fallback(move |uri: Uri| serve_static(uri, static_dir.clone()))
        .layer(middleware::from_fn_with_state(clock, record_request_clock))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
