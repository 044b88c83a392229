//! Manual refresh endpoint.
//!
//! `POST /refresh` drops the loader's memo and forces a fetch from the
//! remote sheet, reporting how the reload went. The next `GET /dashboard`
//! then serves the freshly cached outcome.

use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::{LoadOutcome, Loader};

// ---

pub fn router() -> Router<Arc<Loader>> {
    // ---
    Router::new().route("/refresh", post(handler))
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    // ---
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

async fn handler(State(loader): State<Arc<Loader>>) -> impl IntoResponse {
    // ---
    info!("POST /refresh");

    match loader.refresh().await {
        LoadOutcome::Loaded(ds) => (
            StatusCode::OK,
            Json(RefreshResponse {
                status: "ok",
                record_count: Some(ds.len()),
                message: None,
            }),
        )
            .into_response(),
        LoadOutcome::Failed { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RefreshResponse {
                status: "error",
                record_count: None,
                message: Some(message),
            }),
        )
            .into_response(),
    }
}
