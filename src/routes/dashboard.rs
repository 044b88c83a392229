//! The dashboard view endpoint.
//!
//! `GET /dashboard` assembles the complete view model for the monitoring
//! page: the four metric tiles, the sidebar column list, the multi-select
//! chart series, the time chart traces, the structure inspector, and the
//! tail-of-dataset table. When the load failed or the sheet is empty it
//! returns the fallback body with the expected schema instead.

use std::sync::Arc;

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{ColumnInfo, SensorRecord};
use crate::presenter::{self, Chart, MetricTile, Structure, Summary};
use crate::{LoadOutcome, Loader};

// ---

pub fn router() -> Router<Arc<Loader>> {
    // ---
    Router::new().route("/dashboard", get(handler))
}

/// Query parameters for the dashboard view.
#[derive(Debug, Deserialize)]
struct DashboardQuery {
    /// Comma-separated chart series. Absent means the default selection
    /// (first two numeric columns); present-but-empty means no chart.
    series: Option<String>,
}

/// Full view model for a non-empty dataset.
#[derive(Debug, Serialize)]
struct DashboardView {
    // ---
    status: &'static str,
    record_count: usize,
    synthetic_time_axis: bool,
    metrics: Vec<MetricTile>,
    summary: Summary,
    columns: Vec<ColumnInfo>,
    numeric_columns: Vec<String>,
    selected_series: Vec<String>,
    chart: Option<Chart>,
    structure: Structure,
    tail: Vec<SensorRecord>,
}

async fn handler(
    Query(params): Query<DashboardQuery>,
    State(loader): State<Arc<Loader>>,
) -> impl IntoResponse {
    // ---
    info!("GET /dashboard");

    let ds = match loader.load().await {
        LoadOutcome::Loaded(ds) if !ds.is_empty() => ds,
        LoadOutcome::Loaded(_) => {
            // Loaded fine but nothing there; still the troubleshooting view.
            return (
                StatusCode::OK,
                Json(presenter::fallback("sheet contains no data rows")),
            )
                .into_response();
        }
        LoadOutcome::Failed { message } => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(presenter::fallback(message)),
            )
                .into_response();
        }
    };

    let summary = presenter::summarize(&ds);
    let selected = presenter::select_series(&ds, params.series.as_deref());

    let view = DashboardView {
        status: "ok",
        record_count: ds.len(),
        synthetic_time_axis: ds.synthetic_time_axis,
        metrics: presenter::metric_tiles(&summary),
        summary,
        columns: ds.columns.clone(),
        numeric_columns: ds.numeric_columns(),
        chart: presenter::chart(&ds, &selected),
        selected_series: selected,
        structure: presenter::structure(&ds),
        tail: presenter::tail(&ds),
    };

    info!("Dashboard view built from {} records", view.record_count);
    (StatusCode::OK, Json(view)).into_response()
}
