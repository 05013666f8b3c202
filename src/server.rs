//! HTTP trigger surface.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /api/cron` | Run the pipeline now and report the outcome |
//! | `GET /api/status` | Last run outcome and schedule |
//! | `GET /health` | Liveness |

use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use crate::worker::{PipelineHandle, RunStatus};

#[derive(Debug, Clone)]
pub struct AppState {
    pipeline: PipelineHandle,
    interval_secs: Option<u64>,
}

impl AppState {
    pub fn new(pipeline: PipelineHandle, interval_secs: Option<u64>) -> Self {
        Self {
            pipeline,
            interval_secs,
        }
    }
}

#[derive(Debug, Serialize)]
struct RunResponse {
    success: bool,
    message: String,
    timestamp: String,
    processed: usize,
    written: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    interval_secs: Option<u64>,
    #[serde(flatten)]
    status: RunStatus,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/cron", get(run_now))
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[instrument(level = "info", skip_all)]
async fn run_now(State(state): State<AppState>) -> Response {
    match state.pipeline.trigger().await {
        Ok(report) => Json(RunResponse {
            success: true,
            message: report.message(),
            timestamp: report.timestamp,
            processed: report.processed,
            written: report.written,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Error in newsletter curation run");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to process articles",
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        interval_secs: state.interval_secs,
        status: state.pipeline.status().await,
    })
}

/// Trigger a run every `every`, starting one interval from now.
pub fn spawn_schedule(pipeline: PipelineHandle, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            info!("Scheduled curation run starting");
            match pipeline.trigger().await {
                Ok(report) => info!(processed = report.processed, written = report.written, "Scheduled run finished"),
                Err(e) => error!(error = %e, "Scheduled run failed"),
            }
        }
    })
}

pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(state)).await
}
