//! Admin and metrics HTTP server.

pub mod metrics;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::background_jobs::{JobError, SchedulerHandle};

/// GET /jobs - List all background jobs
async fn list_jobs(State(handle): State<SchedulerHandle>) -> impl IntoResponse {
    Json(handle.list_jobs().await)
}

/// GET /jobs/{id}
async fn get_job(
    State(handle): State<SchedulerHandle>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match handle.get_job(&job_id).await {
        Some(job) => Json(job).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// POST /jobs/{id}/trigger - Run a job now
async fn trigger_job(
    State(handle): State<SchedulerHandle>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match handle.trigger_job(&job_id).await {
        Ok(()) => {
            info!("Job {} triggered via admin API", job_id);
            StatusCode::ACCEPTED.into_response()
        }
        Err(JobError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(JobError::AlreadyRunning) => {
            (StatusCode::CONFLICT, "Job is already running").into_response()
        }
        Err(e) => {
            warn!("Failed to trigger job {}: {}", job_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub fn make_admin_app(handle: SchedulerHandle) -> Router {
    let job_routes: Router = Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/trigger", post(trigger_job))
        .with_state(handle);

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .merge(job_routes)
}

/// Serves the admin app on localhost until `shutdown_token` is cancelled.
pub async fn run_admin_server(
    handle: SchedulerHandle,
    port: u16,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let app = make_admin_app(handle);
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Admin server listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;
    Ok(())
}
