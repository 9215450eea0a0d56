//! Heading sweep jobs.
//!
//! A sweep runs on the blocking pool; progress is recorded per heading and
//! the job can be cancelled between headings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ics_core::{heading_set, DEFAULT_HEADING_COUNT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{api_error, not_found, ApiResult};
use crate::state::{AppState, SweepJob, SweepStatus};

/// Upper bound on headings per sweep.
const MAX_HEADINGS: usize = 360;

#[derive(Debug, Deserialize)]
pub struct StartSweepRequest {
    pub terrain_id: String,
    pub yaw_rate_rad_s: Option<f64>,
    /// Evenly spaced headings over [0, 2π); ignored when `headings_rad` is set.
    pub heading_count: Option<usize>,
    pub headings_rad: Option<Vec<f64>>,
    #[serde(default)]
    pub threshold: f64,
}

/// Start a sweep over a stored terrain.
pub async fn start_sweep(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartSweepRequest>,
) -> ApiResult<(StatusCode, Json<SweepJob>)> {
    let terrain = state
        .get_terrain(&req.terrain_id)
        .ok_or_else(|| not_found("terrain", &req.terrain_id))?;

    // Bound the count before allocating the heading set.
    let count = match &req.headings_rad {
        Some(headings) => headings.len(),
        None => req.heading_count.unwrap_or(DEFAULT_HEADING_COUNT),
    };
    if count == 0 || count > MAX_HEADINGS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("sweep needs between 1 and {MAX_HEADINGS} headings"),
        ));
    }
    let headings = match req.headings_rad {
        Some(headings) => headings,
        None => heading_set(count),
    };
    let yaw_rate = req
        .yaw_rate_rad_s
        .unwrap_or(state.config().vehicle.max_yaw_rate_rad_s);
    let all_finite = yaw_rate.is_finite()
        && req.threshold.is_finite()
        && headings.iter().all(|h| h.is_finite());
    if !all_finite {
        return Err(api_error(StatusCode::BAD_REQUEST, "sweep parameters must be finite"));
    }

    let job = SweepJob::new(&terrain.id, headings.clone(), yaw_rate, req.threshold);
    let job_id = job.id.clone();
    let cancel = job.cancel.clone();
    let threshold = req.threshold;
    state.insert_sweep(job.clone());
    tracing::info!(
        "Sweep {} started on terrain {} ({} headings)",
        job_id,
        terrain.id,
        headings.len()
    );

    let worker_state = state.clone();
    tokio::spawn(async move {
        let blocking_state = worker_state.clone();
        let blocking_id = job_id.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            blocking_state.computer().sweep_headings_with(
                &headings,
                yaw_rate,
                threshold,
                terrain.map.as_ref(),
                &cancel,
                |entry| blocking_state.record_heading(&blocking_id, entry),
            )
        })
        .await;

        let outcome = match outcome {
            Ok(result) => result.map_err(|err| err.to_string()),
            Err(err) => Err(format!("sweep worker failed: {err}")),
        };
        if let Err(err) = &outcome {
            tracing::warn!("Sweep {} failed: {}", job_id, err);
        }
        worker_state.finish_sweep(&job_id, outcome);
        tracing::info!("Sweep {} finished", job_id);
    });

    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// List all sweep jobs.
pub async fn list_sweeps(State(state): State<Arc<AppState>>) -> Json<Vec<SweepJob>> {
    Json(state.list_sweeps())
}

/// Get a sweep job by ID.
pub async fn get_sweep(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SweepJob>> {
    state
        .get_sweep(&id)
        .map(Json)
        .ok_or_else(|| not_found("sweep", &id))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: String,
    pub status: SweepStatus,
    pub cancel_requested: bool,
}

/// Request cooperative cancellation of a running sweep.
pub async fn cancel_sweep(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<CancelResponse>)> {
    let status = state
        .cancel_sweep(&id)
        .ok_or_else(|| not_found("sweep", &id))?;
    let cancel_requested = !status.is_finished();
    if cancel_requested {
        tracing::info!("Cancellation requested for sweep {}", id);
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            id,
            status,
            cancel_requested,
        }),
    ))
}
