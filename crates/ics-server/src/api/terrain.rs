//! Terrain API endpoints.
//!
//! Upload or fetch an elevation grid, then query single-state safety on it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use ics_core::{ClearanceProvider, ClearanceSample, ElevationGrid, LayerPreparation};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{api_error, core_error, not_found, terrain_error, ApiResult};
use crate::state::{AppState, TerrainRecord, TerrainSource};
use crate::terrain::{fetch_elevation_grid, prepare_terrain, FetchTerrainRequest};

#[derive(Debug, Deserialize)]
pub struct UploadTerrainRequest {
    #[serde(flatten)]
    pub grid: ElevationGrid,
    /// Overrides the server's layer preparation parameters.
    pub layers: Option<LayerPreparation>,
    pub circle_radius_m: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TerrainSummary {
    pub id: String,
    pub source: TerrainSource,
    pub rows: usize,
    pub cols: usize,
    pub resolution_m: f64,
    pub min: [f64; 2],
    pub max: [f64; 2],
    pub layers: Vec<String>,
    pub circle_coverage: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&TerrainRecord> for TerrainSummary {
    fn from(record: &TerrainRecord) -> Self {
        let min = record.map.min();
        let max = record.map.max();
        Self {
            id: record.id.clone(),
            source: record.source.clone(),
            rows: record.map.rows(),
            cols: record.map.cols(),
            resolution_m: record.map.resolution(),
            min: [min.x, min.y],
            max: [max.x, max.y],
            layers: record.map.layer_names().map(str::to_string).collect(),
            circle_coverage: record.circle_coverage,
            created_at: record.created_at,
        }
    }
}

/// Prepare layers on the blocking pool and store the terrain.
async fn store_terrain(
    state: &Arc<AppState>,
    grid: ElevationGrid,
    source: TerrainSource,
    preparation: LayerPreparation,
    circle_radius_m: f64,
) -> ApiResult<TerrainSummary> {
    let prepared = tokio::task::spawn_blocking(move || {
        prepare_terrain(&grid, &preparation, circle_radius_m)
    })
    .await
    .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
    .map_err(core_error)?;

    let record = TerrainRecord {
        id: Uuid::new_v4().to_string(),
        source,
        map: Arc::new(prepared.map),
        circle_coverage: prepared.circle_coverage,
        created_at: Utc::now(),
    };
    let summary = TerrainSummary::from(&record);
    tracing::info!(
        "Stored terrain {} ({}x{}, circle coverage {:.3})",
        record.id,
        summary.rows,
        summary.cols,
        record.circle_coverage
    );
    state.add_terrain(record);
    Ok(summary)
}

/// Upload an elevation grid.
pub async fn upload_terrain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadTerrainRequest>,
) -> ApiResult<(StatusCode, Json<TerrainSummary>)> {
    let limit = state.config().max_upload_cells;
    if req.grid.rows.saturating_mul(req.grid.cols) > limit {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("terrain exceeds the limit of {limit} cells"),
        ));
    }
    let preparation = req.layers.unwrap_or_else(|| state.config().layers.clone());
    let radius = req.circle_radius_m.unwrap_or(state.config().circle_radius_m);
    let summary =
        store_terrain(&state, req.grid, TerrainSource::Upload, preparation, radius).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Fetch elevations from the terrain provider.
pub async fn fetch_terrain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchTerrainRequest>,
) -> ApiResult<(StatusCode, Json<TerrainSummary>)> {
    let grid = fetch_elevation_grid(state.http_client(), state.config(), &req)
        .await
        .map_err(terrain_error)?;
    let source = TerrainSource::Provider {
        latitude: req.latitude,
        longitude: req.longitude,
    };
    let preparation = state.config().layers.clone();
    let radius = state.config().circle_radius_m;
    let summary = store_terrain(&state, grid, source, preparation, radius).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Get a terrain summary by ID.
pub async fn get_terrain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TerrainSummary>> {
    state
        .get_terrain(&id)
        .map(|record| Json(TerrainSummary::from(&record)))
        .ok_or_else(|| not_found("terrain", &id))
}

/// Delete a terrain. Sweeps still running on it are cancelled.
pub async fn delete_terrain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .remove_terrain(&id)
        .ok_or_else(|| not_found("terrain", &id))?;
    tracing::info!("Terrain {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SafetyQuery {
    pub x: f64,
    pub y: f64,
    pub heading_rad: f64,
    pub yaw_rate_rad_s: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SafetyResponse {
    pub inside_bounds: bool,
    pub safe: bool,
    pub left_collision: bool,
    pub right_collision: bool,
    /// Clearance bounds at the query point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_m: Option<f64>,
}

/// Check both escape circles from one state.
pub async fn check_safety(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(query): Json<SafetyQuery>,
) -> ApiResult<Json<SafetyResponse>> {
    let record = state.get_terrain(&id).ok_or_else(|| not_found("terrain", &id))?;
    let yaw_rate = query
        .yaw_rate_rad_s
        .unwrap_or(state.config().vehicle.max_yaw_rate_rad_s);
    if ![query.x, query.y, query.heading_rad, yaw_rate]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(api_error(StatusCode::BAD_REQUEST, "query values must be finite"));
    }

    let computer = state.computer();
    ics_core::ensure_layers(record.map.as_ref(), computer.layers()).map_err(core_error)?;
    let position = Vector2::new(query.x, query.y);
    let verdict =
        computer.state_safety(record.map.as_ref(), &position, query.heading_rad, yaw_rate);
    let sample = ClearanceSample::read(record.map.as_ref(), computer.layers(), &position);

    Ok(Json(SafetyResponse {
        inside_bounds: record.map.inside_bounds(&position),
        safe: verdict.is_safe(),
        left_collision: verdict.left_collision,
        right_collision: verdict.right_collision,
        lower_m: sample.map(|s| s.lower),
        upper_m: sample.map(|s| s.upper),
    }))
}
