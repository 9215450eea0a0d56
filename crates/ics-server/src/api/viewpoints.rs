//! Viewpoint frustum endpoint.

use axum::{extract::State, http::StatusCode, Json};
use ics_core::{geometry::quaternion, CameraIntrinsics, Segment, ViewPoint};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{api_error, core_error, ApiResult};
use crate::state::AppState;

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct FrustumRequest {
    #[serde(default)]
    pub index: usize,
    /// Local position (m)
    pub position: [f64; 3],
    /// Scalar-first quaternion `[w, x, y, z]`
    pub orientation: [f64; 4],
    /// Length of the drawn rays (m)
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Overrides the server's camera intrinsics.
    pub intrinsics: Option<CameraIntrinsics>,
}

#[derive(Debug, Serialize)]
pub struct FrustumResponse {
    pub index: usize,
    pub position: Vector3<f64>,
    /// Normalized orientation `[w, x, y, z]`
    pub orientation: [f64; 4],
    pub center_ray: Vector3<f64>,
    pub corner_rays: [Vector3<f64>; 4],
    pub wireframe: Vec<Segment>,
}

/// Rays and wireframe of a camera pose.
pub async fn frustum(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FrustumRequest>,
) -> ApiResult<Json<FrustumResponse>> {
    if !req.scale.is_finite() || req.scale <= 0.0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "scale must be positive"));
    }
    let intrinsics = req.intrinsics.unwrap_or(state.config().camera);
    let [w, x, y, z] = req.orientation;
    let view = ViewPoint::from_pose(
        req.index,
        Vector3::from(req.position),
        quaternion(w, x, y, z),
        &intrinsics,
    )
    .map_err(core_error)?;

    let q = view.orientation();
    Ok(Json(FrustumResponse {
        index: view.index(),
        position: view.center_local(),
        orientation: [q.w, q.i, q.j, q.k],
        center_ray: view.center_ray(),
        corner_rays: *view.corner_rays(),
        wireframe: view.wireframe(req.scale),
    }))
}
