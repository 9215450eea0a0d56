//! REST API routes.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::{sweeps, terrain, viewpoints};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Terrain
        .route("/v1/terrain", post(terrain::upload_terrain))
        .route("/v1/terrain/fetch", post(terrain::fetch_terrain))
        .route(
            "/v1/terrain/:id",
            get(terrain::get_terrain).delete(terrain::delete_terrain),
        )
        .route("/v1/terrain/:id/safety", post(terrain::check_safety))
        // Heading sweeps
        .route("/v1/sweeps", post(sweeps::start_sweep).get(sweeps::list_sweeps))
        .route(
            "/v1/sweeps/:id",
            get(sweeps::get_sweep).delete(sweeps::cancel_sweep),
        )
        // Viewpoints
        .route("/v1/viewpoints/frustum", post(viewpoints::frustum))
}
