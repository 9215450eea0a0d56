//! API routes for the ICS server.

pub mod error;
mod routes;
pub mod sweeps;
pub mod terrain;
pub mod viewpoints;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}
