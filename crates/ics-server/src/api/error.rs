//! Error responses for API handlers.

use axum::{http::StatusCode, Json};
use ics_core::IcsError;
use serde::Serialize;

use crate::terrain::TerrainError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

pub fn not_found(kind: &str, id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("{kind} '{id}' not found"))
}

/// Map a core error: missing layers are unprocessable, everything else is bad input.
pub fn core_error(err: IcsError) -> ApiError {
    let status = match err {
        IcsError::MissingLayer(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    };
    api_error(status, err.to_string())
}

pub fn terrain_error(err: TerrainError) -> ApiError {
    match err {
        TerrainError::InvalidRequest(_) => api_error(StatusCode::BAD_REQUEST, err.to_string()),
        TerrainError::Provider(_) => api_error(StatusCode::BAD_GATEWAY, err.to_string()),
        TerrainError::Core(inner) => core_error(inner),
    }
}
