//! Error types for the ICS core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the ICS core.
///
/// Per-cell conditions inside a sweep (out-of-map samples, degenerate arcs)
/// never surface here; they resolve to a collision verdict instead.
#[derive(Debug, Error)]
pub enum IcsError {
    #[error("required layer '{0}' is missing from the clearance provider")]
    MissingLayer(String),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("invalid maneuver: {0}")]
    InvalidManeuver(String),

    #[error("invalid quaternion: {0}")]
    InvalidQuaternion(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, IcsError>;
