//! Server configuration from environment.

use ics_core::{CameraIntrinsics, LayerPreparation, VehicleConfig};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub terrain_provider_url: String,
    pub terrain_cache_ttl_s: u64,
    pub terrain_request_timeout_s: u64,
    pub terrain_max_points_per_request: usize,
    /// Upper bound on cells fetched from the elevation provider per terrain
    pub terrain_max_grid_points: usize,
    /// Upper bound on cells accepted in an uploaded terrain
    pub max_upload_cells: usize,
    pub circle_radius_m: f64,
    /// Seconds a finished sweep stays queryable
    pub sweep_retention_s: u64,
    /// Finished sweeps kept before the oldest are evicted
    pub max_finished_sweeps: usize,
    pub vehicle: VehicleConfig,
    pub layers: LayerPreparation,
    pub camera: CameraIntrinsics,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let vehicle_defaults = VehicleConfig::default();
        let layer_defaults = LayerPreparation::default();
        let camera_defaults = CameraIntrinsics::default();

        Self {
            server_port: env_or("ICS_PORT", 3000),
            terrain_provider_url: env::var("TERRAIN_PROVIDER_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/elevation".to_string()),
            terrain_cache_ttl_s: env_or("TERRAIN_CACHE_TTL_S", 3600),
            terrain_request_timeout_s: env_or("TERRAIN_REQUEST_TIMEOUT_S", 10),
            terrain_max_points_per_request: env_or("TERRAIN_MAX_POINTS_PER_REQUEST", 100),
            terrain_max_grid_points: env_or("TERRAIN_MAX_GRID_POINTS", 40_000),
            max_upload_cells: env_or("ICS_MAX_UPLOAD_CELLS", 4_000_000),
            circle_radius_m: env_or("ICS_CIRCLE_RADIUS_M", 60.0),
            sweep_retention_s: env_or("ICS_SWEEP_RETENTION_S", 3600),
            max_finished_sweeps: env_or("ICS_MAX_FINISHED_SWEEPS", 100),
            vehicle: VehicleConfig {
                airspeed_mps: env_or("ICS_AIRSPEED_MPS", vehicle_defaults.airspeed_mps),
                max_yaw_rate_rad_s: env_or(
                    "ICS_YAW_RATE_RAD_S",
                    vehicle_defaults.max_yaw_rate_rad_s,
                ),
                time_step_s: env_or("ICS_TIME_STEP_S", vehicle_defaults.time_step_s),
                straight_horizon_s: env_or(
                    "ICS_STRAIGHT_HORIZON_S",
                    vehicle_defaults.straight_horizon_s,
                ),
            },
            layers: LayerPreparation {
                surface_distance_m: env_or(
                    "ICS_SURFACE_DISTANCE_M",
                    layer_defaults.surface_distance_m,
                ),
                max_elevation_offset_m: env_or(
                    "ICS_ELEVATION_OFFSET_M",
                    layer_defaults.max_elevation_offset_m,
                ),
            },
            camera: CameraIntrinsics {
                focal_length_px: env_or("CAMERA_FOCAL_PX", camera_defaults.focal_length_px),
                cx: env_or("CAMERA_CX", camera_defaults.cx),
                cy: env_or("CAMERA_CY", camera_defaults.cy),
                width_px: env_or("CAMERA_WIDTH_PX", camera_defaults.width_px),
                height_px: env_or("CAMERA_HEIGHT_PX", camera_defaults.height_px),
            },
        }
    }
}
