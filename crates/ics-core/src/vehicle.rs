//! Vehicle and clearance-layer configuration.

use crate::error::{IcsError, Result};
use serde::{Deserialize, Serialize};

/// Name of the default lower clearance bound layer.
pub const LOWER_LAYER: &str = "distance_surface";
/// Name of the default upper clearance bound layer.
pub const UPPER_LAYER: &str = "max_elevation";

/// Kinematic limits of a fixed-wing style vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Forward airspeed in m/s
    pub airspeed_mps: f64,
    /// Maximum yaw rate in rad/s
    pub max_yaw_rate_rad_s: f64,
    /// Trajectory sampling step in seconds
    pub time_step_s: f64,
    /// Horizon used for straight flight when the yaw rate is zero
    pub straight_horizon_s: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            airspeed_mps: 15.0,
            max_yaw_rate_rad_s: 0.25,
            time_step_s: 0.1,
            straight_horizon_s: 10.0,
        }
    }
}

impl VehicleConfig {
    /// Minimum turn radius in meters at the configured airspeed.
    pub fn min_turn_radius_m(&self) -> f64 {
        if self.max_yaw_rate_rad_s.abs() <= f64::EPSILON {
            return f64::INFINITY;
        }
        self.airspeed_mps / self.max_yaw_rate_rad_s.abs()
    }

    /// Copy of this config with a different yaw rate.
    pub fn with_yaw_rate(&self, yaw_rate_rad_s: f64) -> Self {
        Self {
            max_yaw_rate_rad_s: yaw_rate_rad_s,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.airspeed_mps.is_finite() || self.airspeed_mps <= 0.0 {
            return Err(IcsError::InvalidConfig(format!(
                "airspeed must be positive, got {}",
                self.airspeed_mps
            )));
        }
        if !self.max_yaw_rate_rad_s.is_finite() {
            return Err(IcsError::InvalidConfig("yaw rate must be finite".into()));
        }
        if !self.time_step_s.is_finite() || self.time_step_s <= 0.0 {
            return Err(IcsError::InvalidConfig(format!(
                "time step must be positive, got {}",
                self.time_step_s
            )));
        }
        if !self.straight_horizon_s.is_finite() || self.straight_horizon_s < 0.0 {
            return Err(IcsError::InvalidConfig(format!(
                "straight horizon must be non-negative, got {}",
                self.straight_horizon_s
            )));
        }
        Ok(())
    }
}

/// Names of the two clearance layers the collision checker reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceLayers {
    /// Minimum safe altitude (terrain + surface distance)
    pub lower: String,
    /// Maximum permitted altitude (terrain + ceiling offset)
    pub upper: String,
}

impl Default for ClearanceLayers {
    fn default() -> Self {
        Self {
            lower: LOWER_LAYER.to_string(),
            upper: UPPER_LAYER.to_string(),
        }
    }
}

/// Parameters used to derive clearance layers from an elevation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPreparation {
    /// Minimum distance to keep from the terrain surface (m)
    pub surface_distance_m: f64,
    /// Ceiling above terrain (m)
    pub max_elevation_offset_m: f64,
}

impl Default for LayerPreparation {
    fn default() -> Self {
        Self {
            surface_distance_m: 50.0,
            max_elevation_offset_m: 150.0,
        }
    }
}
