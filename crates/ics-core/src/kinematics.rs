//! Closed-form arc trajectories for a constant-speed, yaw-rate limited vehicle.
//!
//! A trajectory is a time-uniform list of positions obtained by integrating a
//! constant angular-rate command. Only the z component of the rate (yaw) bends
//! the path; a zero yaw rate yields straight flight.

use crate::error::{IcsError, Result};
use crate::vehicle::VehicleConfig;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Upper bound on samples per trajectory.
const MAX_SAMPLES: usize = 1_000_000;

/// Discretized arc (or straight segment) plus the parameters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcTrajectory {
    pub angular_rate: Vector3<f64>,
    pub initial_position: Vector3<f64>,
    /// Unit direction of the initial velocity
    pub initial_direction: Vector3<f64>,
    pub horizon_s: f64,
    /// Effective spacing between samples (s)
    pub time_step_s: f64,
    positions: Vec<Vector3<f64>>,
}

impl ArcTrajectory {
    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Time of the sample at `index` from the start of the maneuver.
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.time_step_s
    }

    /// Whether this trajectory is a straight segment.
    pub fn is_straight(&self) -> bool {
        self.angular_rate.z == 0.0
    }
}

/// Horizon of one full circle at `yaw_rate`, or `None` for straight flight.
pub fn full_circle_horizon(yaw_rate: f64) -> Option<f64> {
    if yaw_rate == 0.0 || !yaw_rate.is_finite() {
        return None;
    }
    Some(2.0 * PI / yaw_rate.abs())
}

/// Kinematic model generating arc trajectories at a fixed airspeed.
#[derive(Debug, Clone, Copy)]
pub struct KinematicModel {
    pub airspeed_mps: f64,
    pub time_step_s: f64,
    pub straight_horizon_s: f64,
}

impl KinematicModel {
    pub fn new(airspeed_mps: f64, time_step_s: f64) -> Self {
        Self {
            airspeed_mps,
            time_step_s,
            straight_horizon_s: VehicleConfig::default().straight_horizon_s,
        }
    }

    pub fn from_config(config: &VehicleConfig) -> Self {
        Self {
            airspeed_mps: config.airspeed_mps,
            time_step_s: config.time_step_s,
            straight_horizon_s: config.straight_horizon_s,
        }
    }

    /// Horizon of the worst-case escape maneuver at `yaw_rate`.
    ///
    /// One full circle for a turning vehicle; the configured straight horizon
    /// when the yaw rate is zero.
    pub fn escape_horizon(&self, yaw_rate: f64) -> f64 {
        full_circle_horizon(yaw_rate).unwrap_or(self.straight_horizon_s)
    }

    /// Generate the trajectory flown under a constant angular rate.
    ///
    /// Returns `ceil(horizon / dt) + 1` samples spaced uniformly in time, the
    /// first equal to `initial_position` and the last at exactly `horizon_s`.
    /// The direction only sets the heading and climb angle; speed comes from
    /// the model's airspeed.
    pub fn generate_arc(
        &self,
        angular_rate: &Vector3<f64>,
        horizon_s: f64,
        initial_position: &Vector3<f64>,
        initial_direction: &Vector3<f64>,
    ) -> Result<ArcTrajectory> {
        if !horizon_s.is_finite() || horizon_s < 0.0 {
            return Err(IcsError::InvalidManeuver(format!(
                "horizon must be finite and non-negative, got {horizon_s}"
            )));
        }
        if !self.time_step_s.is_finite() || self.time_step_s <= 0.0 {
            return Err(IcsError::InvalidManeuver(format!(
                "time step must be positive, got {}",
                self.time_step_s
            )));
        }
        let all_finite = angular_rate.iter().all(|v| v.is_finite())
            && initial_position.iter().all(|v| v.is_finite())
            && initial_direction.iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(IcsError::InvalidManeuver(
                "non-finite trajectory parameters".to_string(),
            ));
        }
        let norm = initial_direction.norm();
        if norm <= f64::EPSILON {
            return Err(IcsError::InvalidManeuver(
                "initial velocity direction is zero".to_string(),
            ));
        }

        let steps = (horizon_s / self.time_step_s).ceil() as usize;
        if steps >= MAX_SAMPLES {
            return Err(IcsError::InvalidManeuver(format!(
                "{steps} samples exceeds the limit of {MAX_SAMPLES}"
            )));
        }
        let dt = if steps == 0 {
            0.0
        } else {
            horizon_s / steps as f64
        };

        let direction = initial_direction / norm;
        let horizontal = direction.x.hypot(direction.y);
        let yaw_rate = angular_rate.z;
        let turning = yaw_rate != 0.0 && horizontal > f64::EPSILON;

        let yaw0 = direction.y.atan2(direction.x);
        let (sin0, cos0) = yaw0.sin_cos();
        let ground_speed = self.airspeed_mps * horizontal;
        let climb_rate = self.airspeed_mps * direction.z;

        let mut positions = Vec::with_capacity(steps + 1);
        positions.push(*initial_position);
        for k in 1..=steps {
            let t = k as f64 * dt;
            let offset = if turning {
                // Turn center sits at radius v/w to the left (w > 0) or right (w < 0).
                let radius = ground_speed / yaw_rate;
                let (sin_t, cos_t) = (yaw0 + yaw_rate * t).sin_cos();
                Vector3::new(
                    radius * (sin_t - sin0),
                    radius * (cos0 - cos_t),
                    climb_rate * t,
                )
            } else {
                direction * (self.airspeed_mps * t)
            };
            positions.push(initial_position + offset);
        }

        Ok(ArcTrajectory {
            angular_rate: *angular_rate,
            initial_position: *initial_position,
            initial_direction: direction,
            horizon_s,
            time_step_s: dt,
            positions,
        })
    }
}

impl Default for KinematicModel {
    fn default() -> Self {
        Self::from_config(&VehicleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn straight_line_when_yaw_rate_is_zero() {
        let model = KinematicModel::new(10.0, 0.5);
        let start = Vector3::new(5.0, -3.0, 100.0);
        let dir = Vector3::new(1.0, 1.0, 0.0);
        let traj = model
            .generate_arc(&Vector3::zeros(), 10.0, &start, &dir)
            .unwrap();

        assert!(traj.is_straight());
        assert_eq!(traj.len(), 21);
        assert_eq!(traj.positions()[0], start);

        let unit = dir.normalize();
        let mut last_distance = -1.0;
        for p in traj.positions() {
            let offset = p - start;
            // Collinear with the direction
            assert_relative_eq!(offset.cross(&unit).norm(), 0.0, epsilon = 1e-9);
            assert!(offset.dot(&unit) >= 0.0);
            let distance = offset.norm();
            assert!(distance > last_distance);
            last_distance = distance;
        }
        assert_relative_eq!(last_distance, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn full_circle_returns_to_start() {
        let model = KinematicModel::new(15.0, 0.1);
        let start = Vector3::new(120.0, 40.0, 0.0);
        for yaw_rate in [0.25, -0.25, 0.7, -1.3] {
            for heading in [0.0_f64, 1.0, 2.5, -2.0] {
                let dir = Vector3::new(heading.cos(), heading.sin(), 0.0);
                let horizon = full_circle_horizon(yaw_rate).unwrap();
                let traj = model
                    .generate_arc(&Vector3::new(0.0, 0.0, yaw_rate), horizon, &start, &dir)
                    .unwrap();
                let last = traj.positions().last().unwrap();
                assert_relative_eq!((last - start).norm(), 0.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn sample_count_and_uniform_spacing() {
        let model = KinematicModel::new(15.0, 0.1);
        let horizon = full_circle_horizon(0.25).unwrap();
        let traj = model
            .generate_arc(
                &Vector3::new(0.0, 0.0, 0.25),
                horizon,
                &Vector3::zeros(),
                &Vector3::x(),
            )
            .unwrap();

        let expected = (horizon / 0.1).ceil() as usize + 1;
        assert_eq!(traj.len(), expected);
        assert_relative_eq!(traj.time_at(traj.len() - 1), horizon, epsilon = 1e-9);

        // Constant speed: equal chords between consecutive samples
        let chords: Vec<f64> = traj
            .positions()
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .collect();
        for chord in &chords {
            assert_relative_eq!(*chord, chords[0], epsilon = 1e-9);
        }
    }

    #[test]
    fn positive_yaw_rate_turns_left() {
        let model = KinematicModel::new(15.0, 0.1);
        let traj = model
            .generate_arc(
                &Vector3::new(0.0, 0.0, 0.25),
                2.0,
                &Vector3::zeros(),
                &Vector3::x(),
            )
            .unwrap();
        assert!(traj.positions().last().unwrap().y > 0.0);

        let traj = model
            .generate_arc(
                &Vector3::new(0.0, 0.0, -0.25),
                2.0,
                &Vector3::zeros(),
                &Vector3::x(),
            )
            .unwrap();
        assert!(traj.positions().last().unwrap().y < 0.0);
    }

    #[test]
    fn turn_radius_matches_speed_over_rate() {
        let model = KinematicModel::new(15.0, 0.05);
        let horizon = full_circle_horizon(0.25).unwrap();
        let traj = model
            .generate_arc(
                &Vector3::new(0.0, 0.0, 0.25),
                horizon,
                &Vector3::zeros(),
                &Vector3::x(),
            )
            .unwrap();
        // Left turn heading +x: center at (0, 60)
        let center = Vector3::new(0.0, 60.0, 0.0);
        for p in traj.positions() {
            assert_relative_eq!((p - center).norm(), 60.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_horizon_yields_single_sample() {
        let model = KinematicModel::default();
        let start = Vector3::new(1.0, 2.0, 3.0);
        let traj = model
            .generate_arc(&Vector3::new(0.0, 0.0, 0.3), 0.0, &start, &Vector3::y())
            .unwrap();
        assert_eq!(traj.positions(), &[start]);
    }

    #[test]
    fn rejects_zero_direction() {
        let model = KinematicModel::default();
        let result = model.generate_arc(
            &Vector3::new(0.0, 0.0, 0.3),
            5.0,
            &Vector3::zeros(),
            &Vector3::zeros(),
        );
        assert!(matches!(result, Err(IcsError::InvalidManeuver(_))));
    }

    #[test]
    fn escape_horizon_falls_back_for_straight_flight() {
        let model = KinematicModel::default();
        assert_relative_eq!(model.escape_horizon(0.0), 10.0);
        assert_relative_eq!(model.escape_horizon(-0.5), 4.0 * PI);
    }
}
