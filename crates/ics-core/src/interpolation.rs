//! Planner-facing state interpolation.
//!
//! Motion planners expose their steering function through [`TrajectorySpace`];
//! [`StraightLineSpace`] is the trivial implementation used when no planner
//! is attached.

use crate::error::{IcsError, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default interpolation step along a path, as a fraction of its length.
pub const DEFAULT_PATH_STEP: f64 = 0.02;

/// Position and heading of a planner state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub position: Vector3<f64>,
    pub yaw: f64,
}

impl State {
    pub fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            yaw,
        }
    }
}

pub trait TrajectorySpace {
    /// State at fraction `t` in `[0, 1]` of the path from `from` to `to`.
    fn interpolate(&self, from: &State, to: &State, t: f64) -> State;

    /// Curvature limit of the space in 1/m; zero for unconstrained spaces.
    fn curvature(&self) -> f64;
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Linear position, shortest-arc yaw.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineSpace;

impl TrajectorySpace for StraightLineSpace {
    fn interpolate(&self, from: &State, to: &State, t: f64) -> State {
        let t = t.clamp(0.0, 1.0);
        let yaw_delta = wrap_angle(to.yaw - from.yaw);
        State {
            position: from.position.lerp(&to.position, t),
            yaw: wrap_angle(from.yaw + yaw_delta * t),
        }
    }

    fn curvature(&self) -> f64 {
        0.0
    }
}

/// Sample `t = 0, step, 2·step, …` below 1, then the goal itself.
pub fn sample_path<S>(space: &S, from: &State, to: &State, step: f64) -> Result<Vec<State>>
where
    S: TrajectorySpace + ?Sized,
{
    if !step.is_finite() || step <= 0.0 || step > 1.0 {
        return Err(IcsError::InvalidConfig(format!(
            "path step must be in (0, 1], got {step}"
        )));
    }
    let count = (1.0 / step).ceil() as usize;
    let mut states: Vec<State> = (0..count)
        .map(|i| i as f64 * step)
        .filter(|&t| t < 1.0)
        .map(|t| space.interpolate(from, to, t))
        .collect();
    states.push(*to);
    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn path_ends_exactly_at_goal() {
        let from = State::new(0.0, 0.0, 10.0, 0.0);
        let to = State::new(100.0, 50.0, 20.0, 1.0);
        let path = sample_path(&StraightLineSpace, &from, &to, DEFAULT_PATH_STEP).unwrap();
        assert_eq!(path.len(), 51);
        assert_eq!(path[0], from);
        assert_eq!(*path.last().unwrap(), to);
        assert_relative_eq!(path[25].position, Vector3::new(50.0, 25.0, 15.0), epsilon = 1e-9);
    }

    #[test]
    fn yaw_takes_the_short_way_round() {
        let from = State::new(0.0, 0.0, 0.0, 3.0);
        let to = State::new(0.0, 0.0, 0.0, -3.0);
        let mid = StraightLineSpace.interpolate(&from, &to, 0.5);
        // Halfway across the ±PI seam, not through zero
        assert_relative_eq!(mid.yaw.abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn rejects_bad_steps() {
        let s = State::new(0.0, 0.0, 0.0, 0.0);
        assert!(sample_path(&StraightLineSpace, &s, &s, 0.0).is_err());
        assert!(sample_path(&StraightLineSpace, &s, &s, 1.5).is_err());
        assert_eq!(sample_path(&StraightLineSpace, &s, &s, 1.0).unwrap().len(), 2);
    }

    #[test]
    fn wrap_angle_range() {
        assert_relative_eq!(wrap_angle(2.5 * PI), 0.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI);
        assert_relative_eq!(wrap_angle(0.5), 0.5, epsilon = 1e-12);
        assert_eq!(StraightLineSpace.curvature(), 0.0);
    }
}
