//! Maneuver collision checking against terrain clearance bounds.
//!
//! A maneuver is feasible only if one altitude band fits the whole path: the
//! highest lower bound seen anywhere along the arc must stay below the lowest
//! upper bound seen anywhere along it. A single pinch point anywhere on the
//! arc fails the whole maneuver.

use crate::clearance::ClearanceProvider;
use crate::kinematics::ArcTrajectory;
use crate::vehicle::ClearanceLayers;
use nalgebra::Vector2;

/// Binding clearance constraint of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearanceEnvelope {
    /// Sample `index` left the grid.
    OutOfDomain { index: usize },
    /// Sample `index` had no usable clearance value.
    Unavailable { index: usize },
    /// Tightest floor and ceiling over all samples.
    Bounded { lower: f64, upper: f64 },
}

impl ClearanceEnvelope {
    pub fn is_collision(&self) -> bool {
        match self {
            Self::Bounded { lower, upper } => upper <= lower,
            Self::OutOfDomain { .. } | Self::Unavailable { .. } => true,
        }
    }

    /// Vertical room left by the binding constraint, if the path stayed on the map.
    pub fn margin(&self) -> Option<f64> {
        match self {
            Self::Bounded { lower, upper } => Some(upper - lower),
            _ => None,
        }
    }
}

/// Stateless checker bound to a pair of clearance layer names.
#[derive(Debug, Clone, Default)]
pub struct CollisionChecker {
    layers: ClearanceLayers,
}

impl CollisionChecker {
    pub fn new(layers: ClearanceLayers) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &ClearanceLayers {
        &self.layers
    }

    /// Walk the trajectory and accumulate the worst bounds.
    ///
    /// Stops at the first sample outside the grid.
    pub fn envelope<P>(&self, trajectory: &ArcTrajectory, clearance: &P) -> ClearanceEnvelope
    where
        P: ClearanceProvider + ?Sized,
    {
        let mut lower = f64::NEG_INFINITY;
        let mut upper = f64::INFINITY;

        for (index, position) in trajectory.positions().iter().enumerate() {
            let point = Vector2::new(position.x, position.y);
            // Leaving the map counts as hitting the collision surface.
            if !clearance.inside_bounds(&point) {
                return ClearanceEnvelope::OutOfDomain { index };
            }

            let floor = clearance.sample(&self.layers.lower, &point);
            let ceiling = clearance.sample(&self.layers.upper, &point);
            let (Some(floor), Some(ceiling)) = (floor, ceiling) else {
                return ClearanceEnvelope::Unavailable { index };
            };
            if !floor.is_finite() || !ceiling.is_finite() {
                return ClearanceEnvelope::Unavailable { index };
            }

            lower = lower.max(floor);
            upper = upper.min(ceiling);
        }

        ClearanceEnvelope::Bounded { lower, upper }
    }

    pub fn is_in_collision<P>(&self, trajectory: &ArcTrajectory, clearance: &P) -> bool
    where
        P: ClearanceProvider + ?Sized,
    {
        self.envelope(trajectory, clearance).is_collision()
    }
}

/// Check a trajectory against the default clearance layers.
pub fn is_in_collision<P>(trajectory: &ArcTrajectory, clearance: &P) -> bool
where
    P: ClearanceProvider + ?Sized,
{
    CollisionChecker::default().is_in_collision(trajectory, clearance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMap;
    use crate::kinematics::{full_circle_horizon, KinematicModel};
    use crate::vehicle::{LOWER_LAYER, UPPER_LAYER};
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform_map(lower: f64, upper: f64) -> GridMap {
        let mut map = GridMap::from_center(Vector2::zeros(), 2000.0, 2000.0, 10.0).unwrap();
        map.add_layer_with(LOWER_LAYER, |_, _| lower);
        map.add_layer_with(UPPER_LAYER, |_, _| upper);
        map
    }

    fn straight(heading: f64, start: Vector2<f64>) -> ArcTrajectory {
        KinematicModel::new(15.0, 0.1)
            .generate_arc(
                &Vector3::zeros(),
                10.0,
                &Vector3::new(start.x, start.y, 0.0),
                &Vector3::new(heading.cos(), heading.sin(), 0.0),
            )
            .unwrap()
    }

    fn circle(yaw_rate: f64, heading: f64, start: Vector2<f64>) -> ArcTrajectory {
        KinematicModel::new(15.0, 0.1)
            .generate_arc(
                &Vector3::new(0.0, 0.0, yaw_rate),
                full_circle_horizon(yaw_rate).unwrap(),
                &Vector3::new(start.x, start.y, 0.0),
                &Vector3::new(heading.cos(), heading.sin(), 0.0),
            )
            .unwrap()
    }

    #[test]
    fn flat_terrain_with_ample_clearance_is_free() {
        let map = uniform_map(0.0, 100.0);
        for k in 0..8 {
            let heading = k as f64 * std::f64::consts::FRAC_PI_4;
            for start in [Vector2::new(0.0, 0.0), Vector2::new(-300.0, 420.0)] {
                assert!(!is_in_collision(&straight(heading, start), &map));
            }
        }
    }

    #[test]
    fn pinched_terrain_always_collides() {
        let map = uniform_map(50.0, 10.0);
        for k in 0..8 {
            let heading = k as f64 * std::f64::consts::FRAC_PI_4;
            assert!(is_in_collision(&straight(heading, Vector2::zeros()), &map));
            assert!(is_in_collision(&circle(0.25, heading, Vector2::zeros()), &map));
            assert!(is_in_collision(&circle(-0.25, heading, Vector2::zeros()), &map));
        }
    }

    #[test]
    fn equal_bounds_count_as_collision() {
        let map = uniform_map(30.0, 30.0);
        assert!(is_in_collision(&straight(0.0, Vector2::zeros()), &map));
    }

    #[test]
    fn leaving_the_map_is_a_collision() {
        let map = uniform_map(0.0, 1000.0);
        // 150 m of straight flight east from 40 m inside the east edge
        let trajectory = straight(0.0, Vector2::new(960.0, 0.0));
        let envelope = CollisionChecker::default().envelope(&trajectory, &map);
        assert!(matches!(envelope, ClearanceEnvelope::OutOfDomain { .. }));
        assert!(is_in_collision(&trajectory, &map));
    }

    #[test]
    fn single_pinch_point_fails_whole_path() {
        // Floor rises to 45 m east of x = 50; ceiling drops to 40 m west of it.
        // Every sample has upper > lower, but no single band fits the path.
        let mut map = GridMap::from_center(Vector2::zeros(), 1000.0, 1000.0, 10.0).unwrap();
        map.add_layer_with(LOWER_LAYER, |_, p| if p.x > 50.0 { 45.0 } else { 0.0 });
        map.add_layer_with(UPPER_LAYER, |_, p| if p.x > 50.0 { 100.0 } else { 40.0 });

        let trajectory = straight(0.0, Vector2::zeros());
        let envelope = CollisionChecker::default().envelope(&trajectory, &map);
        assert_eq!(
            envelope,
            ClearanceEnvelope::Bounded {
                lower: 45.0,
                upper: 40.0
            }
        );
        assert!(envelope.is_collision());
    }

    #[test]
    fn missing_values_fail_closed() {
        let mut map = uniform_map(0.0, 100.0);
        let index = map.index_of(&Vector2::new(45.0, 0.0)).unwrap();
        map.set(LOWER_LAYER, index, f64::NAN).unwrap();
        assert!(is_in_collision(&straight(0.0, Vector2::zeros()), &map));
    }

    #[test]
    fn custom_layer_names_are_honoured() {
        let mut map = GridMap::from_center(Vector2::zeros(), 1000.0, 1000.0, 10.0).unwrap();
        map.add_layer_with("floor", |_, _| 0.0);
        map.add_layer_with("ceiling", |_, _| 100.0);
        let checker = CollisionChecker::new(ClearanceLayers {
            lower: "floor".into(),
            upper: "ceiling".into(),
        });
        assert!(!checker.is_in_collision(&straight(1.0, Vector2::zeros()), &map));
        // Default names are absent on this map
        assert!(is_in_collision(&straight(1.0, Vector2::zeros()), &map));
    }

    #[test]
    fn widening_the_margin_never_adds_collisions() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = GridMap::from_center(Vector2::zeros(), 1200.0, 1200.0, 20.0).unwrap();
        let lower: Vec<f64> = (0..base.len()).map(|_| rng.random_range(0.0..60.0)).collect();
        let upper: Vec<f64> = (0..base.len()).map(|_| rng.random_range(40.0..120.0)).collect();

        let with_margin = |delta: f64| {
            let mut map = base.clone();
            map.add_layer(LOWER_LAYER, lower.iter().map(|v| v - delta).collect())
                .unwrap();
            map.add_layer(UPPER_LAYER, upper.iter().map(|v| v + delta).collect())
                .unwrap();
            map
        };
        let narrow = with_margin(0.0);
        let wide = with_margin(25.0);

        for k in 0..16 {
            let heading = k as f64 * std::f64::consts::PI / 8.0;
            for trajectory in [
                straight(heading, Vector2::new(-100.0, 50.0)),
                circle(0.25, heading, Vector2::new(20.0, -30.0)),
                circle(-0.25, heading, Vector2::new(20.0, -30.0)),
            ] {
                let narrow_hit = is_in_collision(&trajectory, &narrow);
                let wide_hit = is_in_collision(&trajectory, &wide);
                // Widening can only clear collisions, never create them.
                assert!(!wide_hit || narrow_hit);
            }
        }
    }
}
