pub mod clearance;
pub mod collision;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod ics;
pub mod interpolation;
pub mod kinematics;
pub mod layers;
pub mod spatial;
pub mod vehicle;
pub mod viewpoint;

pub use clearance::{ensure_layers, ClearanceProvider, ClearanceSample};
pub use collision::{is_in_collision, ClearanceEnvelope, CollisionChecker};
pub use error::{IcsError, Result};
pub use grid::{ElevationGrid, GridMap, ELEVATION_LAYER};
pub use ics::{
    compute_heading_safety, coverage, heading_set, CancelFlag, HeadingCoverage, HeadingSweep,
    IcsComputer, SafetyField, StateSafety, DEFAULT_HEADING_COUNT,
};
pub use interpolation::{sample_path, State, StraightLineSpace, TrajectorySpace};
pub use kinematics::{full_circle_horizon, ArcTrajectory, KinematicModel};
pub use spatial::{geodetic_to_local, haversine_distance, GeodeticPosition};
pub use vehicle::{ClearanceLayers, LayerPreparation, VehicleConfig, LOWER_LAYER, UPPER_LAYER};
pub use viewpoint::{CameraIntrinsics, FrustumRays, Segment, ViewPoint};
