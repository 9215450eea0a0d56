//! Geodetic helpers for placing terrain and viewpoints in a local metric frame.
//!
//! Local frames are ENU: x east, y north, z up, in meters from an origin.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Longitude/latitude in degrees, altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GeodeticPosition {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.altitude_m.is_finite()
            && self.latitude_deg.abs() <= 90.0
            && self.longitude_deg.abs() <= 180.0
    }
}

/// Meters per degree of latitude at a given latitude (WGS84 series).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 series).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lat(ref_lat_deg).max(1e-9)
}

pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lon(ref_lat_deg).max(1e-9)
}

pub fn lat_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lat(ref_lat_deg)
}

pub fn lon_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lon(ref_lat_deg)
}

/// Great-circle distance in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// ENU offset of `point` from `origin`, scaled at the origin's latitude.
///
/// Accurate over the few kilometers a terrain grid spans.
pub fn geodetic_to_local(origin: &GeodeticPosition, point: &GeodeticPosition) -> Vector3<f64> {
    Vector3::new(
        lon_to_meters(point.longitude_deg - origin.longitude_deg, origin.latitude_deg),
        lat_to_meters(point.latitude_deg - origin.latitude_deg, origin.latitude_deg),
        point.altitude_m - origin.altitude_m,
    )
}

/// Inverse of [`geodetic_to_local`].
pub fn local_to_geodetic(origin: &GeodeticPosition, local: &Vector3<f64>) -> GeodeticPosition {
    GeodeticPosition {
        latitude_deg: origin.latitude_deg + meters_to_lat(local.y, origin.latitude_deg),
        longitude_deg: origin.longitude_deg + meters_to_lon(local.x, origin.latitude_deg),
        altitude_m: origin.altitude_m + local.z,
    }
}
