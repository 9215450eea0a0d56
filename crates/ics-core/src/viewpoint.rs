//! Camera viewpoint frustum model.
//!
//! A viewpoint carries a pose and five world-frame rays: the four image
//! corners and the image center. Rays are always re-derived from the body
//! frame template of the camera intrinsics, so pose updates never compound.

use crate::error::{IcsError, Result};
use crate::geometry::{normalize_quaternion, quat_to_rotation_matrix};
use crate::spatial::{geodetic_to_local, GeodeticPosition};
use image::GrayImage;
use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pinhole intrinsics shared by every viewpoint of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub focal_length_px: f64,
    /// Principal point x (px)
    pub cx: f64,
    /// Principal point y (px)
    pub cy: f64,
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            focal_length_px: 540.0,
            cx: 360.0,
            cy: 540.0,
            width_px: 720,
            height_px: 1080,
        }
    }
}

impl CameraIntrinsics {
    pub fn validate(&self) -> Result<()> {
        if !self.focal_length_px.is_finite() || self.focal_length_px <= 0.0 {
            return Err(IcsError::InvalidConfig(format!(
                "focal length must be positive, got {}",
                self.focal_length_px
            )));
        }
        if !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(IcsError::InvalidConfig("principal point must be finite".into()));
        }
        if self.width_px == 0 || self.height_px == 0 {
            return Err(IcsError::InvalidConfig(format!(
                "image size must be non-zero, got {}x{}",
                self.width_px, self.height_px
            )));
        }
        Ok(())
    }

    /// Unit body-frame ray through pixel `(px, py)`. The camera looks down -z.
    pub fn ray(&self, px: f64, py: f64) -> Vector3<f64> {
        Vector3::new(
            (px - self.cx) / self.focal_length_px,
            (py - self.cy) / self.focal_length_px,
            -1.0,
        )
        .normalize()
    }

    /// Body-frame rays at the image corners and center.
    pub fn template(&self) -> FrustumRays {
        let w = f64::from(self.width_px);
        let h = f64::from(self.height_px);
        FrustumRays {
            corners: [
                self.ray(0.0, 0.0),
                self.ray(0.0, h),
                self.ray(w, h),
                self.ray(w, 0.0),
            ],
            center: self.ray(0.5 * w, 0.5 * h),
        }
    }
}

/// Corner rays in image order (top-left, bottom-left, bottom-right, top-right) plus the center ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrustumRays {
    pub corners: [Vector3<f64>; 4],
    pub center: Vector3<f64>,
}

impl FrustumRays {
    fn rotated(&self, orientation: &Quaternion<f64>) -> Self {
        let rotation = quat_to_rotation_matrix(orientation);
        Self {
            corners: self.corners.map(|ray| rotation * ray),
            center: rotation * self.center,
        }
    }
}

/// Line segment of a frustum wireframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Vector3<f64>,
    pub end: Vector3<f64>,
}

#[derive(Debug, Clone)]
pub struct ViewPoint {
    index: usize,
    template: FrustumRays,
    rays: FrustumRays,
    position: Vector3<f64>,
    orientation: Quaternion<f64>,
    geodetic: Option<GeodeticPosition>,
    origin: Option<GeodeticPosition>,
    utility: f64,
    time_s: f64,
    image: Option<GrayImage>,
}

impl ViewPoint {
    /// Viewpoint at a local position and orientation.
    pub fn from_pose(
        index: usize,
        position: Vector3<f64>,
        orientation: Quaternion<f64>,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Self> {
        intrinsics.validate()?;
        let template = intrinsics.template();
        let mut viewpoint = Self {
            index,
            template,
            rays: template,
            position,
            orientation: Quaternion::identity(),
            geodetic: None,
            origin: None,
            utility: 0.0,
            time_s: 0.0,
            image: None,
        };
        viewpoint.set_orientation(orientation)?;
        Ok(viewpoint)
    }

    /// Viewpoint at a geodetic position. Rays stay in the body frame and the
    /// local position stays at zero until [`ViewPoint::set_origin`] is called.
    pub fn from_geodetic(
        index: usize,
        geodetic: GeodeticPosition,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Self> {
        intrinsics.validate()?;
        if !geodetic.is_valid() {
            return Err(IcsError::InvalidConfig(format!(
                "invalid geodetic position {geodetic:?}"
            )));
        }
        let template = intrinsics.template();
        Ok(Self {
            index,
            template,
            rays: template,
            position: Vector3::zeros(),
            orientation: Quaternion::identity(),
            geodetic: Some(geodetic),
            origin: None,
            utility: 0.0,
            time_s: 0.0,
            image: None,
        })
    }

    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
        self.rays = self.template.rotated(&self.orientation);
    }

    /// Set the orientation, renormalizing `orientation` if needed.
    pub fn set_orientation(&mut self, orientation: Quaternion<f64>) -> Result<()> {
        self.orientation = normalize_quaternion(&orientation)?;
        self.rays = self.template.rotated(&self.orientation);
        Ok(())
    }

    /// Fix the local ENU frame origin and localize the geodetic pose in it.
    pub fn set_origin(&mut self, origin: GeodeticPosition) -> Result<()> {
        if !origin.is_valid() {
            return Err(IcsError::InvalidConfig(format!(
                "invalid local frame origin {origin:?}"
            )));
        }
        self.origin = Some(origin);
        if let Some(geodetic) = self.geodetic {
            let local = geodetic_to_local(&origin, &geodetic);
            self.set_position(local);
        }
        Ok(())
    }

    pub fn set_utility(&mut self, utility: f64) {
        self.utility = utility;
    }

    pub fn set_time(&mut self, time_s: f64) {
        self.time_s = time_s;
    }

    /// Attach a grayscale image loaded from `path`.
    ///
    /// On failure the image slot is cleared and the error is returned for
    /// the caller to report.
    pub fn set_image(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match image::open(path) {
            Ok(img) => {
                self.image = Some(img.to_luma8());
                Ok(())
            }
            Err(source) => {
                self.image = None;
                Err(IcsError::ImageLoad {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Position in the local frame.
    pub fn center_local(&self) -> Vector3<f64> {
        self.position
    }

    pub fn orientation(&self) -> Quaternion<f64> {
        self.orientation
    }

    pub fn rays(&self) -> &FrustumRays {
        &self.rays
    }

    pub fn corner_rays(&self) -> &[Vector3<f64>; 4] {
        &self.rays.corners
    }

    pub fn center_ray(&self) -> Vector3<f64> {
        self.rays.center
    }

    pub fn geodetic(&self) -> Option<GeodeticPosition> {
        self.geodetic
    }

    pub fn origin(&self) -> Option<GeodeticPosition> {
        self.origin
    }

    pub fn utility(&self) -> f64 {
        self.utility
    }

    pub fn time(&self) -> f64 {
        self.time_s
    }

    pub fn image(&self) -> Option<&GrayImage> {
        self.image.as_ref()
    }

    /// Frustum edges with rays drawn `scale` meters long:
    /// four center-to-corner segments, then the four image border segments.
    pub fn wireframe(&self, scale: f64) -> Vec<Segment> {
        let tips = self.rays.corners.map(|ray| self.position + ray * scale);
        let spokes = tips.iter().map(|&tip| Segment {
            start: self.position,
            end: tip,
        });
        let border = (0..tips.len()).map(|i| Segment {
            start: tips[i],
            end: tips[(i + 1) % tips.len()],
        });
        spokes.chain(border).collect()
    }
}
