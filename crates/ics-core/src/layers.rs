//! Clearance layer preparation.
//!
//! Derives the lower and upper clearance bounds from an elevation layer, plus
//! the disc dilation/erosion used by the terminal-circle ICS metric.

use crate::clearance::ensure_layers;
use crate::error::{IcsError, Result};
use crate::grid::{GridMap, ELEVATION_LAYER};
use crate::ics::coverage;
use crate::vehicle::{ClearanceLayers, LayerPreparation};
use rayon::prelude::*;

/// Dilated lower bound used by the circle ICS.
pub const CIRCLE_LOWER_LAYER: &str = "ics_+";
/// Eroded upper bound used by the circle ICS.
pub const CIRCLE_UPPER_LAYER: &str = "ics_-";

/// Cell offsets `(d_row, d_col, distance_m)` within `radius_m` of a cell.
fn disc_offsets(radius_m: f64, resolution_m: f64) -> Vec<(isize, isize, f64)> {
    let reach = (radius_m / resolution_m).floor() as isize;
    let mut offsets = Vec::new();
    for d_row in -reach..=reach {
        for d_col in -reach..=reach {
            let distance = resolution_m * ((d_row * d_row + d_col * d_col) as f64).sqrt();
            if distance <= radius_m {
                offsets.push((d_row, d_col, distance));
            }
        }
    }
    offsets
}

impl GridMap {
    fn required_layer(&self, name: &str) -> Result<&[f64]> {
        self.layer(name)
            .ok_or_else(|| IcsError::MissingLayer(name.to_string()))
    }

    /// Fold `combine(acc, value, distance)` over the disc around every cell.
    ///
    /// Non-finite neighbours are skipped; a cell with no finite neighbour gets NaN.
    fn disc_reduce<F>(&self, source: &[f64], radius_m: f64, init: f64, combine: F) -> Vec<f64>
    where
        F: Fn(f64, f64, f64) -> f64 + Sync,
    {
        let offsets = disc_offsets(radius_m, self.resolution());
        let rows = self.rows() as isize;
        let cols = self.cols() as isize;

        (0..self.len())
            .into_par_iter()
            .map(|index| {
                let (row, col) = self.row_col(index);
                let mut acc = init;
                let mut seen = false;
                for &(d_row, d_col, distance) in &offsets {
                    let r = row as isize + d_row;
                    let c = col as isize + d_col;
                    if r < 0 || r >= rows || c < 0 || c >= cols {
                        continue;
                    }
                    let value = source[(r * cols + c) as usize];
                    if !value.is_finite() {
                        continue;
                    }
                    acc = combine(acc, value, distance);
                    seen = true;
                }
                if seen {
                    acc
                } else {
                    f64::NAN
                }
            })
            .collect()
    }

    /// Add `elevation + offset_m` as layer `name`.
    pub fn add_layer_offset(&mut self, offset_m: f64, name: &str) -> Result<()> {
        let values = self
            .required_layer(ELEVATION_LAYER)?
            .iter()
            .map(|elevation| elevation + offset_m)
            .collect();
        self.add_layer(name, values)
    }

    /// Add the lowest altitude keeping `surface_distance_m` from the terrain surface.
    ///
    /// Each cell takes the maximum over neighbours `j` within the distance of
    /// `elevation_j + sqrt(d² - r_j²)`, the height of the sphere of radius `d`
    /// around the surface point `j` above this cell.
    pub fn add_layer_distance_transform(
        &mut self,
        surface_distance_m: f64,
        name: &str,
    ) -> Result<()> {
        if !surface_distance_m.is_finite() || surface_distance_m < 0.0 {
            return Err(IcsError::InvalidConfig(format!(
                "surface distance must be non-negative, got {surface_distance_m}"
            )));
        }
        let elevation = self.required_layer(ELEVATION_LAYER)?;
        let d_sq = surface_distance_m * surface_distance_m;
        let values = self.disc_reduce(
            elevation,
            surface_distance_m,
            f64::NEG_INFINITY,
            |acc, value, r| acc.max(value + (d_sq - r * r).max(0.0).sqrt()),
        );
        self.add_layer(name, values)
    }

    /// Add the disc maximum (positive radius) or disc minimum (negative radius)
    /// of `reference` as layer `name`.
    pub fn add_layer_horizontal_distance_transform(
        &mut self,
        radius_m: f64,
        name: &str,
        reference: &str,
    ) -> Result<()> {
        if !radius_m.is_finite() {
            return Err(IcsError::InvalidConfig("radius must be finite".into()));
        }
        let source = self.required_layer(reference)?;
        let values = if radius_m >= 0.0 {
            self.disc_reduce(source, radius_m, f64::NEG_INFINITY, |acc, value, _| acc.max(value))
        } else {
            self.disc_reduce(source, -radius_m, f64::INFINITY, |acc, value, _| acc.min(value))
        };
        self.add_layer(name, values)
    }

    /// Add `query - reference` as layer `name`.
    pub fn add_error_layer(&mut self, name: &str, query: &str, reference: &str) -> Result<()> {
        let query = self.required_layer(query)?;
        let reference = self.required_layer(reference)?;
        let values = query
            .iter()
            .zip(reference)
            .map(|(q, r)| q - r)
            .collect();
        self.add_layer(name, values)
    }

    /// Build both clearance layers from the elevation layer.
    pub fn prepare_clearance_layers(
        &mut self,
        layers: &ClearanceLayers,
        preparation: &LayerPreparation,
    ) -> Result<()> {
        self.add_layer_distance_transform(preparation.surface_distance_m, &layers.lower)?;
        self.add_layer_offset(preparation.max_elevation_offset_m, &layers.upper)?;
        tracing::debug!(
            "Prepared clearance layers '{}' / '{}' on {}x{} grid",
            layers.lower,
            layers.upper,
            self.rows(),
            self.cols()
        );
        Ok(())
    }

    /// Heading-independent ICS for loitering on a circle of `radius_m`.
    ///
    /// Stores `eroded upper - dilated lower` as `layer_name`; a positive value
    /// means a circle centered on the cell fits between the bounds.
    pub fn calculate_circle_ics(
        &mut self,
        layer_name: &str,
        radius_m: f64,
        layers: &ClearanceLayers,
    ) -> Result<()> {
        ensure_layers(self, layers)?;
        self.add_layer_horizontal_distance_transform(radius_m, CIRCLE_LOWER_LAYER, &layers.lower)?;
        self.add_layer_horizontal_distance_transform(-radius_m, CIRCLE_UPPER_LAYER, &layers.upper)?;
        self.add_error_layer(layer_name, CIRCLE_UPPER_LAYER, CIRCLE_LOWER_LAYER)
    }

    /// Fraction of cells of `layer` above `threshold`.
    pub fn layer_coverage(&self, layer: &str, threshold: f64) -> Result<f64> {
        Ok(coverage(self.required_layer(layer)?, threshold))
    }
}
