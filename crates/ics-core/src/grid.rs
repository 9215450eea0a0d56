//! In-memory layered grid map.
//!
//! Regular square cells in a local metric frame, stored row-major with row 0
//! along the grid's southern edge. Every layer is a dense `Vec<f64>` with one
//! value per cell.

use crate::clearance::ClearanceProvider;
use crate::error::{IcsError, Result};
use nalgebra::Vector2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Layer holding raw terrain elevation.
pub const ELEVATION_LAYER: &str = "elevation";

/// Upper bound on cells in one grid.
const MAX_CELLS: usize = 50_000_000;

/// Serializable elevation raster used by files and API payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationGrid {
    /// West edge of the grid (m)
    pub min_x: f64,
    /// South edge of the grid (m)
    pub min_y: f64,
    pub resolution_m: f64,
    pub rows: usize,
    pub cols: usize,
    /// Row-major elevations, row 0 at `min_y`
    pub elevations_m: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct GridMap {
    min_x: f64,
    min_y: f64,
    resolution_m: f64,
    rows: usize,
    cols: usize,
    layers: BTreeMap<String, Vec<f64>>,
}

impl GridMap {
    /// Create an empty grid (no layers) with its lower-left corner at `(min_x, min_y)`.
    pub fn new(
        min_x: f64,
        min_y: f64,
        resolution_m: f64,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        if !min_x.is_finite() || !min_y.is_finite() {
            return Err(IcsError::InvalidGrid("grid origin must be finite".into()));
        }
        if !resolution_m.is_finite() || resolution_m <= 0.0 {
            return Err(IcsError::InvalidGrid(format!(
                "resolution must be positive, got {resolution_m}"
            )));
        }
        if rows == 0 || cols == 0 {
            return Err(IcsError::InvalidGrid(format!(
                "grid must have at least one cell, got {rows}x{cols}"
            )));
        }
        if rows.saturating_mul(cols) > MAX_CELLS {
            return Err(IcsError::InvalidGrid(format!(
                "{rows}x{cols} exceeds the limit of {MAX_CELLS} cells"
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            resolution_m,
            rows,
            cols,
            layers: BTreeMap::new(),
        })
    }

    /// Create a grid covering `length_x` by `length_y` meters around `center`.
    pub fn from_center(
        center: Vector2<f64>,
        length_x: f64,
        length_y: f64,
        resolution_m: f64,
    ) -> Result<Self> {
        if !resolution_m.is_finite() || resolution_m <= 0.0 {
            return Err(IcsError::InvalidGrid(format!(
                "resolution must be positive, got {resolution_m}"
            )));
        }
        let cols = (length_x / resolution_m).round().max(1.0) as usize;
        let rows = (length_y / resolution_m).round().max(1.0) as usize;
        let min_x = center.x - 0.5 * cols as f64 * resolution_m;
        let min_y = center.y - 0.5 * rows as f64 * resolution_m;
        Self::new(min_x, min_y, resolution_m, rows, cols)
    }

    /// Build a grid with an `elevation` layer from a raster description.
    pub fn from_elevation_grid(grid: &ElevationGrid) -> Result<Self> {
        let mut map = Self::new(
            grid.min_x,
            grid.min_y,
            grid.resolution_m,
            grid.rows,
            grid.cols,
        )?;
        map.add_layer(ELEVATION_LAYER, grid.elevations_m.clone())?;
        Ok(map)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn resolution(&self) -> f64 {
        self.resolution_m
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lower-left corner of the grid.
    pub fn min(&self) -> Vector2<f64> {
        Vector2::new(self.min_x, self.min_y)
    }

    /// Upper-right corner of the grid.
    pub fn max(&self) -> Vector2<f64> {
        Vector2::new(
            self.min_x + self.cols as f64 * self.resolution_m,
            self.min_y + self.rows as f64 * self.resolution_m,
        )
    }

    pub fn is_inside(&self, position: &Vector2<f64>) -> bool {
        let max = self.max();
        position.x >= self.min_x
            && position.x < max.x
            && position.y >= self.min_y
            && position.y < max.y
    }

    /// Index of the cell containing `position`.
    pub fn index_of(&self, position: &Vector2<f64>) -> Option<usize> {
        if !self.is_inside(position) {
            return None;
        }
        let col = ((position.x - self.min_x) / self.resolution_m).floor() as usize;
        let row = ((position.y - self.min_y) / self.resolution_m).floor() as usize;
        // Rounding at the far edge can land one past the last cell.
        Some(row.min(self.rows - 1) * self.cols + col.min(self.cols - 1))
    }

    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    pub fn cell_center(&self, index: usize) -> Vector2<f64> {
        let (row, col) = self.row_col(index);
        Vector2::new(
            self.min_x + (col as f64 + 0.5) * self.resolution_m,
            self.min_y + (row as f64 + 0.5) * self.resolution_m,
        )
    }

    /// Add or replace a layer.
    pub fn add_layer(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(IcsError::InvalidGrid(format!(
                "layer '{}' has {} values, grid has {} cells",
                name,
                values.len(),
                self.len()
            )));
        }
        self.layers.insert(name, values);
        Ok(())
    }

    /// Add or replace a layer computed per cell center, in parallel.
    pub fn add_layer_with<F>(&mut self, name: impl Into<String>, value_at: F)
    where
        F: Fn(usize, Vector2<f64>) -> f64 + Sync,
    {
        let values: Vec<f64> = (0..self.len())
            .into_par_iter()
            .map(|index| value_at(index, self.cell_center(index)))
            .collect();
        self.layers.insert(name.into(), values);
    }

    pub fn remove_layer(&mut self, name: &str) -> Option<Vec<f64>> {
        self.layers.remove(name)
    }

    pub fn layer(&self, name: &str) -> Option<&[f64]> {
        self.layers.get(name).map(Vec::as_slice)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn at(&self, name: &str, index: usize) -> Option<f64> {
        self.layers.get(name)?.get(index).copied()
    }

    pub fn set(&mut self, name: &str, index: usize, value: f64) -> Result<()> {
        let layer = self
            .layers
            .get_mut(name)
            .ok_or_else(|| IcsError::MissingLayer(name.to_string()))?;
        let slot = layer.get_mut(index).ok_or_else(|| {
            IcsError::InvalidGrid(format!("cell index {index} out of range"))
        })?;
        *slot = value;
        Ok(())
    }

    /// Value of the cell containing `position`.
    pub fn at_position(&self, name: &str, position: &Vector2<f64>) -> Option<f64> {
        let index = self.index_of(position)?;
        self.at(name, index)
    }
}

impl ClearanceProvider for GridMap {
    fn inside_bounds(&self, position: &Vector2<f64>) -> bool {
        self.is_inside(position)
    }

    fn sample(&self, layer: &str, position: &Vector2<f64>) -> Option<f64> {
        self.at_position(layer, position)
    }

    fn has_layer(&self, layer: &str) -> bool {
        self.layers.contains_key(layer)
    }

    fn cell_count(&self) -> usize {
        self.len()
    }

    fn cell_position(&self, index: usize) -> Vector2<f64> {
        self.cell_center(index)
    }
}
