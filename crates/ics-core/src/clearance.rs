//! Query interface to terrain clearance data.
//!
//! The collision checker and the ICS computer only see this trait, so any
//! spatial grid can back them as long as it exposes named scalar layers, a
//! bounds test, and iteration over cell centers.

use crate::error::{IcsError, Result};
use crate::vehicle::ClearanceLayers;
use nalgebra::Vector2;

/// Read-only access to a layered 2.5D grid.
pub trait ClearanceProvider: Sync {
    /// Whether `position` lies inside the grid's spatial extent.
    fn inside_bounds(&self, position: &Vector2<f64>) -> bool;

    /// Value of `layer` at `position`, or `None` when the layer is unknown or
    /// the position is outside the grid.
    fn sample(&self, layer: &str, position: &Vector2<f64>) -> Option<f64>;

    fn has_layer(&self, layer: &str) -> bool;

    /// Number of cells; cell indices run over `0..cell_count()`.
    fn cell_count(&self) -> usize;

    /// Center of the cell at `index`.
    fn cell_position(&self, index: usize) -> Vector2<f64>;

    /// Visit every cell center in index order.
    fn for_each_cell(&self, visit: &mut dyn FnMut(usize, Vector2<f64>)) {
        for index in 0..self.cell_count() {
            visit(index, self.cell_position(index));
        }
    }
}

/// Lower/upper bound pair read at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearanceSample {
    pub lower: f64,
    pub upper: f64,
}

impl ClearanceSample {
    /// Read both bounds at `position`. `None` if either is unavailable.
    pub fn read<P: ClearanceProvider + ?Sized>(
        provider: &P,
        layers: &ClearanceLayers,
        position: &Vector2<f64>,
    ) -> Option<Self> {
        Some(Self {
            lower: provider.sample(&layers.lower, position)?,
            upper: provider.sample(&layers.upper, position)?,
        })
    }

    /// Vertical room between the bounds; negative when pinched.
    pub fn margin(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Fail fast when a required clearance layer has not been built.
pub fn ensure_layers<P: ClearanceProvider + ?Sized>(
    provider: &P,
    layers: &ClearanceLayers,
) -> Result<()> {
    for name in [&layers.lower, &layers.upper] {
        if !provider.has_layer(name) {
            return Err(IcsError::MissingLayer(name.clone()));
        }
    }
    Ok(())
}
