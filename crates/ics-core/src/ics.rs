//! Inevitable collision state (ICS) fields.
//!
//! For a fixed heading, a cell is safe when at least one of the two
//! minimum-radius escape circles (left or right) started from its center
//! stays within the clearance bounds. Cells are independent, so each pass is
//! a parallel map over cell indices.

use crate::clearance::{ensure_layers, ClearanceProvider};
use crate::collision::CollisionChecker;
use crate::error::{IcsError, Result};
use crate::kinematics::KinematicModel;
use crate::vehicle::{ClearanceLayers, VehicleConfig};
use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Number of headings in a default sweep.
pub const DEFAULT_HEADING_COUNT: usize = 16;

/// Cell value that can be compared against a coverage threshold.
pub trait CellValue {
    fn value(&self) -> f64;
}

impl CellValue for bool {
    fn value(&self) -> f64 {
        if *self {
            1.0
        } else {
            0.0
        }
    }
}

impl CellValue for f64 {
    fn value(&self) -> f64 {
        *self
    }
}

/// Fraction of cells whose value exceeds `threshold`. Zero for an empty field.
pub fn coverage<T: CellValue>(values: &[T], threshold: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let valid = values.iter().filter(|v| v.value() > threshold).count();
    valid as f64 / values.len() as f64
}

/// `count` headings evenly spaced over `[0, 2π)`.
pub fn heading_set(count: usize) -> Vec<f64> {
    (0..count)
        .map(|k| 2.0 * PI * k as f64 / count as f64)
        .collect()
}

/// Per-cell safety verdicts for one heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyField {
    pub heading_rad: f64,
    pub yaw_rate_rad_s: f64,
    cells: Vec<bool>,
}

impl SafetyField {
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_safe(&self, index: usize) -> Option<bool> {
        self.cells.get(index).copied()
    }

    pub fn safe_count(&self) -> usize {
        self.cells.iter().filter(|safe| **safe).count()
    }

    pub fn coverage(&self, threshold: f64) -> f64 {
        coverage(&self.cells, threshold)
    }

    /// Field as a scalar layer (1.0 safe, 0.0 inevitable collision).
    pub fn to_layer(&self) -> Vec<f64> {
        self.cells.iter().map(CellValue::value).collect()
    }
}

/// Verdicts for both escape circles from one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSafety {
    pub left_collision: bool,
    pub right_collision: bool,
}

impl StateSafety {
    pub fn is_safe(&self) -> bool {
        !self.left_collision || !self.right_collision
    }
}

/// Coverage of one heading in a sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingCoverage {
    pub heading_rad: f64,
    pub coverage: f64,
    pub safe_cells: usize,
    pub total_cells: usize,
}

/// Result of a multi-heading sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadingSweep {
    pub entries: Vec<HeadingCoverage>,
    /// Set when the sweep stopped early on request.
    pub cancelled: bool,
    /// Field of the last completed heading.
    #[serde(skip)]
    pub latest: Option<SafetyField>,
}

/// Cooperative cancellation flag shared between a sweep and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Computes ICS fields over any clearance provider.
#[derive(Debug, Clone)]
pub struct IcsComputer {
    model: KinematicModel,
    checker: CollisionChecker,
}

impl Default for IcsComputer {
    fn default() -> Self {
        Self::new(&VehicleConfig::default(), ClearanceLayers::default())
    }
}

impl IcsComputer {
    pub fn new(config: &VehicleConfig, layers: ClearanceLayers) -> Self {
        Self {
            model: KinematicModel::from_config(config),
            checker: CollisionChecker::new(layers),
        }
    }

    pub fn model(&self) -> &KinematicModel {
        &self.model
    }

    pub fn layers(&self) -> &ClearanceLayers {
        self.checker.layers()
    }

    /// Evaluate both escape circles from `position` at `heading`.
    ///
    /// Left is `+yaw_rate` about z, right is `-yaw_rate`. Either arc failing to
    /// generate counts as a collision for that side.
    pub fn state_safety<P>(
        &self,
        clearance: &P,
        position: &Vector2<f64>,
        heading: f64,
        yaw_rate: f64,
    ) -> StateSafety
    where
        P: ClearanceProvider + ?Sized,
    {
        let start = Vector3::new(position.x, position.y, 0.0);
        let direction = Vector3::new(heading.cos(), heading.sin(), 0.0);
        let horizon = self.model.escape_horizon(yaw_rate);

        let side_collides = |rate: f64| {
            self.model
                .generate_arc(&Vector3::new(0.0, 0.0, rate), horizon, &start, &direction)
                .map(|arc| self.checker.is_in_collision(&arc, clearance))
                .unwrap_or(true)
        };

        StateSafety {
            left_collision: side_collides(yaw_rate),
            right_collision: side_collides(-yaw_rate),
        }
    }

    /// Safety field for every cell of `clearance` at one heading.
    ///
    /// Fails up front if either clearance layer is missing.
    pub fn compute_heading_safety<P>(
        &self,
        heading: f64,
        yaw_rate: f64,
        clearance: &P,
    ) -> Result<SafetyField>
    where
        P: ClearanceProvider + ?Sized,
    {
        ensure_layers(clearance, self.checker.layers())?;
        if !heading.is_finite() || !yaw_rate.is_finite() {
            return Err(IcsError::InvalidManeuver(format!(
                "heading {heading} and yaw rate {yaw_rate} must be finite"
            )));
        }

        let cells: Vec<bool> = (0..clearance.cell_count())
            .into_par_iter()
            .map(|index| {
                let position = clearance.cell_position(index);
                self.state_safety(clearance, &position, heading, yaw_rate)
                    .is_safe()
            })
            .collect();

        Ok(SafetyField {
            heading_rad: heading,
            yaw_rate_rad_s: yaw_rate,
            cells,
        })
    }

    /// Run one full-grid pass per heading, checking `cancel` between passes.
    pub fn sweep_headings<P>(
        &self,
        headings: &[f64],
        yaw_rate: f64,
        threshold: f64,
        clearance: &P,
        cancel: &CancelFlag,
    ) -> Result<HeadingSweep>
    where
        P: ClearanceProvider + ?Sized,
    {
        self.sweep_headings_with(headings, yaw_rate, threshold, clearance, cancel, |_| {})
    }

    /// Like [`IcsComputer::sweep_headings`], reporting each heading as it completes.
    pub fn sweep_headings_with<P, F>(
        &self,
        headings: &[f64],
        yaw_rate: f64,
        threshold: f64,
        clearance: &P,
        cancel: &CancelFlag,
        mut on_heading: F,
    ) -> Result<HeadingSweep>
    where
        P: ClearanceProvider + ?Sized,
        F: FnMut(&HeadingCoverage),
    {
        ensure_layers(clearance, self.checker.layers())?;
        tracing::info!(
            "Starting ICS sweep: {} heading(s), yaw rate {:.3} rad/s, {} cells",
            headings.len(),
            yaw_rate,
            clearance.cell_count()
        );

        let mut sweep = HeadingSweep::default();
        for &heading in headings {
            if cancel.is_cancelled() {
                tracing::info!(
                    "ICS sweep cancelled after {} of {} heading(s)",
                    sweep.entries.len(),
                    headings.len()
                );
                sweep.cancelled = true;
                break;
            }

            let field = self.compute_heading_safety(heading, yaw_rate, clearance)?;
            let entry = HeadingCoverage {
                heading_rad: heading,
                coverage: field.coverage(threshold),
                safe_cells: field.safe_count(),
                total_cells: field.len(),
            };
            tracing::debug!(
                "  - yaw: {:.4} coverage: {:.4}",
                entry.heading_rad,
                entry.coverage
            );
            on_heading(&entry);
            sweep.entries.push(entry);
            sweep.latest = Some(field);
        }

        Ok(sweep)
    }
}

/// Safety field with default vehicle limits and layer names.
pub fn compute_heading_safety<P>(heading: f64, yaw_rate: f64, clearance: &P) -> Result<SafetyField>
where
    P: ClearanceProvider + ?Sized,
{
    IcsComputer::default().compute_heading_safety(heading, yaw_rate, clearance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMap;
    use crate::vehicle::{LOWER_LAYER, UPPER_LAYER};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn map_with(lower: f64, upper: f64, size_m: f64) -> GridMap {
        let mut map = GridMap::from_center(Vector2::zeros(), size_m, size_m, 20.0).unwrap();
        map.add_layer_with(LOWER_LAYER, |_, _| lower);
        map.add_layer_with(UPPER_LAYER, |_, _| upper);
        map
    }

    #[test]
    fn coverage_counts_values_above_threshold() {
        assert_relative_eq!(coverage(&[true, false, true, true], 0.0), 0.75);
        assert_relative_eq!(coverage(&[0.5, -1.0, 0.0, 2.0], 0.0), 0.5);
        assert_relative_eq!(coverage::<f64>(&[], 0.0), 0.0);
    }

    #[test]
    fn coverage_is_permutation_invariant() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut values: Vec<f64> = (0..500).map(|i| ((i * 37) % 101) as f64 - 50.0).collect();
        let reference = coverage(&values, 3.0);
        for _ in 0..10 {
            values.shuffle(&mut rng);
            assert_eq!(coverage(&values, 3.0), reference);
        }
    }

    #[test]
    fn heading_set_is_evenly_spaced() {
        let headings = heading_set(DEFAULT_HEADING_COUNT);
        assert_eq!(headings.len(), 16);
        assert_relative_eq!(headings[0], 0.0);
        assert_relative_eq!(headings[1], 0.125 * PI);
        assert!(headings.iter().all(|h| *h < 2.0 * PI));
    }

    #[test]
    fn missing_layer_aborts_before_sweep() {
        let mut map = GridMap::from_center(Vector2::zeros(), 200.0, 200.0, 20.0).unwrap();
        map.add_layer_with(LOWER_LAYER, |_, _| 0.0);
        let result = compute_heading_safety(0.0, 0.25, &map);
        assert!(matches!(result, Err(IcsError::MissingLayer(name)) if name == UPPER_LAYER));
    }

    #[test]
    fn pinched_terrain_has_zero_coverage() {
        let map = map_with(50.0, 10.0, 600.0);
        let field = compute_heading_safety(0.3, 0.25, &map).unwrap();
        assert_eq!(field.len(), map.len());
        assert_eq!(field.safe_count(), 0);
        assert_relative_eq!(field.coverage(0.0), 0.0);
    }

    #[test]
    fn interior_cells_are_safe_on_open_terrain() {
        // 60 m turn radius: circles from cells far enough from the edge stay on the map.
        let map = map_with(0.0, 100.0, 800.0);
        let field = compute_heading_safety(0.0, 0.25, &map).unwrap();

        let center = map.index_of(&Vector2::new(10.0, 10.0)).unwrap();
        assert_eq!(field.is_safe(center), Some(true));

        // Corner cell: both circles leave the map.
        assert_eq!(field.is_safe(0), Some(false));

        let coverage = field.coverage(0.0);
        assert!(coverage > 0.3 && coverage < 1.0, "coverage {coverage}");
    }

    #[test]
    fn one_free_side_is_enough() {
        // Heading east near the southern edge: the right (south) circle leaves the
        // map, the left (north) circle stays on it.
        let map = map_with(0.0, 100.0, 800.0);
        let computer = IcsComputer::default();
        let position = Vector2::new(0.0, -360.0);
        let state = computer.state_safety(&map, &position, 0.0, 0.25);
        assert!(state.right_collision);
        assert!(!state.left_collision);
        assert!(state.is_safe());
    }

    #[test]
    fn sweep_reports_every_heading() {
        let map = map_with(0.0, 100.0, 600.0);
        let computer = IcsComputer::default();
        let headings = heading_set(4);
        let sweep = computer
            .sweep_headings(&headings, 0.25, 0.0, &map, &CancelFlag::new())
            .unwrap();
        assert!(!sweep.cancelled);
        assert_eq!(sweep.entries.len(), 4);
        assert!(sweep.latest.is_some());
        for entry in &sweep.entries {
            assert_eq!(entry.total_cells, map.len());
            assert_relative_eq!(
                entry.coverage,
                entry.safe_cells as f64 / entry.total_cells as f64
            );
        }
    }

    #[test]
    fn cancelled_sweep_stops_between_headings() {
        let map = map_with(0.0, 100.0, 200.0);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let sweep = IcsComputer::default()
            .sweep_headings(&heading_set(16), 0.25, 0.0, &map, &cancel)
            .unwrap();
        assert!(sweep.cancelled);
        assert!(sweep.entries.is_empty());
    }

    #[test]
    fn cancel_from_progress_hook_keeps_finished_headings() {
        let map = map_with(0.0, 100.0, 200.0);
        let cancel = CancelFlag::new();
        let mut seen = 0;
        let sweep = IcsComputer::default()
            .sweep_headings_with(&heading_set(8), 0.25, 0.0, &map, &cancel, |_| {
                seen += 1;
                if seen == 3 {
                    cancel.cancel();
                }
            })
            .unwrap();
        assert!(sweep.cancelled);
        assert_eq!(sweep.entries.len(), 3);
    }

    #[test]
    fn field_layer_matches_cells() {
        let map = map_with(0.0, 100.0, 400.0);
        let field = compute_heading_safety(1.0, 0.25, &map).unwrap();
        let layer = field.to_layer();
        assert_relative_eq!(coverage(&layer, 0.0), field.coverage(0.0));
    }
}
