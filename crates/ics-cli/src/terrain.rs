//! Terrain inputs for the CLI: JSON elevation files and synthetic scenarios.

use anyhow::{ensure, Context, Result};
use clap::ValueEnum;
use ics_core::ElevationGrid;
use std::fs;
use std::path::Path;

/// Built-in synthetic terrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TerrainScenario {
    /// Level ground
    Flat,
    /// Gaussian ridge running north-south through the center
    Ridge,
    /// Bowl rising toward the edges
    Bowl,
}

impl TerrainScenario {
    fn elevation(&self, x: f64, y: f64, half_size: f64) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Ridge => 300.0 * (-(x / (0.15 * half_size)).powi(2)).exp(),
            Self::Bowl => {
                let r = (x * x + y * y).sqrt() / half_size;
                250.0 * r * r
            }
        }
    }
}

/// Square grid of `size_m` meters centered on the origin.
pub fn synthetic_terrain(
    scenario: TerrainScenario,
    size_m: f64,
    resolution_m: f64,
) -> Result<ElevationGrid> {
    ensure!(
        resolution_m.is_finite() && resolution_m > 0.0,
        "resolution must be positive"
    );
    ensure!(
        size_m.is_finite() && size_m >= resolution_m,
        "size must cover at least one cell"
    );
    let side = (size_m / resolution_m).round() as usize;
    let half = 0.5 * side as f64 * resolution_m;

    let mut elevations_m = Vec::with_capacity(side * side);
    for row in 0..side {
        let y = -half + (row as f64 + 0.5) * resolution_m;
        for col in 0..side {
            let x = -half + (col as f64 + 0.5) * resolution_m;
            elevations_m.push(scenario.elevation(x, y, half));
        }
    }

    Ok(ElevationGrid {
        min_x: -half,
        min_y: -half,
        resolution_m,
        rows: side,
        cols: side,
        elevations_m,
    })
}

/// Read an [`ElevationGrid`] from a JSON file.
pub fn load_terrain(path: &Path) -> Result<ElevationGrid> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read terrain file {}", path.display()))?;
    let grid: ElevationGrid = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse terrain file {}", path.display()))?;
    ensure!(
        grid.elevations_m.len() == grid.rows * grid.cols,
        "terrain file has {} elevations for a {}x{} grid",
        grid.elevations_m.len(),
        grid.rows,
        grid.cols
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn synthetic_grids_are_centered() {
        let grid = synthetic_terrain(TerrainScenario::Bowl, 1000.0, 20.0).unwrap();
        assert_eq!(grid.rows, 50);
        assert_eq!(grid.cols, 50);
        assert_relative_eq!(grid.min_x, -500.0);
        assert_eq!(grid.elevations_m.len(), 2500);
        // Bowl is lowest at the middle
        let middle = grid.elevations_m[25 * 50 + 25];
        assert!(middle < grid.elevations_m[0]);
    }

    #[test]
    fn ridge_peaks_on_the_center_line() {
        let grid = synthetic_terrain(TerrainScenario::Ridge, 1000.0, 20.0).unwrap();
        let row = &grid.elevations_m[0..50];
        let (peak_col, _) = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert!(peak_col == 24 || peak_col == 25);
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(synthetic_terrain(TerrainScenario::Flat, 10.0, 0.0).is_err());
        assert!(synthetic_terrain(TerrainScenario::Flat, 5.0, 10.0).is_err());
    }

    #[test]
    fn loads_json_terrain() {
        let dir = std::env::temp_dir().join(format!("ics-cli-terrain-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("grid.json");
        let grid = synthetic_terrain(TerrainScenario::Flat, 100.0, 10.0).unwrap();
        fs::write(
            &path,
            serde_json::json!({
                "min_x": grid.min_x,
                "min_y": grid.min_y,
                "resolution_m": grid.resolution_m,
                "rows": grid.rows,
                "cols": grid.cols,
                "elevations_m": grid.elevations_m,
            })
            .to_string(),
        )
        .unwrap();

        let loaded = load_terrain(&path).unwrap();
        assert_eq!(loaded.rows, 10);
        assert!(load_terrain(&dir.join("missing.json")).is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
