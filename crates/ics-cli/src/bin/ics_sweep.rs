//! Sweep headings over a terrain and log ICS coverage.
//!
//! Builds the clearance layers, computes the circle ICS once, then runs one
//! full-grid ICS pass per heading and writes a `yaw,yaw_coverage,circle_coverage`
//! CSV.

use anyhow::{bail, Result};
use clap::Parser;
use ics_cli::{
    init_tracing, load_terrain, synthetic_terrain, CoverageLog, CoverageRecord, TerrainScenario,
};
use ics_core::{
    heading_set, CancelFlag, ClearanceLayers, GridMap, IcsComputer, LayerPreparation, VehicleConfig,
};
use std::path::PathBuf;
use std::time::Instant;

const CIRCLE_LAYER: &str = "circle_error";

/// Compute heading-dependent ICS coverage over a terrain
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Elevation grid JSON file (overrides --scenario)
    #[arg(long)]
    terrain: Option<PathBuf>,

    /// Synthetic terrain used when no file is given
    #[arg(long, value_enum, default_value_t = TerrainScenario::Ridge)]
    scenario: TerrainScenario,

    /// Synthetic terrain side length in meters
    #[arg(long, default_value_t = 2000.0)]
    size: f64,

    /// Synthetic terrain resolution in meters
    #[arg(long, default_value_t = 20.0)]
    resolution: f64,

    /// Yaw rate of the escape circles in rad/s
    #[arg(long, default_value_t = 0.25)]
    yaw_rate: f64,

    /// Forward airspeed in m/s
    #[arg(long, default_value_t = 15.0)]
    airspeed: f64,

    /// Number of evenly spaced headings
    #[arg(long, default_value_t = 16)]
    headings: usize,

    /// Minimum distance to the terrain surface in meters
    #[arg(long, default_value_t = 50.0)]
    surface_distance: f64,

    /// Ceiling above terrain in meters
    #[arg(long, default_value_t = 150.0)]
    elevation_offset: f64,

    /// Loiter circle radius for the circle ICS in meters
    #[arg(long, default_value_t = 60.0)]
    circle_radius: f64,

    /// Coverage threshold
    #[arg(long, default_value_t = 0.0)]
    threshold: f64,

    /// Output CSV path
    #[arg(long, short, default_value = "ics_coverage.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();
    if args.headings == 0 {
        bail!("--headings must be at least 1");
    }

    let grid = match &args.terrain {
        Some(path) => load_terrain(path)?,
        None => synthetic_terrain(args.scenario, args.size, args.resolution)?,
    };

    let vehicle = VehicleConfig {
        airspeed_mps: args.airspeed,
        max_yaw_rate_rad_s: args.yaw_rate,
        ..VehicleConfig::default()
    };
    vehicle.validate()?;
    let preparation = LayerPreparation {
        surface_distance_m: args.surface_distance,
        max_elevation_offset_m: args.elevation_offset,
    };
    let layers = ClearanceLayers::default();

    println!("Terrain: {}x{} cells at {} m", grid.rows, grid.cols, grid.resolution_m);
    println!(
        "  Vehicle: {} m/s, yaw rate {} rad/s, turn radius {:.1} m",
        vehicle.airspeed_mps,
        vehicle.max_yaw_rate_rad_s,
        vehicle.min_turn_radius_m()
    );

    let started = Instant::now();
    let mut map = GridMap::from_elevation_grid(&grid)?;
    map.prepare_clearance_layers(&layers, &preparation)?;
    map.calculate_circle_ics(CIRCLE_LAYER, args.circle_radius, &layers)?;
    let circle_coverage = map.layer_coverage(CIRCLE_LAYER, args.threshold)?;
    println!("  Circle coverage (r = {} m): {:.4}", args.circle_radius, circle_coverage);

    let computer = IcsComputer::new(&vehicle, layers);
    let sweep = computer.sweep_headings_with(
        &heading_set(args.headings),
        args.yaw_rate,
        args.threshold,
        &map,
        &CancelFlag::new(),
        |entry| println!("  - yaw: {:.4} coverage: {:.4}", entry.heading_rad, entry.coverage),
    )?;

    let mut log = CoverageLog::new();
    for entry in &sweep.entries {
        log.record(CoverageRecord {
            yaw: entry.heading_rad,
            yaw_coverage: entry.coverage,
            circle_coverage,
        });
    }
    log.write_csv(&args.output)?;

    let mean = sweep.entries.iter().map(|e| e.coverage).sum::<f64>() / sweep.entries.len() as f64;
    println!();
    println!("Mean heading coverage: {:.4}", mean);
    println!(
        "Wrote {} rows to {} in {:.1}s",
        log.records().len(),
        args.output.display(),
        started.elapsed().as_secs_f64()
    );

    Ok(())
}
