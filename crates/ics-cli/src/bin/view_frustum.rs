//! Print the frustum rays and wireframe of a camera viewpoint as JSON.

use anyhow::Result;
use clap::Parser;
use ics_cli::init_tracing;
use ics_core::geometry::quaternion;
use ics_core::{CameraIntrinsics, GeodeticPosition, ViewPoint};
use nalgebra::Vector3;
use serde_json::json;
use std::path::PathBuf;

/// Compute viewpoint frustum geometry
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Viewpoint index
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Local position x,y,z in meters
    #[arg(
        long,
        value_delimiter = ',',
        num_args = 3,
        allow_negative_numbers = true,
        default_values_t = [0.0, 0.0, 100.0]
    )]
    position: Vec<f64>,

    /// Orientation quaternion w,x,y,z
    #[arg(
        long,
        value_delimiter = ',',
        num_args = 4,
        allow_negative_numbers = true,
        default_values_t = [1.0, 0.0, 0.0, 0.0]
    )]
    orientation: Vec<f64>,

    /// Geodetic pose lat,lon,alt; the local position is taken relative to --origin
    #[arg(
        long,
        value_delimiter = ',',
        num_args = 3,
        allow_negative_numbers = true,
        requires = "origin"
    )]
    geodetic: Option<Vec<f64>>,

    /// Local frame origin lat,lon,alt
    #[arg(long, value_delimiter = ',', num_args = 3, allow_negative_numbers = true)]
    origin: Option<Vec<f64>>,

    /// Length of the drawn rays in meters
    #[arg(long, default_value_t = 10.0)]
    scale: f64,

    /// Focal length in pixels
    #[arg(long, default_value_t = 540.0)]
    focal_length: f64,

    /// Image width in pixels
    #[arg(long, default_value_t = 720)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Image to attach to the viewpoint
    #[arg(long)]
    image: Option<PathBuf>,
}

fn geodetic(values: &[f64]) -> GeodeticPosition {
    GeodeticPosition::new(values[0], values[1], values[2])
}

fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let intrinsics = CameraIntrinsics {
        focal_length_px: args.focal_length,
        cx: 0.5 * f64::from(args.width),
        cy: 0.5 * f64::from(args.height),
        width_px: args.width,
        height_px: args.height,
    };
    let q = quaternion(
        args.orientation[0],
        args.orientation[1],
        args.orientation[2],
        args.orientation[3],
    );

    let mut view = match (&args.geodetic, &args.origin) {
        (Some(pose), Some(origin)) => {
            let mut view = ViewPoint::from_geodetic(args.index, geodetic(pose), &intrinsics)?;
            view.set_origin(geodetic(origin))?;
            view.set_orientation(q)?;
            view
        }
        _ => ViewPoint::from_pose(
            args.index,
            Vector3::new(args.position[0], args.position[1], args.position[2]),
            q,
            &intrinsics,
        )?,
    };

    if let Some(path) = &args.image {
        if let Err(err) = view.set_image(path) {
            tracing::warn!("Continuing without image: {}", err);
        }
    }

    let orientation = view.orientation();
    let output = json!({
        "index": view.index(),
        "position": view.center_local(),
        "orientation": [orientation.w, orientation.i, orientation.j, orientation.k],
        "center_ray": view.center_ray(),
        "corner_rays": view.corner_rays(),
        "wireframe": view.wireframe(args.scale),
        "image": view.image().map(|img| img.dimensions()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
