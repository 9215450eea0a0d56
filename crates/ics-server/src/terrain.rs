//! Terrain acquisition and clearance preparation.
//!
//! Elevations come either from an uploaded raster or from an Open-Meteo style
//! elevation provider sampled on a local ENU grid around a center point.

use crate::config::Config;
use dashmap::DashMap;
use ics_core::spatial::local_to_geodetic;
use ics_core::{
    ClearanceLayers, ElevationGrid, GeodeticPosition, GridMap, IcsError, LayerPreparation,
};
use nalgebra::Vector3;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Circle ICS error layer name.
pub const CIRCLE_LAYER: &str = "circle_error";

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid terrain request: {0}")]
    InvalidRequest(String),
    #[error("terrain provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Core(#[from] IcsError),
}

/// Grid requested around a geodetic center.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchTerrainRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Side length of the square grid (m)
    pub size_m: f64,
    pub resolution_m: f64,
}

#[derive(Debug, Clone)]
struct TerrainCacheEntry {
    fetched_at: Instant,
    grid: ElevationGrid,
}

fn terrain_cache() -> &'static DashMap<String, TerrainCacheEntry> {
    static CACHE: OnceLock<DashMap<String, TerrainCacheEntry>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

#[derive(Debug, Deserialize)]
struct OpenMeteoElevationResponse {
    elevation: Option<Vec<f64>>,
}

/// Prepared terrain: grid with clearance and circle-ICS layers.
pub struct PreparedTerrain {
    pub map: GridMap,
    pub circle_coverage: f64,
}

/// Build clearance layers and the circle ICS layer from an elevation raster.
///
/// CPU bound; call from a blocking context.
pub fn prepare_terrain(
    grid: &ElevationGrid,
    preparation: &LayerPreparation,
    circle_radius_m: f64,
) -> Result<PreparedTerrain, IcsError> {
    let layers = ClearanceLayers::default();
    let mut map = GridMap::from_elevation_grid(grid)?;
    map.prepare_clearance_layers(&layers, preparation)?;
    map.calculate_circle_ics(CIRCLE_LAYER, circle_radius_m, &layers)?;
    let circle_coverage = map.layer_coverage(CIRCLE_LAYER, 0.0)?;
    Ok(PreparedTerrain {
        map,
        circle_coverage,
    })
}

fn validate_fetch(
    request: &FetchTerrainRequest,
    config: &Config,
) -> Result<(usize, usize), TerrainError> {
    let center = GeodeticPosition::new(request.latitude, request.longitude, 0.0);
    if !center.is_valid() {
        return Err(TerrainError::InvalidRequest(format!(
            "invalid center {}, {}",
            request.latitude, request.longitude
        )));
    }
    if !request.resolution_m.is_finite() || request.resolution_m < 1.0 {
        return Err(TerrainError::InvalidRequest(
            "resolution_m must be at least 1 m".to_string(),
        ));
    }
    if !request.size_m.is_finite() || request.size_m < request.resolution_m {
        return Err(TerrainError::InvalidRequest(
            "size_m must be at least one cell".to_string(),
        ));
    }
    let cells_per_side = (request.size_m / request.resolution_m).round() as usize;
    let total = cells_per_side.saturating_mul(cells_per_side);
    if total > config.terrain_max_grid_points {
        return Err(TerrainError::InvalidRequest(format!(
            "{total} cells exceeds provider limit of {}",
            config.terrain_max_grid_points
        )));
    }
    Ok((cells_per_side, total))
}

/// Sample an elevation grid centered on the requested position.
///
/// The grid's local frame has its origin at the center; row 0 is the
/// southern edge.
pub async fn fetch_elevation_grid(
    client: &Client,
    config: &Config,
    request: &FetchTerrainRequest,
) -> Result<ElevationGrid, TerrainError> {
    if config.terrain_provider_url.trim().is_empty() {
        return Err(TerrainError::Provider(
            "terrain provider URL is empty".to_string(),
        ));
    }
    let (side, total) = validate_fetch(request, config)?;

    let cache_key = terrain_cache_key(request);
    let cache_ttl = Duration::from_secs(config.terrain_cache_ttl_s.max(30));
    let cache = terrain_cache();
    let mut stale_cache: Option<ElevationGrid> = None;
    if let Some(entry) = cache.get(&cache_key) {
        let age = entry.fetched_at.elapsed();
        if age <= cache_ttl {
            return Ok(entry.grid.clone());
        }
        if age <= cache_ttl.saturating_mul(2) {
            stale_cache = Some(entry.grid.clone());
        }
    }

    let origin = GeodeticPosition::new(request.latitude, request.longitude, 0.0);
    let half = 0.5 * side as f64 * request.resolution_m;
    let mut latitudes = Vec::with_capacity(total);
    let mut longitudes = Vec::with_capacity(total);
    for row in 0..side {
        let y = -half + (row as f64 + 0.5) * request.resolution_m;
        for col in 0..side {
            let x = -half + (col as f64 + 0.5) * request.resolution_m;
            let point = local_to_geodetic(&origin, &Vector3::new(x, y, 0.0));
            latitudes.push(point.latitude_deg);
            longitudes.push(point.longitude_deg);
        }
    }

    let max_points = config.terrain_max_points_per_request.max(1);
    let timeout = Duration::from_secs(config.terrain_request_timeout_s.max(3));
    let mut elevations = vec![0.0; total];

    let mut start = 0usize;
    while start < total {
        let end = (start + max_points).min(total);
        let chunk = match fetch_chunk(
            client,
            &config.terrain_provider_url,
            &latitudes[start..end],
            &longitudes[start..end],
            timeout,
        )
        .await
        {
            Ok(chunk) => chunk,
            Err(err) => {
                if let Some(stale) = stale_cache.take() {
                    tracing::warn!("Terrain fetch failed, using stale cache: {}", err);
                    return Ok(stale);
                }
                return Err(err);
            }
        };

        for (idx, value) in chunk.into_iter().enumerate() {
            elevations[start + idx] = if value.is_finite() { value } else { 0.0 };
        }
        start = end;
    }

    let grid = ElevationGrid {
        min_x: -half,
        min_y: -half,
        resolution_m: request.resolution_m,
        rows: side,
        cols: side,
        elevations_m: elevations,
    };

    cache.insert(
        cache_key,
        TerrainCacheEntry {
            fetched_at: Instant::now(),
            grid: grid.clone(),
        },
    );
    tracing::info!(
        "Fetched {}x{} terrain around {:.5}, {:.5}",
        side,
        side,
        request.latitude,
        request.longitude
    );

    Ok(grid)
}

async fn fetch_chunk(
    client: &Client,
    base_url: &str,
    latitudes: &[f64],
    longitudes: &[f64],
    timeout: Duration,
) -> Result<Vec<f64>, TerrainError> {
    let url = build_provider_url(base_url, &join_params(latitudes), &join_params(longitudes));
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|err| TerrainError::Provider(err.to_string()))?;

    if !response.status().is_success() {
        return Err(TerrainError::Provider(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let payload: OpenMeteoElevationResponse = response
        .json()
        .await
        .map_err(|err| TerrainError::Provider(err.to_string()))?;
    let chunk = payload
        .elevation
        .ok_or_else(|| TerrainError::Provider("missing elevation".to_string()))?;
    if chunk.len() != latitudes.len() {
        return Err(TerrainError::Provider(
            "unexpected sample count".to_string(),
        ));
    }
    Ok(chunk)
}

fn join_params(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| format!("{:.6}", value))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_provider_url(base: &str, latitudes: &str, longitudes: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}latitude={}&longitude={}",
        base, separator, latitudes, longitudes
    )
}

fn terrain_cache_key(request: &FetchTerrainRequest) -> String {
    format!(
        "terrain:{:.5}:{:.5}:{:.1}:{:.2}",
        request.latitude, request.longitude, request.size_m, request.resolution_m
    )
}
