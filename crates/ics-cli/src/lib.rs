//! ICS CLI - command line tools for terrain safety analysis.
//!
//! Binaries:
//! - ics_sweep: heading sweep and circle coverage over a terrain
//! - view_frustum: camera frustum rays for a pose

pub mod report;
pub mod terrain;

pub use report::{CoverageLog, CoverageRecord};
pub use terrain::{load_terrain, synthetic_terrain, TerrainScenario};

/// Initialise `tracing` for a binary, defaulting this workspace's crates to `info`.
pub fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ics_cli=info".parse()?)
                .add_directive("ics_core=info".parse()?),
        )
        .try_init()?;
    Ok(())
}
