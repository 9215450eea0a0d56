pub mod store;

pub use store::{AppState, SweepJob, SweepStatus, TerrainRecord, TerrainSource};
