//! In-memory state store using DashMap.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ics_core::{CancelFlag, GridMap, HeadingCoverage, HeadingSweep, IcsComputer};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;

/// Where a terrain's elevations came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerrainSource {
    Upload,
    Provider { latitude: f64, longitude: f64 },
}

/// Terrain with prepared clearance layers, shared read-only with sweep jobs.
#[derive(Debug, Clone)]
pub struct TerrainRecord {
    pub id: String,
    pub source: TerrainSource,
    pub map: Arc<GridMap>,
    pub circle_coverage: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SweepStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepJob {
    pub id: String,
    pub terrain_id: String,
    pub status: SweepStatus,
    pub yaw_rate_rad_s: f64,
    pub threshold: f64,
    pub headings_rad: Vec<f64>,
    pub entries: Vec<HeadingCoverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub cancel: CancelFlag,
}

impl SweepJob {
    pub fn new(
        terrain_id: &str,
        headings_rad: Vec<f64>,
        yaw_rate_rad_s: f64,
        threshold: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            terrain_id: terrain_id.to_string(),
            status: SweepStatus::Running,
            yaw_rate_rad_s,
            threshold,
            headings_rad,
            entries: Vec::new(),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
            cancel: CancelFlag::new(),
        }
    }
}

/// Application state - thread-safe store for terrains and sweep jobs.
pub struct AppState {
    config: Config,
    computer: IcsComputer,
    http: Client,
    terrains: DashMap<String, TerrainRecord>,
    sweeps: DashMap<String, SweepJob>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let computer = IcsComputer::new(&config.vehicle, Default::default());
        Self {
            config,
            computer,
            http: Client::new(),
            terrains: DashMap::new(),
            sweeps: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn computer(&self) -> &IcsComputer {
        &self.computer
    }

    pub fn http_client(&self) -> &Client {
        &self.http
    }

    pub fn add_terrain(&self, record: TerrainRecord) {
        self.terrains.insert(record.id.clone(), record);
    }

    pub fn get_terrain(&self, id: &str) -> Option<TerrainRecord> {
        self.terrains.get(id).map(|r| r.value().clone())
    }

    pub fn terrain_count(&self) -> usize {
        self.terrains.len()
    }

    /// Drop a terrain and cancel the sweeps still running on it.
    ///
    /// Running sweeps hold their own handle on the map and finish as cancelled.
    pub fn remove_terrain(&self, id: &str) -> Option<TerrainRecord> {
        let (_, record) = self.terrains.remove(id)?;
        for job in self.sweeps.iter() {
            if job.terrain_id == id && !job.status.is_finished() {
                job.cancel.cancel();
            }
        }
        Some(record)
    }

    pub fn insert_sweep(&self, job: SweepJob) {
        self.prune_sweeps(Utc::now());
        self.sweeps.insert(job.id.clone(), job);
    }

    pub fn sweep_count(&self) -> usize {
        self.sweeps.len()
    }

    /// Evict finished sweeps past the retention window, then the oldest
    /// finished ones beyond the configured cap. Running sweeps are never
    /// evicted. Returns the number of jobs removed.
    pub fn prune_sweeps(&self, now: DateTime<Utc>) -> usize {
        let retention_s = i64::try_from(self.config.sweep_retention_s).unwrap_or(i64::MAX);
        let mut finished: Vec<(DateTime<Utc>, String)> = self
            .sweeps
            .iter()
            .filter_map(|job| job.finished_at.map(|at| (at, job.id.clone())))
            .collect();
        finished.sort();

        let expired = finished
            .iter()
            .take_while(|(at, _)| now.signed_duration_since(*at).num_seconds() > retention_s)
            .count();
        let over_cap = finished
            .len()
            .saturating_sub(expired)
            .saturating_sub(self.config.max_finished_sweeps);

        let mut removed = 0;
        for (_, id) in finished.iter().take(expired + over_cap) {
            if self.sweeps.remove(id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!("Evicted {} finished sweeps", removed);
        }
        removed
    }

    pub fn get_sweep(&self, id: &str) -> Option<SweepJob> {
        self.sweeps.get(id).map(|r| r.value().clone())
    }

    pub fn list_sweeps(&self) -> Vec<SweepJob> {
        let mut jobs: Vec<SweepJob> =
            self.sweeps.iter().map(|r| r.value().clone()).collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Append one finished heading to a running job.
    pub fn record_heading(&self, id: &str, entry: &HeadingCoverage) {
        if let Some(mut job) = self.sweeps.get_mut(id) {
            job.entries.push(entry.clone());
        }
    }

    /// Store the outcome of a sweep and stamp its finish time.
    pub fn finish_sweep(&self, id: &str, outcome: Result<HeadingSweep, String>) {
        let now = Utc::now();
        {
            let Some(mut job) = self.sweeps.get_mut(id) else {
                return;
            };
            match outcome {
                Ok(sweep) => {
                    job.status = if sweep.cancelled {
                        SweepStatus::Cancelled
                    } else {
                        SweepStatus::Completed
                    };
                    job.entries = sweep.entries;
                }
                Err(err) => {
                    job.status = SweepStatus::Failed;
                    job.error = Some(err);
                }
            }
            job.finished_at = Some(now);
        }
        // Shard guard is released above; pruning takes its own locks.
        self.prune_sweeps(now);
    }

    /// Request cancellation. Returns the job's status, or `None` if unknown.
    pub fn cancel_sweep(&self, id: &str) -> Option<SweepStatus> {
        let job = self.sweeps.get(id)?;
        if !job.status.is_finished() {
            job.cancel.cancel();
        }
        Some(job.status)
    }
}
