//! Sweep integration tests.
//!
//! Exercises terrain upload, heading sweeps, and cancellation end to end.
//!
//! Run with: cargo test --test sweep_test -- --ignored
//! Requires a running ICS server.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

fn base_url() -> String {
    std::env::var("ICS_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Ridge running north-south through the middle of a 2 km square.
fn ridge_terrain() -> Value {
    let rows = 100;
    let cols = 100;
    let resolution = 20.0;
    let mut elevations = Vec::with_capacity(rows * cols);
    for _row in 0..rows {
        for col in 0..cols {
            let x = -1000.0 + (col as f64 + 0.5) * resolution;
            elevations.push(400.0 * (-(x / 150.0_f64).powi(2)).exp());
        }
    }
    json!({
        "min_x": -1000.0,
        "min_y": -1000.0,
        "resolution_m": resolution,
        "rows": rows,
        "cols": cols,
        "elevations_m": elevations,
    })
}

async fn upload_ridge(client: &Client, base: &str) -> String {
    let resp = client
        .post(format!("{}/v1/terrain", base))
        .json(&ridge_terrain())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let summary: Value = resp.json().await.unwrap();
    summary["id"].as_str().unwrap().to_string()
}

async fn wait_for_sweep(client: &Client, base: &str, id: &str) -> Value {
    for _ in 0..600 {
        let job: Value = client
            .get(format!("{}/v1/sweeps/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if job["status"] != "running" {
            return job;
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("sweep {id} did not finish");
}

#[tokio::test]
#[ignore]
async fn test_health() {
    let resp = Client::new()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}

/// A full 16-heading sweep reports coverage for every heading.
#[tokio::test]
#[ignore]
async fn test_full_sweep_over_ridge() {
    let client = Client::new();
    let base = base_url();
    let terrain_id = upload_ridge(&client, &base).await;

    let resp = client
        .post(format!("{}/v1/sweeps", base))
        .json(&json!({ "terrain_id": terrain_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let job: Value = resp.json().await.unwrap();

    let done = wait_for_sweep(&client, &base, job["id"].as_str().unwrap()).await;
    assert_eq!(done["status"], "completed");
    let entries = done["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 16);
    for entry in entries {
        let coverage = entry["coverage"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&coverage));
    }
}

/// Cancelling right after start stops the sweep before all headings finish.
#[tokio::test]
#[ignore]
async fn test_cancel_sweep() {
    let client = Client::new();
    let base = base_url();
    let terrain_id = upload_ridge(&client, &base).await;

    let job: Value = client
        .post(format!("{}/v1/sweeps", base))
        .json(&json!({ "terrain_id": terrain_id, "heading_count": 360 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = job["id"].as_str().unwrap().to_string();

    let resp = client
        .delete(format!("{}/v1/sweeps/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let done = wait_for_sweep(&client, &base, &id).await;
    assert_eq!(done["status"], "cancelled");
    assert!(done["entries"].as_array().unwrap().len() < 360);
}
