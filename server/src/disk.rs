use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::warn;

use crate::error::{ExploreError, Result};
use crate::SharedState;

/// One row of `df -h`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percentage: String,
    pub mounted_on: String,
}

/// Parses `df` output: a header line, then one data row. Long device
/// names make df wrap the row, so everything after the header is joined.
pub fn parse_df(output: &str) -> Option<DiskUsage> {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());
    lines.next()?;

    let fields: Vec<&str> = lines.flat_map(str::split_whitespace).collect();
    if fields.len() < 6 {
        return None;
    }

    Some(DiskUsage {
        filesystem: fields[0].to_string(),
        size: fields[1].to_string(),
        used: fields[2].to_string(),
        available: fields[3].to_string(),
        use_percentage: fields[4].to_string(),
        // Mount points may contain spaces.
        mounted_on: fields[5..].join(" "),
    })
}

pub async fn disk_usage_of(path: &Path) -> Result<DiskUsage> {
    let output = Command::new("df")
        .arg("-h")
        .arg(path)
        .output()
        .await
        .map_err(|e| ExploreError::ExecutionFailed(format!("cannot run df: {}", e)))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() || !stderr.trim().is_empty() {
        return Err(ExploreError::ExecutionFailed(format!(
            "df failed: {}",
            stderr.trim()
        )));
    }

    parse_df(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| ExploreError::ExecutionFailed("unexpected df output".into()))
}

/// GET /api/disk-usage
pub async fn disk_usage(State(state): State<SharedState>) -> Result<Json<DiskUsage>> {
    let usage = disk_usage_of(&state.root).await.map_err(|e| {
        warn!("disk usage failed: {}", e);
        e
    })?;
    Ok(Json(usage))
}
