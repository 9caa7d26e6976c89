use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Local};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::fs;
use tracing::warn;

use crate::error::{ExploreError, Result};
use crate::paths::{self, RealStat};
use crate::SharedState;

// -------------------------------------------
// Types
// -------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One listed child of a directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub item_count: usize,
    pub size: String,
    pub modified_at: String,
    /// Set when the child could not be resolved; the rest is placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const DIR_SIZE_PLACEHOLDER: &str = "-";

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

// -------------------------------------------
// Handler
// -------------------------------------------

/// GET /api/files?path=
pub async fn list_files(
    State(state): State<SharedState>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Vec<Entry>>> {
    let requested = q.path.unwrap_or_default();
    let entries = list(&state.root, &requested).await.map_err(|e| {
        warn!("listing {:?} failed: {}", requested, e);
        e
    })?;
    Ok(Json(entries))
}

// -------------------------------------------
// Lister
// -------------------------------------------

/// Lists the immediate children of `requested` under `root`, in
/// enumeration order.
pub async fn list(root: &Path, requested: &str) -> Result<Vec<Entry>> {
    let dir_path = paths::resolve(root, requested)?;
    let client_dir = paths::client_form(requested)?;

    let stat = paths::resolve_symlink(&dir_path).await?;
    if stat.kind != EntryKind::Directory {
        return Err(ExploreError::NotADirectory(client_dir));
    }

    let mut rd = fs::read_dir(&dir_path)
        .await
        .map_err(|e| ExploreError::from_io(client_dir.as_str(), e))?;

    let mut children: Vec<(String, PathBuf)> = Vec::new();
    loop {
        match rd.next_entry().await {
            Ok(Some(child)) => {
                children.push((child.file_name().to_string_lossy().into_owned(), child.path()))
            }
            Ok(None) => break,
            Err(e) => return Err(ExploreError::from_io(client_dir.as_str(), e)),
        }
    }

    let entries = join_all(
        children
            .into_iter()
            .map(|(name, path)| describe(&client_dir, name, path)),
    )
    .await;

    Ok(entries)
}

/// Builds the entry for one child; never fails, degrading instead.
async fn describe(client_dir: &str, name: String, path: PathBuf) -> Entry {
    let client = paths::client_path(client_dir, &name);

    match paths::resolve_symlink(&path).await {
        Ok(stat) => entry_from_stat(name, client, &stat).await,
        Err(e) => {
            warn!("degrading entry {}: {}", client, e);
            Entry {
                name,
                path: client,
                kind: EntryKind::File,
                item_count: 0,
                size: DIR_SIZE_PLACEHOLDER.to_string(),
                modified_at: String::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

async fn entry_from_stat(name: String, client: String, stat: &RealStat) -> Entry {
    let (item_count, size) = match stat.kind {
        EntryKind::Directory => (
            count_children(&stat.real_path).await,
            DIR_SIZE_PLACEHOLDER.to_string(),
        ),
        EntryKind::File => (0, human_size(stat.size)),
    };

    Entry {
        name,
        path: client,
        kind: stat.kind,
        item_count,
        size,
        modified_at: stat.modified.map(local_time).unwrap_or_default(),
        error: None,
    }
}

/// Shallow child count; an unreadable directory counts as empty.
async fn count_children(dir: &Path) -> usize {
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) => {
            warn!("cannot count items in {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut n = 0;
    while let Ok(Some(_)) = rd.next_entry().await {
        n += 1;
    }
    n
}

// --------------------------------------------
// Helpers
// --------------------------------------------

/// Byte size rendered in MiB with two decimals.
pub fn human_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn local_time(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format("%c").to_string()
}
