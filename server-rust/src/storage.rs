use anyhow::{Context, Result};
use std::path::Path;

use crate::models::RunState;
use crate::state::AppState;

/// Write runs, workers and history. Each collection is serialized under its
/// own read lock, released before the next one is taken.
pub async fn save_state(state: &AppState) -> Result<()> {
    let dir = Path::new(&state.data_dir);
    tokio::fs::create_dir_all(dir).await?;

    let runs_json = serde_json::to_string_pretty(&*state.runs.read().await)?;
    tokio::fs::write(dir.join("runs.json"), runs_json).await?;

    let workers_json = serde_json::to_string_pretty(&*state.workers.read().await)?;
    tokio::fs::write(dir.join("workers.json"), workers_json).await?;

    let history_json = serde_json::to_string_pretty(&*state.history.read().await)?;
    tokio::fs::write(dir.join("history.json"), history_json).await?;

    Ok(())
}

pub async fn load_state(state: &AppState) -> Result<()> {
    let dir = Path::new(&state.data_dir);

    if let Ok(data) = tokio::fs::read_to_string(dir.join("runs.json")).await {
        *state.runs.write().await = serde_json::from_str(&data).context("parsing runs.json")?;
    }
    if let Ok(data) = tokio::fs::read_to_string(dir.join("workers.json")).await {
        *state.workers.write().await =
            serde_json::from_str(&data).context("parsing workers.json")?;
    }
    if let Ok(data) = tokio::fs::read_to_string(dir.join("history.json")).await {
        *state.history.write().await =
            serde_json::from_str(&data).context("parsing history.json")?;
    }

    // Engines live in memory only
    let mut runs = state.runs.write().await;
    for run in runs.values_mut() {
        if run.status == RunState::Running {
            tracing::warn!(run_id = %run.id, "run was in progress at shutdown, marking interrupted");
            run.status = RunState::Interrupted;
        }
    }

    Ok(())
}
