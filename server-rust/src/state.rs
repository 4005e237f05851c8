use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cholcma_protocol::GenerationRecord;
use tokio::sync::{Mutex, RwLock};

use crate::models::*;
use crate::scheduler::{RunEvent, Scheduler};

pub struct AppState {
    pub workers: RwLock<HashMap<String, Worker>>,
    pub runs: RwLock<HashMap<String, Run>>,
    pub history: RwLock<Vec<GenerationRecord>>,
    pub scheduler: Mutex<Scheduler>,
    pub auth_token: String,
    pub data_dir: String,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(auth_token: String, data_dir: String) -> Arc<Self> {
        Arc::new(Self {
            workers: RwLock::new(HashMap::new()),
            runs: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            scheduler: Mutex::new(Scheduler::default()),
            auth_token,
            data_dir,
            start_time: Utc::now(),
        })
    }

    /// Fold scheduler events into run summaries and history. Returns true
    /// if a run finished.
    pub async fn apply(&self, events: Vec<RunEvent>) -> bool {
        let mut finished = false;
        for event in events {
            match event {
                RunEvent::Generation {
                    run_id,
                    notice,
                    evaluations,
                } => {
                    if let Some(run) = self.runs.write().await.get_mut(&run_id) {
                        run.generations = run.generations.max(notice.id);
                        run.evaluations = evaluations;
                        run.best_x = notice.x.clone();
                        run.best_f = notice.f;
                    }
                    tracing::debug!(run_id = %run_id, generation = notice.id, best_f = notice.f, "generation");
                    self.history.write().await.push(GenerationRecord {
                        run_id,
                        generation: notice.id,
                        f: notice.f,
                        x: notice.x,
                        evaluations,
                        timestamp: Utc::now(),
                    });
                }
                RunEvent::Finished { run_id, outcome } => {
                    finished = true;
                    let mut runs = self.runs.write().await;
                    let Some(run) = runs.get_mut(&run_id) else {
                        continue;
                    };
                    run.status = match (&outcome.status, outcome.termination) {
                        (cholcma::RunStatus::Failed { .. }, _) => RunState::Failed,
                        (_, cholcma::Termination::Cancelled) => RunState::Cancelled,
                        _ => RunState::Completed,
                    };
                    if let cholcma::RunStatus::Failed { error } = &outcome.status {
                        tracing::error!(run_id = %run_id, error = %error, "run failed");
                        run.error = Some(error.clone());
                    }
                    run.termination = Some(outcome.termination);
                    run.best_x = outcome.x;
                    run.best_f = outcome.f;
                    run.generations = outcome.generations;
                    run.evaluations = outcome.evaluations;
                    run.completed_at = Some(Utc::now());
                    tracing::info!(
                        run_id = %run_id,
                        termination = ?outcome.termination,
                        best_f = outcome.f,
                        generations = outcome.generations,
                        "run finished"
                    );
                }
            }
        }
        finished
    }
}

impl AppState {
    /// Requeue expired leases and mark silent workers offline.
    pub async fn reap(&self, lease_timeout: std::time::Duration, offline_after: chrono::Duration) {
        let reclaimed = self.scheduler.lock().await.requeue_stale(lease_timeout);
        let now = Utc::now();
        let mut workers = self.workers.write().await;
        for worker_id in reclaimed {
            if let Some(w) = workers.get_mut(&worker_id) {
                w.in_flight = w.in_flight.saturating_sub(1);
            }
        }
        for w in workers.values_mut() {
            if w.status != WorkerStatus::Offline && now - w.last_heartbeat > offline_after {
                tracing::warn!(worker_id = %w.id, name = %w.name, "Worker went silent, marking offline");
                w.status = WorkerStatus::Offline;
                w.in_flight = 0;
            }
        }
    }
}
