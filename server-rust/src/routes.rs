use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use cholcma::{Budget, CmaError, Settings};
use cholcma_protocol::{
    HeartbeatResponse, RegisterRequest, RegisterResponse, ResultSubmission, SubmitRunRequest,
    SubmitRunResponse, TaskAssignment, TaskKind,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::models::*;
use crate::scheduler::SchedulerError;
use crate::state::AppState;
use crate::storage;

/// Bodies carry a point per task; anything near this is a mistake.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/workers/register", post(register_worker))
        .route("/api/workers/heartbeat/{worker_id}", get(heartbeat))
        .route("/api/runs/submit", post(submit_run))
        .route("/api/runs/{run_id}", get(get_run))
        .route("/api/runs/{run_id}/csv", get(get_run_csv))
        .route("/api/runs/{run_id}/stop", post(stop_run))
        .route("/api/tasks/next/{worker_id}", get(next_task))
        .route("/api/results/submit", post(submit_result))
        .route("/api/status", get(status))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == state.auth_token => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn reject(e: &SchedulerError) -> StatusCode {
    match e {
        SchedulerError::UnknownRun => StatusCode::NOT_FOUND,
        SchedulerError::NotOutstanding(_) => StatusCode::CONFLICT,
        SchedulerError::Rejected {
            error: CmaError::Protocol(_),
            ..
        } => StatusCode::CONFLICT,
        SchedulerError::Rejected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn register_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, StatusCode> {
    check_auth(&state, &headers)?;
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let worker = Worker {
        id: id.clone(),
        name: req.name,
        slots: req.slots.max(1),
        registered_at: now,
        last_heartbeat: now,
        status: WorkerStatus::Idle,
        in_flight: 0,
        evaluations: 0,
        version: req.version,
    };
    tracing::info!(worker_id = %id, name = %worker.name, slots = worker.slots, "Worker registered");
    state.workers.write().await.insert(id.clone(), worker);
    let _ = storage::save_state(&state).await;
    Ok(Json(RegisterResponse { worker_id: id }))
}

async fn heartbeat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(worker_id): Path<String>,
) -> Result<Json<HeartbeatResponse>, StatusCode> {
    check_auth(&state, &headers)?;
    let mut workers = state.workers.write().await;
    let w = workers.get_mut(&worker_id).ok_or(StatusCode::NOT_FOUND)?;
    w.last_heartbeat = Utc::now();
    if w.status == WorkerStatus::Offline {
        w.status = WorkerStatus::Idle;
    }
    Ok(Json(HeartbeatResponse {
        status: "ok".into(),
        stop: false,
    }))
}

async fn submit_run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitRunRequest>,
) -> Result<Json<SubmitRunResponse>, StatusCode> {
    check_auth(&state, &headers)?;
    let settings: Settings = parse_or_default(req.settings)?;
    let budget: Budget = parse_or_default(req.budget)?;
    let id = uuid::Uuid::new_v4().to_string();

    let created = state.scheduler.lock().await.create_run(
        &id,
        &req.objective,
        &req.x0,
        settings.clone(),
        budget.clone(),
        req.concurrency,
    );
    let (population, concurrency) = created.map_err(|e| {
        tracing::warn!(error = %e, "Rejected run");
        StatusCode::BAD_REQUEST
    })?;

    let run = Run {
        id: id.clone(),
        objective: req.objective,
        best_x: req.x0.clone(),
        x0: req.x0,
        settings,
        budget,
        population,
        concurrency,
        status: RunState::Running,
        termination: None,
        best_f: f64::NAN,
        generations: 0,
        evaluations: 0,
        created_at: Utc::now(),
        completed_at: None,
        error: None,
    };
    tracing::info!(run_id = %id, objective = %run.objective, dim = run.x0.len(), population, concurrency, "Run submitted");
    state.runs.write().await.insert(id.clone(), run);
    let _ = storage::save_state(&state).await;
    Ok(Json(SubmitRunResponse {
        run_id: id,
        population,
        concurrency,
    }))
}

/// `null` selects the defaults; anything else must parse.
fn parse_or_default<T: serde::de::DeserializeOwned + Default>(v: Value) -> Result<T, StatusCode> {
    if v.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(v).map_err(|e| {
        tracing::warn!(error = %e, "Invalid run options");
        StatusCode::BAD_REQUEST
    })
}

async fn next_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(worker_id): Path<String>,
) -> Result<Json<TaskAssignment>, StatusCode> {
    check_auth(&state, &headers)?;

    {
        let mut workers = state.workers.write().await;
        if let Some(w) = workers.get_mut(&worker_id) {
            w.last_heartbeat = Utc::now();
        }
    }

    let assignment = state.scheduler.lock().await.next_task(&worker_id);
    let Some(assignment) = assignment else {
        return Err(StatusCode::NO_CONTENT);
    };

    let mut workers = state.workers.write().await;
    if let Some(w) = workers.get_mut(&worker_id) {
        w.in_flight += 1;
        w.status = WorkerStatus::Busy;
    }
    Ok(Json(assignment))
}

async fn submit_result(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ResultSubmission>,
) -> Result<Json<Value>, StatusCode> {
    check_auth(&state, &headers)?;
    if req.task.kind != TaskKind::Evaluate {
        return Err(StatusCode::BAD_REQUEST);
    }

    let task_id = req.task.id;
    let result = state
        .scheduler
        .lock()
        .await
        .submit_result(&req.run_id, req.task);

    {
        let mut workers = state.workers.write().await;
        if let Some(w) = workers.get_mut(&req.worker_id) {
            w.in_flight = w.in_flight.saturating_sub(1);
            if result.is_ok() {
                w.evaluations += 1;
            }
            if w.in_flight == 0 {
                w.status = WorkerStatus::Idle;
            }
        }
    }

    let events = match result {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(run_id = %req.run_id, task_id, worker_id = %req.worker_id, "Result rejected: {e:?}");
            let status = reject(&e);
            if let SchedulerError::Rejected { events, .. } = e {
                if state.apply(events).await {
                    let _ = storage::save_state(&state).await;
                }
            }
            return Err(status);
        }
    };

    let generations = events.len();
    if state.apply(events).await || generations > 0 {
        let _ = storage::save_state(&state).await;
    }
    Ok(Json(json!({ "status": "ok" })))
}

async fn stop_run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    check_auth(&state, &headers)?;
    let events = state
        .scheduler
        .lock()
        .await
        .stop_run(&run_id)
        .map_err(|e| reject(&e))?;
    let finished = state.apply(events).await;
    let _ = storage::save_state(&state).await;
    Ok(Json(json!({ "status": if finished { "stopped" } else { "draining" } })))
}

async fn get_run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    check_auth(&state, &headers)?;
    let run = state
        .runs
        .read()
        .await
        .get(&run_id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    let history = state.history.read().await;
    let rows: Vec<_> = history.iter().filter(|r| r.run_id == run_id).collect();
    Ok(Json(json!({
        "run": run,
        "history": rows,
        "count": rows.len(),
    })))
}

async fn get_run_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(run_id): Path<String>,
) -> Result<String, StatusCode> {
    check_auth(&state, &headers)?;
    let history = state.history.read().await;
    let rows: Vec<_> = history.iter().filter(|r| r.run_id == run_id).collect();
    if rows.is_empty() {
        return Ok(String::new());
    }

    let dim = rows[0].x.len();
    let xs: Vec<String> = (0..dim).map(|i| format!("x{i}")).collect();
    let mut csv = format!("generation,evaluations,f,{}\n", xs.join(","));
    for row in &rows {
        let vals: Vec<String> = row.x.iter().map(|v| v.to_string()).collect();
        csv.push_str(&format!(
            "{},{},{},{}\n",
            row.generation,
            row.evaluations,
            row.f,
            vals.join(",")
        ));
    }
    Ok(csv)
}

async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    check_auth(&state, &headers)?;
    Ok(Json(status_body(&state).await))
}

/// Snapshot for `/api/status`, taking one lock at a time.
async fn status_body(state: &AppState) -> Value {
    let workers: Vec<Worker> = state.workers.read().await.values().cloned().collect();
    let runs: Vec<Run> = state.runs.read().await.values().cloned().collect();
    let total_generations = state.history.read().await.len();
    let (active_runs, queue_length, leased) = {
        let scheduler = state.scheduler.lock().await;
        (scheduler.active_runs(), scheduler.queue_len(), scheduler.leased())
    };

    json!({
        "workers": workers,
        "runs": runs,
        "active_runs": active_runs,
        "queue_length": queue_length,
        "leased": leased,
        "total_generations": total_generations,
        "uptime_secs": (Utc::now() - state.start_time).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_state() -> (Arc<AppState>, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("cholcma-routes-{}", uuid::Uuid::new_v4()));
        let state = AppState::new("t".into(), dir.to_string_lossy().into_owned());
        (state, dir)
    }

    fn auth() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer t".parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_only_accepted_results_count() {
        let (state, dir) = test_state();
        let Json(reg) = register_worker(
            State(state.clone()),
            auth(),
            Json(RegisterRequest {
                name: "w".into(),
                slots: 1,
                version: None,
            }),
        )
        .await
        .unwrap();
        let Json(run) = submit_run(
            State(state.clone()),
            auth(),
            Json(SubmitRunRequest {
                objective: "sphere".into(),
                x0: vec![1.0, 2.0],
                settings: json!({ "seed": 3 }),
                budget: Value::Null,
                concurrency: 1,
            }),
        )
        .await
        .unwrap();

        let Json(assignment) = next_task(State(state.clone()), auth(), Path(reg.worker_id.clone()))
            .await
            .unwrap();
        assert_eq!(assignment.run_id, run.run_id);
        let answer = ResultSubmission {
            run_id: run.run_id.clone(),
            worker_id: reg.worker_id.clone(),
            task: assignment.task.answered(5.0),
        };
        assert!(submit_result(State(state.clone()), auth(), Json(answer.clone())).await.is_ok());
        assert_eq!(
            submit_result(State(state.clone()), auth(), Json(answer)).await.unwrap_err(),
            StatusCode::CONFLICT
        );

        let workers = state.workers.read().await;
        let w = &workers[&reg.worker_id];
        assert_eq!(w.evaluations, 1);
        assert_eq!(w.in_flight, 0);
        drop(workers);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_status_takes_one_lock_at_a_time() {
        let (state, _dir) = test_state();
        let history = state.history.write().await;
        let reader = {
            let state = state.clone();
            tokio::spawn(async move { status_body(&state).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Parked on `history`; the earlier locks are already released.
        assert!(state.workers.try_write().is_ok());
        assert!(state.runs.try_write().is_ok());
        drop(history);

        let body = reader.await.unwrap();
        assert_eq!(body["total_generations"], 0);
        assert_eq!(body["active_runs"], 0);
    }
}
