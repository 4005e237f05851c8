use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::serde_utils::{
    deserialize_null_as_nan, deserialize_vec_null_as_nan, nan, serialize_nan_as_null,
    serialize_vec_nan_as_null,
};

/// Correlates an `Evaluate` task with its answer.
pub type TaskId = u64;

/// What a task asks of (or tells) the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// "Evaluate the objective at `x` and send it back with `f` filled in"
    Evaluate,
    /// "A generation finished, here is the representative best"
    MajorIteration,
    /// "The run is over, here is the final best"
    Done,
}

/// One message on the task stream, in either direction.
///
/// Outbound `Evaluate` tasks carry `f = NaN`; the answer echoes `id`,
/// `kind` and `x` and sets `f`. Notices (`MajorIteration`, `Done`) carry
/// the generation index as their id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    #[serde(
        serialize_with = "serialize_vec_nan_as_null",
        deserialize_with = "deserialize_vec_null_as_nan"
    )]
    pub x: Vec<f64>,
    #[serde(
        default = "nan",
        serialize_with = "serialize_nan_as_null",
        deserialize_with = "deserialize_null_as_nan"
    )]
    pub f: f64,
}

impl Task {
    /// An outbound evaluation request.
    pub fn evaluate(id: TaskId, x: Vec<f64>) -> Self {
        Self {
            id,
            kind: TaskKind::Evaluate,
            x,
            f: f64::NAN,
        }
    }

    /// A generation-boundary or terminal notice.
    pub fn notice(kind: TaskKind, generation: u64, x: Vec<f64>, f: f64) -> Self {
        Self {
            id: generation,
            kind,
            x,
            f,
        }
    }

    /// Answer this task with the objective value at `x`.
    pub fn answered(mut self, f: f64) -> Self {
        self.f = f;
        self
    }

    pub fn is_done(&self) -> bool {
        self.kind == TaskKind::Done
    }
}

/// Status of a run as seen from outside the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    NotTerminated,
    Converged,
    Failed { error: String },
}

// --- Worker <-> server bodies ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    /// Number of evaluation loops this worker runs concurrently
    #[serde(default = "default_slots")]
    pub slots: usize,
    #[serde(default)]
    pub version: Option<String>,
}

fn default_slots() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub worker_id: String,
}

/// Heartbeat reply; `stop` asks the worker to wind down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub status: String,
    #[serde(default)]
    pub stop: bool,
}

/// A task handed to a worker, with enough context to evaluate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub run_id: String,
    /// Registry name of the objective (e.g. "rosenbrock")
    pub objective: String,
    pub task: Task,
}

/// A worker's answer to a [`TaskAssignment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub run_id: String,
    pub worker_id: String,
    pub task: Task,
}

// --- Run submission ---

/// Ask the server to start an optimization run.
///
/// `settings` and `budget` are passed through as JSON and validated by the
/// optimizer when the run is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRunRequest {
    pub objective: String,
    pub x0: Vec<f64>,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub budget: serde_json::Value,
    /// Desired number of tasks in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRunResponse {
    pub run_id: String,
    pub population: usize,
    pub concurrency: usize,
}

/// One row of run history, written at every generation boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub run_id: String,
    pub generation: u64,
    #[serde(
        default = "nan",
        serialize_with = "serialize_nan_as_null",
        deserialize_with = "deserialize_null_as_nan"
    )]
    pub f: f64,
    #[serde(
        serialize_with = "serialize_vec_nan_as_null",
        deserialize_with = "deserialize_vec_null_as_nan"
    )]
    pub x: Vec<f64>,
    pub evaluations: u64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanswered_task_sends_null_f() {
        let task = Task::evaluate(7, vec![1.0, -2.5]);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["kind"], "evaluate");
        assert!(json["f"].is_null());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, 7);
        assert!(back.f.is_nan());
        assert_eq!(back.x, vec![1.0, -2.5]);
    }

    #[test]
    fn test_answer_without_f_field_is_nan() {
        let back: Task =
            serde_json::from_str(r#"{"id":3,"kind":"evaluate","x":[0.5]}"#).unwrap();
        assert!(back.f.is_nan());

        let answered: Task =
            serde_json::from_str(r#"{"id":3,"kind":"evaluate","x":[0.5],"f":0.25}"#).unwrap();
        assert_eq!(answered.f, 0.25);
    }

    #[test]
    fn test_run_status_tagging() {
        let failed = RunStatus::Failed {
            error: "singular".into(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "singular");
        let back: RunStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, failed);
    }

    #[test]
    fn test_submit_run_defaults() {
        let req: SubmitRunRequest =
            serde_json::from_str(r#"{"objective":"sphere","x0":[10,20]}"#).unwrap();
        assert_eq!(req.concurrency, 4);
        assert!(req.settings.is_null());
    }
}
