use chrono::{DateTime, Utc};
use cholcma::{Budget, Settings, Termination};
use cholcma_protocol::serde_utils::{
    deserialize_null_as_nan, deserialize_vec_null_as_nan, nan, serialize_nan_as_null,
    serialize_vec_nan_as_null,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    #[serde(default = "default_slots")]
    pub slots: usize,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub status: WorkerStatus,
    /// Tasks leased to this worker and not yet answered
    #[serde(default)]
    pub in_flight: usize,
    #[serde(default)]
    pub evaluations: u64,
    #[serde(default)]
    pub version: Option<String>,
}

fn default_slots() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub objective: String,
    pub x0: Vec<f64>,
    pub settings: Settings,
    pub budget: Budget,
    pub population: usize,
    pub concurrency: usize,
    pub status: RunState,
    #[serde(default)]
    pub termination: Option<Termination>,
    #[serde(
        default,
        serialize_with = "serialize_vec_nan_as_null",
        deserialize_with = "deserialize_vec_null_as_nan"
    )]
    pub best_x: Vec<f64>,
    #[serde(
        default = "nan",
        serialize_with = "serialize_nan_as_null",
        deserialize_with = "deserialize_null_as_nan"
    )]
    pub best_f: f64,
    #[serde(default)]
    pub generations: u64,
    #[serde(default)]
    pub evaluations: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    /// Converged or stopped on a budget limit
    Completed,
    Failed,
    Cancelled,
    /// Found running when the server restarted; the engine was lost
    Interrupted,
}
