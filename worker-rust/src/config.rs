#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub auth_token: String,
    pub worker_name: String,
    pub poll_interval_secs: u64,
    /// Evaluation loops run side by side
    pub slots: usize,
}
