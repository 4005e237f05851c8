use anyhow::{Context, Result};
use cholcma_protocol::{
    HeartbeatResponse, RegisterRequest, RegisterResponse, ResultSubmission, TaskAssignment,
};

use crate::config::Config;

#[derive(Clone)]
pub struct ServerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ServerClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cfg.server_url.trim_end_matches('/').to_string(),
            token: cfg.auth_token.clone(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
    }

    pub async fn register(&self, name: &str, slots: usize) -> Result<String> {
        let url = format!("{}/api/workers/register", self.base_url);
        let body = RegisterRequest {
            name: name.to_string(),
            slots,
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        };
        let resp = self
            .auth(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .context("Failed to connect to server")?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Registration failed: HTTP {status}");
        }
        let data: RegisterResponse = resp.json().await.context("Malformed registration reply")?;
        Ok(data.worker_id)
    }

    pub async fn heartbeat(&self, worker_id: &str) -> Result<HeartbeatResponse> {
        let url = format!("{}/api/workers/heartbeat/{}", self.base_url, worker_id);
        let resp = self
            .auth(self.http.get(&url))
            .send()
            .await
            .context("Failed to send heartbeat")?;
        if !resp.status().is_success() {
            anyhow::bail!("Heartbeat failed: HTTP {}", resp.status());
        }
        Ok(resp.json().await.unwrap_or_default())
    }

    pub async fn fetch_task(&self, worker_id: &str) -> Result<Option<TaskAssignment>> {
        let url = format!("{}/api/tasks/next/{}", self.base_url, worker_id);
        let resp = self
            .auth(self.http.get(&url))
            .send()
            .await
            .context("Failed to poll for tasks")?;
        if resp.status() == reqwest::StatusCode::NO_CONTENT
            || resp.status() == reqwest::StatusCode::NOT_FOUND
        {
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("Fetch task failed: HTTP {}", resp.status());
        }
        let assignment: TaskAssignment = resp.json().await.context("Malformed task")?;
        Ok(Some(assignment))
    }

    pub async fn submit_result(&self, submission: &ResultSubmission) -> Result<()> {
        let url = format!("{}/api/results/submit", self.base_url);
        let resp = self
            .auth(self.http.post(&url))
            .json(submission)
            .send()
            .await
            .context("Failed to submit result")?;
        match resp.status() {
            s if s.is_success() => Ok(()),
            // The run finished or dropped this task already.
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::CONFLICT => {
                tracing::debug!(
                    run_id = %submission.run_id,
                    task_id = submission.task.id,
                    status = %resp.status(),
                    "Result not accepted"
                );
                Ok(())
            }
            s => anyhow::bail!("Submit result failed: HTTP {s}"),
        }
    }
}
