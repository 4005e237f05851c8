mod models;
mod routes;
mod scheduler;
mod state;
mod storage;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cholcma-server", about = "Distributed CMA-ES orchestration server")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value = "7434", env = "CHOLCMA_PORT")]
    port: u16,

    /// Auth token (required for all endpoints)
    #[arg(long, env = "CHOLCMA_TOKEN")]
    token: String,

    /// Data directory for persistence
    #[arg(long, default_value = "./server-data", env = "CHOLCMA_DATA_DIR")]
    data_dir: String,

    /// Seconds before an unanswered task is handed to another worker
    #[arg(long, default_value = "300", env = "CHOLCMA_TASK_TIMEOUT")]
    task_timeout: u64,

    /// Seconds without contact before a worker is marked offline
    #[arg(long, default_value = "120")]
    offline_after: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    tracing::info!(port = cli.port, data_dir = %cli.data_dir, "Starting cholcma server");

    let state = state::AppState::new(cli.token, cli.data_dir);

    // Load persisted state
    if let Err(e) = storage::load_state(&state).await {
        tracing::warn!("Failed to load persisted state: {e:#}");
    }

    let reaper_state = state.clone();
    let lease_timeout = Duration::from_secs(cli.task_timeout);
    let offline_after = chrono::Duration::seconds(cli.offline_after);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(15));
        loop {
            tick.tick().await;
            reaper_state.reap(lease_timeout, offline_after).await;
        }
    });

    let app = routes::create_router(state.clone()).layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = storage::save_state(&state).await {
        tracing::warn!("Failed to persist state on shutdown: {e:#}");
    }
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
