mod client;
mod config;
mod objectives;
mod worker;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cholcma-worker", about = "cholcma distributed evaluation worker")]
struct Cli {
    /// Server URL (e.g. http://localhost:7434)
    #[arg(long, env = "CHOLCMA_SERVER")]
    server: String,

    /// Auth token
    #[arg(long, env = "CHOLCMA_TOKEN")]
    token: String,

    /// Worker name (e.g. lab-node-3)
    #[arg(long, env = "CHOLCMA_WORKER_NAME")]
    name: String,

    /// Idle poll interval in seconds
    #[arg(long, default_value = "2")]
    poll_interval: u64,

    /// Concurrent evaluation loops
    #[arg(long, default_value = "1")]
    slots: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::Config {
        server_url: cli.server,
        auth_token: cli.token,
        worker_name: cli.name,
        poll_interval_secs: cli.poll_interval,
        slots: cli.slots.max(1),
    };

    tracing::info!(
        worker = %cfg.worker_name,
        server = %cfg.server_url,
        slots = cfg.slots,
        version = env!("CARGO_PKG_VERSION"),
        "Starting cholcma worker"
    );

    let client = client::ServerClient::new(&cfg);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = signal_tx.send(true);
    });

    // Register with server (retry until it answers)
    let worker_id = loop {
        match client.register(&cfg.worker_name, cfg.slots).await {
            Ok(id) => {
                tracing::info!(worker_id = %id, "Registered with server");
                break id;
            }
            Err(e) => {
                tracing::warn!("Registration failed: {e:#}, retrying in 10s");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(10)) => {}
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Shut down before registering");
                        return Ok(());
                    }
                }
            }
        }
    };

    // Heartbeats keep the worker out of the server's offline sweep.
    let hb_client = client.clone();
    let hb_wid = worker_id.clone();
    let hb_shutdown = shutdown_tx.clone();
    let hb_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15));
        loop {
            interval.tick().await;
            match hb_client.heartbeat(&hb_wid).await {
                Ok(reply) if reply.stop => {
                    tracing::warn!("Server asked this worker to stop");
                    let _ = hb_shutdown.send(true);
                    return;
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Heartbeat failed: {e:#}"),
            }
        }
    });

    let poll_interval = Duration::from_secs(cfg.poll_interval_secs);
    let loops: Vec<_> = (0..cfg.slots)
        .map(|slot| {
            tokio::spawn(worker::run_slot(
                client.clone(),
                worker_id.clone(),
                slot,
                poll_interval,
                shutdown_tx.subscribe(),
            ))
        })
        .collect();

    for handle in loops {
        if let Err(e) = handle.await {
            tracing::error!("Evaluation loop aborted: {e}");
        }
    }
    hb_handle.abort();

    tracing::info!("Worker shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
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
