use aixmon_agent::config::AgentConfig;
use aixmon_agent::scrape::Scraper;
use aixmon_agent::server::{self, Exposition};
use aixmon_agent::write::RemoteWriter;
use aixmon_collector::{host_collectors, HostMetrics};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = AgentConfig::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_directive().parse()?))
        .init();

    let host = HostMetrics::new(host_collectors(config.collector_options())?);
    let exposition = Arc::new(Exposition::new(host)?);

    let listener = TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;

    let cancel = CancellationToken::new();
    let (send_to, memory) = mpsc::unbounded_channel();

    let scraper = Scraper::new(send_to, config.scrape_url(), config.scrape_interval())?;
    let writer = RemoteWriter::from_config(&config)?;

    let scrape_interval = config.scrape_interval();
    let scrape_cancel = cancel.clone();
    let scrape_task = tokio::spawn(async move { scraper.run(scrape_interval, scrape_cancel).await });
    let write_cancel = cancel.clone();
    let write_task = tokio::spawn(async move { writer.run(memory, write_cancel).await });

    exposition.up.set(1);
    tracing::info!(listen = %config.listen_address, "Serving");

    let shutdown = cancel.clone();
    axum::serve(listener, server::router(exposition))
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => tracing::info!("Shutting down gracefully"),
                _ = shutdown.cancelled() => {}
            }
        })
        .await
        .context("HTTP server failed")?;

    cancel.cancel();
    let (scrape_exit, write_exit) = tokio::join!(scrape_task, write_task);
    report_task_exit("Scraper", scrape_exit);
    report_task_exit("Remote writer", write_exit);
    Ok(())
}

/// Log a background task that panicked or was aborted. Returns false in that case.
fn report_task_exit(task: &str, exit: Result<(), JoinError>) -> bool {
    match exit {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(task, error = %e, "Background task failed");
            false
        }
    }
}
