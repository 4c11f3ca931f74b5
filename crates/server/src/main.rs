use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lascmp_engine::store::PgStore;
use lascmp_engine::{sweep, JobOrchestrator, JobRegistry, ResultIngester, TimeoutCascade};
use lascmp_events::{InProcessQueue, JobStreams};

mod config;

use config::ServerConfig;

/// Composition root for the comparison orchestration service.
///
/// Runs the engine against Postgres with the in-process queue: job
/// dispatches are emitted as JSON lines on stdout and worker results
/// are consumed as JSON lines on stdin. A broker adapter replaces both
/// ends in a multi-host deployment.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lascmp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        preprocess_timeout_secs = config.preprocess_timeout.as_secs(),
        comparison_timeout_secs = config.comparison_timeout.as_secs(),
        "Loaded server configuration",
    );

    // --- Database ---
    let pool = lascmp_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    lascmp_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    lascmp_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Engine wiring ---
    let store = Arc::new(PgStore::new(pool));
    let registry = Arc::new(JobRegistry::new());
    let (queue, streams) = InProcessQueue::new();
    let orchestrator = Arc::new(JobOrchestrator::new(
        store.clone(),
        Arc::new(queue),
        registry.clone(),
        config.preprocess_timeout,
        config.comparison_timeout,
    ));
    let ingester = Arc::new(ResultIngester::new(
        store.clone(),
        registry.clone(),
        orchestrator,
    ));

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let sweep_handle = tokio::spawn(sweep::run(
        registry,
        TimeoutCascade::new(store),
        config.sweep_interval,
        cancel.clone(),
    ));
    let dispatch_handle = tokio::spawn(emit_job_dispatches(streams, cancel.clone()));
    let results_handle = tokio::spawn(consume_results(ingester, cancel.clone()));

    tracing::info!("Orchestration service started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let _ = tokio::join!(sweep_handle, dispatch_handle, results_handle);
    tracing::info!("Orchestration service stopped");
    Ok(())
}

/// Forward dispatched job messages to stdout as JSON lines.
async fn emit_job_dispatches(mut streams: JobStreams, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(job) = streams.preprocess.recv() => {
                match serde_json::to_string(&job) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::error!(error = %e, "Failed to serialize preprocessing job"),
                }
            }
            Some(job) = streams.comparison.recv() => {
                match serde_json::to_string(&job) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::error!(error = %e, "Failed to serialize comparison job"),
                }
            }
            else => break,
        }
    }
}

/// Consume worker result messages from stdin, one JSON object per line.
///
/// Preprocessing results carry a `fileId` in their payload; comparison
/// results do not. That distinction routes the message, mirroring the
/// two result queues of a broker deployment.
async fn consume_results(ingester: Arc<ResultIngester>, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read result stream");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "Dropping unparseable result line");
                continue;
            }
        };

        let outcome = if message
            .get("payload")
            .and_then(|p| p.get("fileId"))
            .is_some()
        {
            ingester.on_preprocess_result(&message).await
        } else {
            ingester.on_comparison_result(&message).await
        };
        if let Err(e) = outcome {
            tracing::error!(error = %e, "Failed to apply worker result");
        }
    }
}
