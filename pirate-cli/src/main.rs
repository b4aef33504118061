mod shutdown;
mod worker_loop;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pirate_core::PirateConfig;
use pirate_http::{AppState, HealthReport, PipelineMetrics, StaticHealthSource};
use pirate_publisher::{Publisher, PublisherConfig};
use pirate_queue::{MemoryBackend, PirateQueue, QueueBackend, RedisBackend};
use pirate_recorder::{FsRecordWriter, Recorder, RecorderConfig};
use pirate_reconciler::Reconciler;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pirate-cli", about = "Entrypoint for every long-running pipeline component")]
struct Cli {
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    http_addr: SocketAddr,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consume `aligned`, merge HSDS candidates into the canonical schema.
    Reconciler,
    /// Consume `recorder`, write the dated JSON output tree.
    Recorder {
        #[arg(long, env = "RECORDER_OUTPUT_ROOT", default_value = "outputs")]
        output_root: std::path::PathBuf,
    },
    /// Sync recorder output and a database snapshot to the external dataset repo.
    Publisher {
        #[arg(long, env = "EXTERNAL_REPO_ROOT")]
        external_repo_root: std::path::PathBuf,
        #[arg(long, env = "PUBLISHER_CONTENT_STORE_ROOT", default_value = "content_store")]
        content_store_root: std::path::PathBuf,
    },
}

async fn build_queue(cfg: &PirateConfig) -> anyhow::Result<PirateQueue> {
    let backend: Arc<dyn QueueBackend> = if std::env::var("REDIS_URL").is_ok() {
        Arc::new(RedisBackend::connect(&cfg.redis_url).await?)
    } else {
        Arc::new(MemoryBackend::new())
    };
    Ok(PirateQueue::new(backend))
}

fn health_state(provider: &str, queue: PirateQueue, health_queue: &str) -> anyhow::Result<AppState> {
    let source = Arc::new(StaticHealthSource(HealthReport {
        provider: provider.to_string(),
        authenticated: true,
        model: "n/a".to_string(),
    }));
    Ok(AppState::new(source, queue, health_queue, Arc::new(PipelineMetrics::new()?)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let pirate_config = PirateConfig::from_env();
    let queue = build_queue(&pirate_config).await?;
    let token = shutdown::install();

    match cli.command {
        Command::Reconciler => {
            let pool = PgPoolOptions::new().connect(&pirate_config.database_url).await?;
            let reconciler = Arc::new(Reconciler::new(pool));

            let http_state = health_state("reconciler", queue.clone(), "aligned")?;
            tokio::spawn(async move {
                if let Err(e) = pirate_http::serve(http_state, cli.http_addr).await {
                    tracing::error!(error = %e, "health/metrics server exited");
                }
            });

            let loop_token = token.clone();
            let loop_queue = queue.clone();
            let handle = tokio::spawn(async move {
                worker_loop::run_loop("reconciler", loop_token, Duration::from_secs(2), || {
                    let reconciler = Arc::clone(&reconciler);
                    let queue = loop_queue.clone();
                    async move { Ok(reconciler.run_once(&queue, Duration::from_secs(15 * 60)).await?) }
                })
                .await;
            });
            shutdown::drain(token, handle).await;
        }

        Command::Recorder { output_root } => {
            let writer = Arc::new(FsRecordWriter::new(RecorderConfig::new(output_root)));
            let recorder = Arc::new(Recorder::new(writer));

            let http_state = health_state("recorder", queue.clone(), "recorder")?;
            tokio::spawn(async move {
                if let Err(e) = pirate_http::serve(http_state, cli.http_addr).await {
                    tracing::error!(error = %e, "health/metrics server exited");
                }
            });

            let loop_token = token.clone();
            let loop_queue = queue.clone();
            let handle = tokio::spawn(async move {
                worker_loop::run_loop("recorder", loop_token, Duration::from_secs(2), || {
                    let recorder = Arc::clone(&recorder);
                    let queue = loop_queue.clone();
                    async move { Ok(recorder.run_once(&queue, Duration::from_secs(2 * 60)).await?) }
                })
                .await;
            });
            shutdown::drain(token, handle).await;
        }

        Command::Publisher { external_repo_root, content_store_root } => {
            let pool = PgPoolOptions::new().connect(&pirate_config.database_url).await?;
            let recorder_output_root = std::env::var("RECORDER_OUTPUT_ROOT").unwrap_or_else(|_| "outputs".to_string());
            let publisher_config = PublisherConfig::from_pirate_config(&pirate_config, external_repo_root, recorder_output_root, content_store_root);
            let publisher = Publisher::new(publisher_config.clone(), pool);

            let http_state = health_state("publisher", queue.clone(), "recorder")?;
            tokio::spawn(async move {
                if let Err(e) = pirate_http::serve(http_state, cli.http_addr).await {
                    tracing::error!(error = %e, "health/metrics server exited");
                }
            });

            let loop_token = token.clone();
            let handle = tokio::spawn(async move {
                let mut interval = tokio::time::interval(publisher_config.interval);
                while !loop_token.is_cancelled() {
                    interval.tick().await;
                    if loop_token.is_cancelled() {
                        break;
                    }
                    if let Err(e) = publisher.run_tick().await {
                        tracing::error!(error = %e, "publisher tick failed");
                    }
                }
            });
            shutdown::drain(token, handle).await;
        }
    }

    Ok(())
}
