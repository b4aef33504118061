//! `list`, `run <name>`, `run --all` and `test <name>` (dry-run, no
//! enqueue) for the scraper orchestration component.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pirate_core::PirateConfig;
use pirate_orchestrator::{Orchestrator, OrchestratorConfig};
use pirate_queue::{MemoryBackend, PirateQueue, QueueBackend, RedisBackend};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pirate-orchestrator", about = "Scraper discovery and scheduling")]
struct Cli {
    #[arg(long, env = "SCRAPERS_DIR", default_value = "scrapers")]
    scrapers_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every discovered scraper.
    List,
    /// Run one scraper and enqueue its output, or every scraper with `--all`.
    Run {
        name: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Run one scraper without enqueueing anything.
    Test { name: String },
    /// Run on the configured cron schedule until terminated.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let pirate_config = PirateConfig::from_env();
    let config = OrchestratorConfig::new(cli.scrapers_dir);

    let backend: Arc<dyn QueueBackend> = if std::env::var("REDIS_URL").is_ok() {
        Arc::new(RedisBackend::connect(&pirate_config.redis_url).await?)
    } else {
        Arc::new(MemoryBackend::new())
    };
    let queue = PirateQueue::new(backend);

    let orchestrator = Orchestrator::discover(&config, queue)?;

    match cli.command {
        Command::List => {
            for name in orchestrator.list() {
                println!("{name}");
            }
        }
        Command::Run { name: Some(name), all: false } => {
            let job_id = orchestrator.run_one(&name).await?;
            println!("enqueued {job_id}");
        }
        Command::Run { all: true, .. } => {
            let results = orchestrator.run_all().await;
            for (name, result) in results {
                match result {
                    Ok(job_id) => println!("{name}: enqueued {job_id}"),
                    Err(e) => eprintln!("{name}: failed ({e})"),
                }
            }
        }
        Command::Run { name: None, all: false } => {
            anyhow::bail!("pass a scraper name or --all");
        }
        Command::Test { name } => {
            let output = orchestrator.test_one(&name).await?;
            println!("content_hash={}", output.content_hash);
            println!("{}", output.raw_content);
        }
        Command::Serve => {
            Arc::new(orchestrator).run_forever(config.schedule).await;
        }
    }

    Ok(())
}
