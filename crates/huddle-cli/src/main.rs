//! Huddle CLI - multi-agent fantasy football draft simulator
//!
//! Usage:
//!   huddle run                  Run one draft and print the final rosters
//!   huddle many -n 10           Run a batch of independent drafts
//!   huddle init-config          Write the default configuration file

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use huddle_agent::{BackendConfig, DecisionBackend, HttpBackend, RankingBackend};
use huddle_core::{DraftConfig, PlayerPool, TeamController};
use huddle_orchestrator::{
    run_draft, run_many, BatchConfig, DraftResult, JsonlRecorder, NullRecorder, RunRecorder,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG: &str = "huddle.toml";
const DEFAULT_PLAYERS: &str = "data/players.csv";

#[derive(Parser)]
#[command(name = "huddle")]
#[command(author, version, about = "Multi-agent fantasy football draft simulator")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one draft
    Run {
        #[command(flatten)]
        draft: DraftArgs,

        /// Write the draft result as JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run many independent drafts concurrently
    Many {
        #[command(flatten)]
        draft: DraftArgs,

        /// Number of drafts
        #[arg(short = 'n', long, default_value = "4")]
        count: usize,

        /// Drafts in flight at once
        #[arg(short = 'j', long, default_value = "2")]
        concurrency: usize,

        /// Write every result as a JSON array
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Write the default configuration
    InitConfig {
        /// Destination path
        #[arg(default_value = DEFAULT_CONFIG)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct DraftArgs {
    /// Configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Player rankings, CSV or JSON
    #[arg(short, long, default_value = DEFAULT_PLAYERS)]
    players: PathBuf,

    /// Decide with the built-in ranking heuristic instead of a model
    #[arg(long)]
    offline: bool,

    /// Override the league seed
    #[arg(long)]
    seed: Option<u64>,

    /// Append each run's event log (JSONL) under this directory
    #[arg(long, value_name = "DIR")]
    record_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over -v
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
            EnvFilter::new(level.to_string())
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { draft, output } => cmd_run(draft, output).await,
        Commands::Many {
            draft,
            count,
            concurrency,
            output,
        } => cmd_many(draft, count, concurrency, output).await,
        Commands::InitConfig { path, force } => cmd_init_config(path, force),
    }
}

async fn cmd_run(args: DraftArgs, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(&args)?;
    let pool = load_players(&args.players).await?;
    let backend = build_backend(&config, args.offline)?;
    let recorder = build_recorder(args.record_dir.as_deref());
    let cancel = cancel_on_ctrl_c();

    let result = run_draft(&config, pool, backend, recorder, cancel)
        .await
        .context("Draft did not complete")?;

    print_result(&result);
    if let Some(path) = output {
        write_json(&path, &result).await?;
        println!("\nWrote result to {}", path.display());
    }
    Ok(())
}

async fn cmd_many(
    args: DraftArgs,
    count: usize,
    concurrency: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    if count == 0 {
        bail!("--count must be at least 1");
    }
    let config = load_config(&args)?;
    let pool = load_players(&args.players).await?;

    // One backend per run so every run has its own circuit breaker
    let backends = (0..count)
        .map(|_| build_backend(&config, args.offline))
        .collect::<Result<Vec<_>>>()?;
    let record_dir = args.record_dir.clone();
    let cancel = cancel_on_ctrl_c();

    let outcomes = run_many(
        &config,
        &pool,
        BatchConfig { count, concurrency },
        |index| backends[index].clone(),
        |_| build_recorder(record_dir.as_deref()),
        cancel,
    )
    .await;

    println!("Batch of {} drafts", outcomes.len());
    println!("==================");
    let mut results = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(result) => {
                let agent_picks = result
                    .rosters
                    .iter()
                    .filter(|r| r.controller == TeamController::Agents)
                    .flat_map(|r| r.players.iter())
                    .count();
                println!(
                    "  #{:<3} seed {:<6} complete  {} picks ({} by agent teams)  run {}",
                    outcome.index,
                    outcome.seed,
                    result.picks.len(),
                    agent_picks,
                    result.run_id
                );
                results.push(result);
            }
            Err(e) => println!(
                "  #{:<3} seed {:<6} failed    {}",
                outcome.index, outcome.seed, e
            ),
        }
    }

    if let Some(path) = output {
        write_json(&path, &results).await?;
        println!("\nWrote {} results to {}", results.len(), path.display());
    }
    Ok(())
}

fn cmd_init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    DraftConfig::write_default(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    println!("API keys are read from HUDDLE_API_KEY or OPENAI_API_KEY, never from this file.");
    Ok(())
}

fn load_config(args: &DraftArgs) -> Result<DraftConfig> {
    let mut config = DraftConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.league.seed = seed;
    }
    config.validate()?;
    info!(
        "League: {} teams, {} rounds, {:?} order",
        config.league.teams.len(),
        config.league.rounds,
        config.league.order
    );
    Ok(config)
}

async fn load_players(path: &Path) -> Result<PlayerPool> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read player rankings {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let pool = if is_json {
        PlayerPool::from_json_str(&content)
    } else {
        PlayerPool::from_csv_str(&content)
    }
    .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!("Loaded {} players from {}", pool.len(), path.display());
    Ok(pool)
}

/// Model backend from the environment, or the offline heuristic
fn build_backend(config: &DraftConfig, offline: bool) -> Result<Arc<dyn DecisionBackend>> {
    if offline || !config.has_agent_teams() {
        return Ok(Arc::new(RankingBackend::new()));
    }

    let api_key = std::env::var("HUDDLE_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("Set HUDDLE_API_KEY or OPENAI_API_KEY, or pass --offline")?;
    let mut backend_config = BackendConfig::from_settings(&config.backend, api_key);
    if let Ok(base_url) = std::env::var("HUDDLE_BASE_URL") {
        backend_config = backend_config.with_base_url(base_url);
    }

    let backend = HttpBackend::new(backend_config).context("Failed to build model backend")?;
    Ok(Arc::new(backend))
}

fn build_recorder(dir: Option<&Path>) -> Arc<dyn RunRecorder> {
    match dir {
        Some(dir) => {
            let recorder = JsonlRecorder::in_dir(dir);
            info!("Recording events to {}", recorder.path().display());
            Arc::new(recorder)
        }
        None => Arc::new(NullRecorder),
    }
}

/// Token cancelled on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => warn!("Interrupted, stopping after the current pick"),
                    Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
                }
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
    cancel
}

fn print_result(result: &DraftResult) {
    println!("\nDraft {}", result.run_id);
    println!("Order: {}", result.order.join(", "));
    println!("==========");
    for roster in &result.rosters {
        println!("{}", roster);
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
