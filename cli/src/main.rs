//! CLI entrypoint for consilium
//!
//! This is the main binary that wires together all layers using
//! dependency injection: config file → validated discussion config →
//! HTTP backends → knowledge store → discussion manager → evolution loop.

mod progress;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use consilium_application::{
    DiscussionManager, KnowledgeStore, NoProgress, SelfEvolutionLoop,
    ports::completion::CompletionBackend,
    ports::embedding::EmbeddingBackend,
    ports::transcript_log::{NoTranscriptLog, TranscriptLogger},
};
use consilium_domain::core::case::Case;
use consilium_domain::knowledge::entry::EntryDraft;
use consilium_domain::session::record::SessionRecord;
use consilium_infrastructure::{
    ConfigLoader, HttpCompletionBackend, HttpEmbeddingBackend, JsonPartitionStore,
    JsonlTranscriptLogger,
};
use progress::ConsoleProgress;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Final answer plus a per-round summary
    Full,
    /// The complete session record as JSON
    Json,
    /// Final answer only
    Answer,
}

/// Multi-agent clinical consultation engine
#[derive(Parser, Debug)]
#[command(name = "consilium", version, about)]
struct Cli {
    /// Free-text case description (or use --case-file)
    case: Option<String>,

    /// Case identifier when passing a description inline
    #[arg(long, default_value = "adhoc")]
    id: String,

    /// JSON file with the full case (id, description, age, symptoms)
    #[arg(long, conflicts_with = "case")]
    case_file: Option<PathBuf>,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip config files, use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// Import knowledge entries from a JSON file and exit
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Skip post-session knowledge distillation
    #[arg(long)]
    no_distill: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Full)]
    output: OutputFormat,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Entry shape accepted by `--seed`
#[derive(Debug, Deserialize)]
struct SeedEntry {
    /// "correct_answer" or "reasoning_chain"
    kind: String,
    text: String,
    #[serde(default = "default_seed_case")]
    case: String,
}

fn default_seed_case() -> String {
    "seed".to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting consilium");

    // === Configuration ===
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };
    let config = file_config.to_discussion_config()?;

    let api_key = std::env::var(&file_config.backend.api_key_env).with_context(|| {
        format!(
            "API key environment variable {} is not set",
            file_config.backend.api_key_env
        )
    })?;

    // === Dependency Injection ===
    let embedding: Arc<dyn EmbeddingBackend> = Arc::new(HttpEmbeddingBackend::new(
        file_config.embedding_base_url(),
        &api_key,
        &config.embedding_model,
        Duration::from_secs(config.call_timeout_seconds),
    ));

    let storage = Arc::new(JsonPartitionStore::new(&file_config.storage.data_dir));
    let knowledge = Arc::new(
        KnowledgeStore::open(
            Arc::clone(&embedding),
            storage,
            config.dedup_similarity_threshold,
            config.retry_limit,
        )
        .await?,
    );

    // Seeding is a standalone import step
    if let Some(seed_path) = &cli.seed {
        let imported = seed_knowledge(&knowledge, seed_path).await?;
        println!("Imported {} knowledge entries", imported);
        knowledge.flush().await?;
        return Ok(());
    }

    let case = load_case(&cli)?;

    let completion: Arc<dyn CompletionBackend> = Arc::new(
        HttpCompletionBackend::new(
            &file_config.backend.base_url,
            &api_key,
            &file_config.backend.model,
        )
        .with_temperature(file_config.backend.temperature)
        .with_max_tokens(file_config.backend.max_tokens),
    );

    let logger: Arc<dyn TranscriptLogger> = {
        let path = PathBuf::from(&file_config.storage.transcript_dir)
            .join(format!("{}.transcript.jsonl", case.id()));
        match JsonlTranscriptLogger::new(&path) {
            Some(logger) => Arc::new(logger),
            None => Arc::new(NoTranscriptLog),
        }
    };

    let prune_after = config
        .prune_after_days
        .map(|days| Duration::from_secs(u64::from(days) * 24 * 60 * 60));

    let manager = DiscussionManager::new(
        config,
        completion,
        embedding,
        Arc::clone(&knowledge),
        logger,
    )?;

    // Cancellation at the next round boundary on ctrl-c
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Cancelling after the current round...");
                cancel.cancel();
            }
        });
    }

    // === Run the session ===
    let mut record = if cli.quiet {
        manager
            .run_with_progress(case, &NoProgress, &cancel)
            .await
    } else {
        manager
            .run_with_progress(case, &ConsoleProgress, &cancel)
            .await
    };

    // === Distill ===
    if !cli.no_distill && record.state.is_distillable() {
        let mut evolution = SelfEvolutionLoop::new(Arc::clone(&knowledge));
        if let Some(prune_after) = prune_after {
            evolution = evolution.with_prune_after(prune_after);
        }
        let ids = evolution.distill(&record).await?;
        record = record.with_entries(ids);
    }

    knowledge.flush().await?;
    print_record(&record, cli.output)?;
    Ok(())
}

fn load_case(cli: &Cli) -> Result<Case> {
    if let Some(path) = &cli.case_file {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read case file {}", path.display()))?;
        let case: Case = serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid case file {}", path.display()))?;
        return Ok(case);
    }

    match &cli.case {
        Some(description) => Ok(Case::new(cli.id.as_str(), description.clone())),
        None => bail!("A case description is required (inline or via --case-file)"),
    }
}

async fn seed_knowledge(knowledge: &KnowledgeStore, path: &PathBuf) -> Result<usize> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let seeds: Vec<SeedEntry> = serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid seed file {}", path.display()))?;

    let mut imported = 0;
    for seed in seeds {
        let draft = match seed.kind.as_str() {
            "correct_answer" => EntryDraft::correct_answer(seed.case.as_str().into(), seed.text),
            "reasoning_chain" => EntryDraft::reasoning_chain(seed.case.as_str().into(), seed.text),
            other => bail!("Unknown seed entry kind: {}", other),
        };
        knowledge.upsert(draft).await?;
        imported += 1;
    }
    Ok(imported)
}

fn print_record(record: &SessionRecord, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        OutputFormat::Answer => match &record.final_answer {
            Some(answer) => println!("{}", answer),
            None => println!(
                "[{}] {}",
                record.state,
                record.reason.as_deref().unwrap_or("no answer")
            ),
        },
        OutputFormat::Full => {
            println!("Case: {}", record.case_id);
            println!("State: {}", record.state);
            if let Some(answer) = &record.final_answer {
                println!("\nFinal answer:\n{}", answer);
            }
            if let Some(reason) = &record.reason {
                println!("\nReason: {}", reason);
            }
            println!("\nRounds: {}", record.transcript.rounds().len());
            for round in record.transcript.rounds() {
                let verdict = round
                    .verdict
                    .as_ref()
                    .map(|v| format!("{} ({:.3})", v.verdict, v.agreement))
                    .unwrap_or_else(|| "unevaluated".to_string());
                println!("  round {}: {} turns, {}", round.number, round.turns.len(), verdict);
            }
            if !record.entries_written.is_empty() {
                println!("\nKnowledge entries written:");
                for id in &record.entries_written {
                    println!("  {}", id);
                }
            }
        }
    }
    Ok(())
}
