//! `colloquy` binary: runs, probes or checks a configured conversation.

use colloquy_agent::{build_backend, ResponseGenerator};
use colloquy_archive::{ArchiveClient, DisabledArchive, GitHubArchive};
use colloquy_core::Message;
use colloquy_orchestrator::{ColloquyConfig, ConversationEngine, SpeakerId, SystemClock};
use colloquy_session::FileTranscriptStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PROBE_PROMPT: &str = "Hello! Please reply with a short greeting.";

#[derive(Parser)]
#[command(name = "colloquy", about = "Colloquy: automated two-model conversations")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "colloquy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conversation loop
    Run,
    /// Send a greeting to each speaker's model and print the reply
    Probe,
    /// Parse and validate the config file, then exit
    Check,
}

/// Secrets from the environment win over the config file.
fn apply_secrets(config: &mut ColloquyConfig, api_key: Option<String>, github_token: Option<String>) {
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config.backend.api_key = Some(key);
    }
    if let Some(archive) = config.archive.as_mut() {
        if let Some(token) = github_token.filter(|t| !t.is_empty()) {
            archive.token = Some(token);
        }
    }
}

async fn load_config(path: &std::path::Path) -> anyhow::Result<ColloquyConfig> {
    let mut config = ColloquyConfig::load(path).await?;
    apply_secrets(
        &mut config,
        std::env::var("COLLOQUY_API_KEY").ok(),
        std::env::var("GITHUB_TOKEN").ok(),
    );
    config.validate()?;
    Ok(config)
}

fn build_archive(config: &ColloquyConfig) -> anyhow::Result<Arc<dyn ArchiveClient>> {
    match &config.archive {
        Some(archive) => {
            if archive.token.is_none() {
                warn!("No GITHUB_TOKEN set; transcripts will not be archived");
            }
            Ok(Arc::new(GitHubArchive::new(archive.clone())?))
        }
        None => Ok(Arc::new(DisabledArchive)),
    }
}

async fn run(config: ColloquyConfig) -> anyhow::Result<()> {
    let store = Arc::new(FileTranscriptStore::new(config.transcript.clone()).await?);
    let archive = build_archive(&config)?;
    let clock = Arc::new(SystemClock::new(config.rollover.time_basis));
    let generator = ResponseGenerator::new(build_backend(&config.backend), config.generation.clone());

    info!(
        provider = ?config.backend.provider,
        base_url = %config.backend.base_url(),
        dir = %config.transcript.dir.display(),
        "Starting conversation"
    );

    let mut engine = ConversationEngine::new(
        config.conversation,
        &config.rollover,
        generator,
        store,
        archive,
        clock,
    );
    let summary = engine.run().await?;
    info!(turns = summary.turns, rollovers = summary.rollovers, "Run finished");
    Ok(())
}

async fn probe(config: &ColloquyConfig) -> anyhow::Result<()> {
    let generator = ResponseGenerator::new(build_backend(&config.backend), config.generation.clone());
    let greeting = [Message::user(PROBE_PROMPT)];

    for id in [SpeakerId::A, SpeakerId::B] {
        let speaker = config.conversation.speaker(id);
        let reply = generator.generate(&speaker.model_id, &greeting).await;
        println!(
            "{} ({}): [{:?} after {} attempt(s)] {}",
            speaker.label, speaker.model_id, reply.kind, reply.attempts, reply.text
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    match cli.command {
        Commands::Run => run(config).await?,
        Commands::Probe => probe(&config).await?,
        Commands::Check => {
            println!(
                "{}: OK ({:?} topology, {} / {}, archive {})",
                cli.config.display(),
                config.conversation.topology,
                config.conversation.speaker_a.model_id,
                config.conversation.speaker_b.model_id,
                if config.archive.is_some() { "enabled" } else { "disabled" }
            );
        }
    }

    Ok(())
}
