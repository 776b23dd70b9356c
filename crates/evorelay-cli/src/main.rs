use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use evorelay_agents::{LlmProvider, OpenAiProvider, OpenAiTts, SpeechVoice, WhisperStt};
use evorelay_channels::EvolutionClient;
use evorelay_config::{AppConfig, ConfigLoader, StoreBackend};
use evorelay_db::{ConversationStore, KvBackend, MemoryBackend, RedisBackend};
use evorelay_gateway::{
    AppState, Capabilities, GatewayServer, RelaySettings, ReplyOrchestrator,
};
use evorelay_security::RedactingWriter;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Completion and transcription calls can be slow; this bounds them.
const OPENAI_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser)]
#[command(
    name = "evorelay",
    version,
    about = "Relay WhatsApp messages from Evolution API to OpenAI and reply with text and voice"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a TOML config file. Environment variables override its values.
    #[arg(long, global = true, env = "EVORELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server (default when no subcommand is provided).
    Serve,
    /// Print the Evolution instance connection state and OpenAI reachability.
    Status,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(RedactingWriter::stderr()),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(RedactingWriter::stderr()),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = ConfigLoader::new(cli.config.clone())
        .load()
        .context("failed to load configuration")?;

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Status) => status(&config).await,
    }
}

fn evolution_client(config: &AppConfig) -> anyhow::Result<EvolutionClient> {
    let client = EvolutionClient::with_timeout(
        &config.evolution.api_url,
        config.evolution.api_key.clone(),
        config.evolution.instance.clone(),
        Duration::from_secs(config.evolution.timeout_secs),
    )?
    .with_audio_caption(config.relay.audio_caption.clone());
    Ok(client)
}

fn openai_provider(config: &AppConfig, http: reqwest::Client) -> OpenAiProvider {
    OpenAiProvider::with_client(
        http,
        config.openai.api_key.clone(),
        Some(config.openai.base_url.clone()),
    )
}

async fn open_store(config: &AppConfig) -> anyhow::Result<ConversationStore> {
    let backend: Arc<dyn KvBackend> = match config.relay.store {
        StoreBackend::Redis => {
            let backend = RedisBackend::connect(&config.redis.url(), config.redis.password())
                .await
                .with_context(|| format!("failed to connect to redis at {}", config.redis.addr))?;
            info!(addr = %config.redis.addr, db = config.redis.db, "connected to redis");
            Arc::new(backend)
        }
        StoreBackend::Memory => {
            warn!("using in-memory history store; conversations are lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };

    Ok(ConversationStore::with_limits(
        backend,
        config.relay.history_limit,
        Duration::from_secs(config.relay.history_ttl_secs),
    ))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "evorelay starting");

    let store = open_store(&config).await?;
    let http = reqwest::Client::builder()
        .timeout(OPENAI_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;
    let base_url = Some(config.openai.base_url.clone());
    let voice = SpeechVoice::from_name(&config.openai.voice);

    let capabilities = Capabilities {
        llm: Arc::new(openai_provider(&config, http.clone())),
        stt: Arc::new(WhisperStt::new(
            http.clone(),
            config.openai.api_key.clone(),
            base_url.clone(),
        )),
        tts: Arc::new(OpenAiTts::new(
            http,
            config.openai.api_key.clone(),
            base_url,
            voice,
        )),
        gateway: Arc::new(evolution_client(&config)?),
    };
    info!(
        model = %config.openai.model,
        voice = voice.as_str(),
        instance = %config.evolution.instance,
        audio_replies = config.relay.audio_replies,
        "reply pipeline ready"
    );

    let orchestrator =
        ReplyOrchestrator::new(capabilities, store.clone(), RelaySettings::from_config(&config));
    let state = Arc::new(AppState::new(orchestrator));

    let result = GatewayServer::new(config.server.bind.clone(), state)
        .run(shutdown_signal())
        .await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close history store");
    }
    result.context("webhook server failed")
}

async fn status(config: &AppConfig) -> anyhow::Result<()> {
    let evolution = evolution_client(config)?;
    let state = evolution
        .connection_state()
        .await
        .context("failed to query instance connection state")?;
    println!("evolution instance {}: {state}", evolution.instance());

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;
    let reachable = openai_provider(config, http).health_check().await?;
    println!(
        "openai: {}",
        if reachable { "reachable" } else { "unreachable" }
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
