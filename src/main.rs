use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import modules from the library crate
use engnr_server::analysis::MetricsExtractor;
use engnr_server::config;
use engnr_server::conversation_store::{ConversationStore, SqliteConversationStore};
use engnr_server::llm::{Advisor, HostedProvider, LlmProvider};
use engnr_server::processing::PipelineExecutor;
use engnr_server::server::{run_server, ServerState};
use engnr_server::session::SessionRegistry;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory for uploads, processed output and the conversation database.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Minutes before an unconfirmed processing session expires.
    #[clap(long, default_value_t = 30)]
    pub session_ttl_minutes: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            data_dir: args.data_dir.clone(),
            port: args.port,
            session_ttl_minutes: args.session_ttl_minutes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  data_dir: {:?}", app_config.data_dir);
    info!("  port: {}", app_config.port);
    info!("  session_ttl_minutes: {}", app_config.session_ttl_minutes);

    std::fs::create_dir_all(app_config.uploads_dir())?;
    std::fs::create_dir_all(app_config.processed_dir())?;

    let store = Arc::new(SqliteConversationStore::new(
        app_config.conversations_db_path(),
    )?);

    let provider: Option<Arc<dyn LlmProvider>> = match &app_config.llm.api_key {
        Some(api_key) => {
            info!("Using hosted model {}", app_config.llm.model);
            Some(Arc::new(HostedProvider::new(
                &app_config.llm.base_url,
                &app_config.llm.model,
                api_key,
            )))
        }
        None => {
            info!("No API key configured, using local advisory generation only");
            None
        }
    };

    let advisor = Arc::new(Advisor::new(
        provider,
        Duration::from_secs(app_config.llm.timeout_secs),
    ));
    let extractor = Arc::new(MetricsExtractor::new(
        &app_config.ffmpeg_path,
        &app_config.ffprobe_path,
    ));
    let executor = Arc::new(PipelineExecutor::new(
        &app_config.ffmpeg_path,
        app_config.processed_dir(),
    ));
    let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(
        app_config.session_ttl_minutes * 60,
    )));

    // Spawn background task for expiring unconfirmed processing sessions
    let shutdown_token = CancellationToken::new();
    {
        let sessions = sessions.clone();
        let token = shutdown_token.child_token();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sessions.sweep_expired();
                    }
                    _ = token.cancelled() => break,
                }
            }
        });
    }

    let state = ServerState {
        store: store as Arc<dyn ConversationStore>,
        sessions,
        advisor,
        extractor,
        executor,
        uploads_dir: app_config.uploads_dir(),
        processed_dir: app_config.processed_dir(),
    };

    info!("Ready to serve at port {}!", app_config.port);

    tokio::select! {
        result = run_server(state, app_config.port) => {
            info!("HTTP server stopped: {:?}", result);
            shutdown_token.cancel();
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            shutdown_token.cancel();
            Ok(())
        }
    }
}
