use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chajajwo_server::background_jobs::jobs::ItemSyncJob;
use chajajwo_server::background_jobs::{BackgroundJob, SyncScheduler};
use chajajwo_server::config::{AppConfig, CliConfig, FileConfig};
use chajajwo_server::listing::ListingService;
use chajajwo_server::server::{metrics, run_server, ServerConfig, ServerState};
use chajajwo_server::sync::ItemSynchronizer;
use chajajwo_server::{
    ItemCategory, ItemSource, PublicDataClient, RequestsLoggingLevel, SqliteItemStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite databases.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Public data portal service key, raw or percent-encoded.
    #[clap(long)]
    pub service_key: Option<String>,

    /// Base URL of the public data portal.
    #[clap(long)]
    pub public_data_url: Option<String>,

    /// Timeout in seconds for public data requests.
    #[clap(long)]
    pub request_timeout_sec: Option<u64>,

    /// Seconds between scheduled sync passes (minimum 60).
    #[clap(long)]
    pub sync_interval_secs: Option<u64>,

    /// Disable the background sync scheduler.
    #[clap(long)]
    pub no_sync: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            service_key: self.service_key.clone(),
            public_data_url: self.public_data_url.clone(),
            request_timeout_sec: self.request_timeout_sec,
            sync_interval_secs: self.sync_interval_secs,
            no_sync: self.no_sync,
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
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let db_path = config.items_db_path();
    info!("Opening SQLite items database at {:?}...", db_path);
    let store = Arc::new(SqliteItemStore::new(&db_path)?);

    let service_key = match &config.public_data.service_key {
        Some(key) => key.clone(),
        None => {
            warn!("No public data service key configured, background sync is disabled");
            String::new()
        }
    };
    let source: Arc<dyn ItemSource> = Arc::new(PublicDataClient::new(
        &config.public_data.base_url,
        &service_key,
        config.public_data.request_timeout_sec,
    )?);

    let synchronizer = Arc::new(ItemSynchronizer::new(
        source.clone(),
        store.clone(),
        config.sync.batch_size,
    ));

    let jobs: Vec<Arc<dyn BackgroundJob>> = ItemCategory::ALL
        .iter()
        .map(|category| {
            Arc::new(ItemSyncJob::new(
                *category,
                synchronizer.clone(),
                store.clone(),
                config.sync.stale_after,
            )) as Arc<dyn BackgroundJob>
        })
        .collect();
    let scheduler = SyncScheduler::new(jobs, config.sync.interval);
    if config.sync_active() {
        scheduler.start();
    } else {
        info!("Background sync is disabled");
    }

    let listing = Arc::new(ListingService::new(store.clone(), synchronizer, source));

    let state = ServerState::new(
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            metrics_port: config.metrics_port,
        },
        listing,
        store,
        scheduler.clone(),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let result = run_server(state, shutdown).await;
    scheduler.stop();
    info!("Server stopped");
    result
}
