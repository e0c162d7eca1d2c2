mod file_config;

pub use file_config::{FileConfig, PublicDataConfig, SyncConfig};

use crate::background_jobs::jobs::DEFAULT_STALE_AFTER;
use crate::background_jobs::{clamp_sync_interval, DEFAULT_SYNC_INTERVAL};
use crate::public_data::DEFAULT_BASE_URL;
use crate::server::RequestsLoggingLevel;
use crate::sync::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 10;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub service_key: Option<String>,
    pub public_data_url: Option<String>,
    pub request_timeout_sec: Option<u64>,
    pub sync_interval_secs: Option<u64>,
    pub no_sync: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Feature configs (with defaults)
    pub public_data: PublicDataSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Clone)]
pub struct PublicDataSettings {
    /// `None` disables background sync; reads still fall through to samples.
    pub service_key: Option<String>,
    pub base_url: String,
    /// Shared by every upstream call, list and detail alike.
    pub request_timeout_sec: u64,
}

impl Default for PublicDataSettings {
    fn default() -> Self {
        Self {
            service_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub stale_after: Duration,
    pub batch_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_SYNC_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let pd_file = file.public_data.unwrap_or_default();
        let public_data = PublicDataSettings {
            service_key: pd_file
                .service_key
                .or_else(|| cli.service_key.clone())
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            base_url: pd_file
                .base_url
                .or_else(|| cli.public_data_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout_sec: pd_file
                .request_timeout_sec
                .or(cli.request_timeout_sec)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SEC)
                .max(1),
        };

        let sync_file = file.sync.unwrap_or_default();
        let interval = sync_file
            .interval_secs
            .or(cli.sync_interval_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SYNC_INTERVAL);
        let effective_interval = clamp_sync_interval(interval);
        if effective_interval != interval {
            warn!(
                "Sync interval {:?} is out of range, using {:?}",
                interval, effective_interval
            );
        }
        let sync = SyncSettings {
            enabled: sync_file.enabled.unwrap_or(!cli.no_sync),
            interval: effective_interval,
            stale_after: sync_file
                .stale_after_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_STALE_AFTER),
            batch_size: sync_file
                .batch_size
                .unwrap_or(DEFAULT_BATCH_SIZE)
                .clamp(1, MAX_BATCH_SIZE),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            public_data,
            sync,
        })
    }

    pub fn items_db_path(&self) -> PathBuf {
        self.db_dir.join("items.db")
    }

    /// Background sync needs both the switch and a service key.
    pub fn sync_active(&self) -> bool {
        self.sync.enabled && self.public_data.service_key.is_some()
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
