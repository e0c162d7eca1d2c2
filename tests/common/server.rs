//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own temporary database, wired
//! to a [`FakePublicDataApi`]. The scheduler timer is never started; passes
//! run through the manual sync endpoint or the synchronizer directly.

use super::constants::*;
use super::fake_api::FakePublicDataApi;
use chajajwo_server::background_jobs::jobs::{ItemSyncJob, DEFAULT_STALE_AFTER};
use chajajwo_server::background_jobs::{BackgroundJob, SyncScheduler, DEFAULT_SYNC_INTERVAL};
use chajajwo_server::listing::ListingService;
use chajajwo_server::server::server::serve;
use chajajwo_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use chajajwo_server::sync::{ItemSynchronizer, DEFAULT_BATCH_SIZE};
use chajajwo_server::{ItemCategory, ItemSource, PublicDataClient, SqliteItemStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance. Shuts down on drop; the temp dir goes with it.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Item store for direct database access in tests
    pub store: Arc<SqliteItemStore>,

    pub synchronizer: Arc<ItemSynchronizer>,

    pub scheduler: SyncScheduler,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    pub async fn spawn(api: &FakePublicDataApi) -> Self {
        Self::spawn_with_key(api, TEST_SERVICE_KEY).await
    }

    pub async fn spawn_with_key(api: &FakePublicDataApi, service_key: &str) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteItemStore::new(temp_db_dir.path().join("items.db"))
                .expect("Failed to open item store"),
        );

        let source: Arc<dyn ItemSource> = Arc::new(
            PublicDataClient::new(&api.base_url, service_key, UPSTREAM_TIMEOUT_SECS)
                .expect("Failed to create public data client"),
        );
        let synchronizer = Arc::new(ItemSynchronizer::new(
            source.clone(),
            store.clone(),
            DEFAULT_BATCH_SIZE,
        ));

        let jobs: Vec<Arc<dyn BackgroundJob>> = ItemCategory::ALL
            .iter()
            .map(|category| {
                Arc::new(ItemSyncJob::new(
                    *category,
                    synchronizer.clone(),
                    store.clone(),
                    DEFAULT_STALE_AFTER,
                )) as Arc<dyn BackgroundJob>
            })
            .collect();
        let scheduler = SyncScheduler::new(jobs, DEFAULT_SYNC_INTERVAL);
        let listing = Arc::new(ListingService::new(
            store.clone(),
            synchronizer.clone(),
            source,
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let state = ServerState::new(
            ServerConfig {
                requests_logging_level: RequestsLoggingLevel::None,
                port,
                metrics_port: 0,
            },
            listing,
            store.clone(),
            scheduler.clone(),
        );

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            serve(listener, make_app(state), token)
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            store,
            synchronizer,
            scheduler,
            _temp_db_dir: temp_db_dir,
            shutdown,
        };

        server.wait_for_ready().await;

        server
    }

    /// Polls `/` until the server answers.
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.scheduler.stop();
        self.shutdown.cancel();
    }
}
