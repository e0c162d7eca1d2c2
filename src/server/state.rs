use axum::extract::FromRef;

use crate::background_jobs::SyncScheduler;
use crate::item_store::SyncStatusStore;
use crate::listing::ListingService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedListingService = Arc<ListingService>;
pub type GuardedSyncStatusStore = Arc<dyn SyncStatusStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub listing: GuardedListingService,
    pub status_store: GuardedSyncStatusStore,
    pub scheduler: SyncScheduler,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        listing: GuardedListingService,
        status_store: GuardedSyncStatusStore,
        scheduler: SyncScheduler,
    ) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            listing,
            status_store,
            scheduler,
        }
    }
}

impl FromRef<ServerState> for GuardedListingService {
    fn from_ref(input: &ServerState) -> Self {
        input.listing.clone()
    }
}

impl FromRef<ServerState> for GuardedSyncStatusStore {
    fn from_ref(input: &ServerState) -> Self {
        input.status_store.clone()
    }
}

impl FromRef<ServerState> for SyncScheduler {
    fn from_ref(input: &ServerState) -> Self {
        input.scheduler.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
