//! Listing sync background job.
//!
//! One instance per category. Each run consults the sync ledger first and
//! only calls the synchronizer when the last successful sync is stale.

use crate::background_jobs::job::{BackgroundJob, JobError, JobOutcome};
use crate::category::ItemCategory;
use crate::item_store::SyncStatusStore;
use crate::sync::ItemSynchronizer;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default age after which a successful sync is considered stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

pub struct ItemSyncJob {
    category: ItemCategory,
    synchronizer: Arc<ItemSynchronizer>,
    status_store: Arc<dyn SyncStatusStore>,
    stale_after: Duration,
}

impl ItemSyncJob {
    pub fn new(
        category: ItemCategory,
        synchronizer: Arc<ItemSynchronizer>,
        status_store: Arc<dyn SyncStatusStore>,
        stale_after: Duration,
    ) -> Self {
        Self {
            category,
            synchronizer,
            status_store,
            stale_after,
        }
    }

    pub fn category(&self) -> ItemCategory {
        self.category
    }

    /// Syncs the category unless the ledger shows a recent success.
    ///
    /// A ledger read failure counts as stale.
    pub async fn check_and_sync(&self) -> Result<JobOutcome, JobError> {
        match self.status_store.get_sync_status(self.category) {
            Ok(Some(status)) if status.is_fresh(Utc::now(), self.stale_after) => {
                info!(
                    "{} items synced at {}, skipping",
                    self.category, status.last_sync
                );
                return Ok(JobOutcome::Fresh {
                    last_sync: status.last_sync,
                });
            }
            Ok(_) => {}
            Err(e) => warn!(
                "Failed to read {} sync status, syncing anyway: {:#}",
                self.category, e
            ),
        }

        self.synchronizer
            .sync_items(self.category, self.synchronizer.batch_size())
            .await
            .map(|count| JobOutcome::Synced { count })
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))
    }
}

#[async_trait]
impl BackgroundJob for ItemSyncJob {
    fn id(&self) -> &'static str {
        match self.category {
            ItemCategory::Found => "found_items_sync",
            ItemCategory::Lost => "lost_items_sync",
        }
    }

    fn name(&self) -> &'static str {
        match self.category {
            ItemCategory::Found => "Found Items Sync",
            ItemCategory::Lost => "Lost Items Sync",
        }
    }

    fn description(&self) -> &'static str {
        match self.category {
            ItemCategory::Found => "Pull found item listings from the public data API",
            ItemCategory::Lost => "Pull lost item reports from the public data API",
        }
    }

    async fn execute(&self) -> Result<JobOutcome, JobError> {
        self.check_and_sync().await
    }
}
