use super::mapping::to_stored_row;
use super::SyncError;
use crate::category::ItemCategory;
use crate::item_store::{FullItemStore, StoredItemRow, SyncStatusRow};
use crate::public_data::{ItemQuery, ItemSource};
use crate::server::metrics;
use chrono::{Local, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const MAX_BATCH_SIZE: usize = 1000;

/// One fetch, map, upsert and record cycle per call.
///
/// Every attempt overwrites the category's ledger row, whatever the outcome.
/// Nothing is retried here; the scheduler's next pass is the retry.
pub struct ItemSynchronizer {
    source: Arc<dyn ItemSource>,
    store: Arc<dyn FullItemStore>,
    batch_size: usize,
}

impl ItemSynchronizer {
    pub fn new(
        source: Arc<dyn ItemSource>,
        store: Arc<dyn FullItemStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            store,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn sync_found_items(&self) -> Result<usize, SyncError> {
        self.sync_items(ItemCategory::Found, self.batch_size).await
    }

    pub async fn sync_lost_items(&self) -> Result<usize, SyncError> {
        self.sync_items(ItemCategory::Lost, self.batch_size).await
    }

    /// Fetches the first page of up to `batch_size` records and upserts them.
    /// Returns the number of rows written.
    pub async fn sync_items(
        &self,
        category: ItemCategory,
        batch_size: usize,
    ) -> Result<usize, SyncError> {
        let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        let started = Instant::now();
        info!("Syncing {} items (batch size {})", category, batch_size);

        let result = match self.fetch_and_upsert(category, batch_size).await {
            Ok(count) => self
                .store
                .set_sync_status(&SyncStatusRow::success(category, count, Utc::now()))
                .map(|_| count)
                .map_err(|e| SyncError::Store(category, format!("{:#}", e))),
            Err(e) => Err(e),
        };

        match &result {
            Ok(count) => {
                info!(
                    "Synced {} {} items in {}ms",
                    count,
                    category,
                    started.elapsed().as_millis()
                );
                metrics::record_sync_run(category.as_str(), true, *count, started.elapsed());
            }
            Err(e) => {
                error!("{}", e);
                if let Err(ledger_err) = self.store.set_sync_status(&SyncStatusRow::error(
                    category,
                    e.to_string(),
                    Utc::now(),
                )) {
                    warn!(
                        "Failed to record {} sync error in ledger: {:#}",
                        category, ledger_err
                    );
                }
                metrics::record_sync_run(category.as_str(), false, 0, started.elapsed());
            }
        }

        result
    }

    async fn fetch_and_upsert(
        &self,
        category: ItemCategory,
        batch_size: usize,
    ) -> Result<usize, SyncError> {
        let query = ItemQuery::page(1, batch_size as u32);
        let page = self
            .source
            .fetch_page(category, &query)
            .await
            .map_err(|source| SyncError::Source { category, source })?;

        if page.items.is_empty() {
            return Err(SyncError::Empty(category));
        }

        let today = Local::now().date_naive();
        let now = Utc::now();
        let rows: Vec<StoredItemRow> = page
            .items
            .iter()
            .map(|item| to_stored_row(item, today, now))
            .collect();

        self.store
            .upsert_items(category, &rows)
            .map_err(|e| SyncError::Store(category, format!("{:#}", e)))
    }
}
