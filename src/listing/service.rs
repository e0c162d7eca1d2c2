use super::sample::sample_items;
use crate::category::ItemCategory;
use crate::item_store::{ItemFilter, ItemStore, PageRequest, StoredItemRow};
use crate::public_data::{ItemQuery, ItemSource, SourceError};
use crate::server::metrics;
use crate::sync::{to_stored_row, ItemSynchronizer, SyncError};
use chrono::{Local, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Which stage of the read path produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    Store,
    StoreAfterSync,
    ExternalApi,
    Sample,
}

impl ListingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingSource::Store => "store",
            ListingSource::StoreAfterSync => "store_after_sync",
            ListingSource::ExternalApi => "external_api",
            ListingSource::Sample => "sample",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub items: Vec<StoredItemRow>,
    pub source: ListingSource,
    pub page: usize,
    pub page_size: usize,
}

/// Why a read path stage produced nothing.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("no items")]
    Empty,

    #[error("store query failed: {0}")]
    Store(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

type StageResult = Result<Vec<StoredItemRow>, ListingError>;

/// Serves listings through the fallback chain
/// store, sync then store, upstream API, built-in samples.
pub struct ListingService {
    store: Arc<dyn ItemStore>,
    synchronizer: Arc<ItemSynchronizer>,
    source: Arc<dyn ItemSource>,
}

impl ListingService {
    pub fn new(
        store: Arc<dyn ItemStore>,
        synchronizer: Arc<ItemSynchronizer>,
        source: Arc<dyn ItemSource>,
    ) -> Self {
        Self {
            store,
            synchronizer,
            source,
        }
    }

    /// Never fails: every stage error is logged and handed to the next stage.
    pub async fn list_items(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Listing {
        let (items, source) = self.resolve(category, filter, page).await;
        metrics::record_listing_source(category.as_str(), source.as_str());
        debug!(
            "Serving {} {} items from {}",
            items.len(),
            category,
            source.as_str()
        );
        Listing {
            items,
            source,
            page: page.page,
            page_size: page.page_size,
        }
    }

    async fn resolve(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> (Vec<StoredItemRow>, ListingSource) {
        let err = match self.query_store(category, filter, page) {
            Ok(items) => return (items, ListingSource::Store),
            Err(err) => err,
        };

        if !self.should_fall_back(category, filter, page, &err) {
            return (Vec::new(), ListingSource::Store);
        }

        let err = match self.sync_then_query(category, filter, page, err).await {
            Ok(items) => return (items, ListingSource::StoreAfterSync),
            Err(err) => err,
        };

        let err = match self.fetch_direct(category, filter, page, err).await {
            Ok(items) => return (items, ListingSource::ExternalApi),
            Err(err) => err,
        };

        (
            Self::sample(category, filter, page, err),
            ListingSource::Sample,
        )
    }

    /// Later pages and filtered queries over a populated table are answered
    /// by the store alone; an empty result there is the real answer.
    fn should_fall_back(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
        err: &ListingError,
    ) -> bool {
        if !matches!(err, ListingError::Empty) {
            return page.is_first();
        }
        if !page.is_first() {
            return false;
        }
        if filter.is_empty() {
            return true;
        }
        match self.store.count_items(category) {
            Ok(count) => count == 0,
            Err(_) => true,
        }
    }

    /// Stage 1: the local store.
    fn query_store(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> StageResult {
        let items = self
            .store
            .list_items(category, filter, page)
            .map_err(|e| ListingError::Store(format!("{:#}", e)))?;
        if items.is_empty() {
            return Err(ListingError::Empty);
        }
        Ok(items)
    }

    /// Stage 2: refresh the category, then query the store once more.
    async fn sync_then_query(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
        previous: ListingError,
    ) -> StageResult {
        warn!("{} store query: {}, syncing before retry", category, previous);
        self.synchronizer
            .sync_items(category, self.synchronizer.batch_size())
            .await?;
        self.query_store(category, filter, page)
    }

    /// Stage 3: the upstream API directly. Rows are not persisted.
    async fn fetch_direct(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
        previous: ListingError,
    ) -> StageResult {
        warn!(
            "{} sync path failed: {}, querying the public API directly",
            category, previous
        );
        let query = ItemQuery {
            start_date: filter.date_from(),
            end_date: filter.date_to(),
            ..ItemQuery::page(
                u32::try_from(page.page).unwrap_or(u32::MAX),
                page.page_size as u32,
            )
        };
        let response = self.source.fetch_page(category, &query).await?;

        let today = Local::now().date_naive();
        let now = Utc::now();
        let items: Vec<StoredItemRow> = response
            .items
            .iter()
            .map(|item| to_stored_row(item, today, now))
            .filter(|row| filter.matches(row))
            .collect();
        if items.is_empty() {
            return Err(ListingError::Empty);
        }
        Ok(items)
    }

    /// Stage 4: built-in samples, filtered and paginated like the store.
    fn sample(
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
        previous: ListingError,
    ) -> Vec<StoredItemRow> {
        warn!(
            "{} public API path failed: {}, serving sample data",
            category, previous
        );
        sample_items(category)
            .into_iter()
            .filter(|row| filter.matches(row))
            .skip(page.offset())
            .take(page.page_size)
            .collect()
    }

    /// Store lookup first, then the upstream detail API. Upstream rows are not persisted.
    pub async fn get_item(
        &self,
        category: ItemCategory,
        atc_id: &str,
        serial: Option<&str>,
    ) -> Result<Option<StoredItemRow>, ListingError> {
        match self.store.get_item(category, atc_id) {
            Ok(Some(item)) => return Ok(Some(item)),
            Ok(None) => debug!("{} item {} not in store", category, atc_id),
            Err(e) => warn!("{} item {} store lookup failed: {:#}", category, atc_id, e),
        }

        info!("Fetching {} item {} from the public API", category, atc_id);
        let item = self.source.fetch_detail(category, atc_id, serial).await?;
        Ok(item.map(|item| to_stored_row(&item, Local::now().date_naive(), Utc::now())))
    }
}
