mod models;
mod schema;
mod sqlite_item_store;

pub use models::*;
pub use schema::ITEMS_VERSIONED_SCHEMAS;
pub use sqlite_item_store::SqliteItemStore;

use crate::category::ItemCategory;
use anyhow::Result;

pub trait ItemStore: Send + Sync {
    /// Insert or fully overwrite rows keyed by `atc_id`. Returns the number of rows written.
    fn upsert_items(&self, category: ItemCategory, rows: &[StoredItemRow]) -> Result<usize>;
    /// Most recent first, filtered and paginated.
    fn list_items(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Vec<StoredItemRow>>;
    fn get_item(&self, category: ItemCategory, atc_id: &str) -> Result<Option<StoredItemRow>>;
    fn count_items(&self, category: ItemCategory) -> Result<usize>;
}

/// One ledger row per category, overwritten on every sync attempt.
pub trait SyncStatusStore: Send + Sync {
    fn get_sync_status(&self, category: ItemCategory) -> Result<Option<SyncStatusRow>>;
    fn set_sync_status(&self, status: &SyncStatusRow) -> Result<()>;
    fn list_sync_statuses(&self) -> Result<Vec<SyncStatusRow>>;
}

/// Combined trait for the database the sync routine writes to.
pub trait FullItemStore: ItemStore + SyncStatusStore {}

impl<T: ItemStore + SyncStatusStore> FullItemStore for T {}
