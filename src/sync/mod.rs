//! Pulls listings from the public API into the item store.

mod mapping;
mod synchronizer;

pub use mapping::{split_item_type, to_stored_row};
pub use synchronizer::{ItemSynchronizer, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};

use crate::category::ItemCategory;
use crate::public_data::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{category} sync failed: {source}")]
    Source {
        category: ItemCategory,
        #[source]
        source: SourceError,
    },

    #[error("{0} sync returned no items")]
    Empty(ItemCategory),

    #[error("{0} sync could not write to the store: {1}")]
    Store(ItemCategory, String),
}

impl SyncError {
    pub fn category(&self) -> ItemCategory {
        match self {
            SyncError::Source { category, .. } => *category,
            SyncError::Empty(category) => *category,
            SyncError::Store(category, _) => *category,
        }
    }
}
