mod item_sync;

pub use item_sync::{ItemSyncJob, DEFAULT_STALE_AFTER};
