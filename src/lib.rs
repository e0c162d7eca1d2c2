//! Chajajwo Server Library
//!
//! Keeps a local copy of the police lost-and-found listings in sync and serves
//! them over HTTP. The modules are exposed for testing and potential reuse.

pub mod background_jobs;
pub mod category;
pub mod config;
pub mod item_store;
pub mod listing;
pub mod public_data;
pub mod server;
pub mod sqlite_persistence;
pub mod sync;
pub mod xml;

// Re-export commonly used types for convenience
pub use category::ItemCategory;
pub use item_store::{FullItemStore, ItemStore, SqliteItemStore, SyncStatusStore};
pub use public_data::{ItemSource, PublicDataClient};
pub use server::{run_server, RequestsLoggingLevel};
