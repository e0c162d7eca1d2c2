//! Common test infrastructure
//!
//! Each test spawns a fake public data API and a real server wired to it,
//! both on ephemeral ports. Tests should only import from this module.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{found_item, FakePublicDataApi, TestClient, TestServer};
//!
//! #[tokio::test]
//! async fn test_sync() {
//!     let api = FakePublicDataApi::spawn().await;
//!     api.set_found_items(vec![found_item("F1", "Wallet")]);
//!     let server = TestServer::spawn(&api).await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.post_sync().await;
//!     assert!(response.status().is_success());
//! }
//! ```

mod client;
mod constants;
mod fake_api;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fake_api::{found_item, lost_item, FakeItem, FakePublicDataApi};
pub use server::TestServer;
