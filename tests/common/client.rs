//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// `query` pairs are appended as the query string.
    pub async fn get_items(&self, category: &str, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/v1/items/{}", self.base_url, category))
            .query(query)
            .send()
            .await
            .expect("List items request failed")
    }

    pub async fn get_item(&self, category: &str, atc_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/items/{}/{}", self.base_url, category, atc_id))
            .send()
            .await
            .expect("Get item request failed")
    }

    pub async fn get_sync_status(&self) -> Response {
        self.client
            .get(format!("{}/v1/sync/status", self.base_url))
            .send()
            .await
            .expect("Sync status request failed")
    }

    pub async fn post_sync(&self) -> Response {
        self.client
            .post(format!("{}/v1/sync", self.base_url))
            .send()
            .await
            .expect("Manual sync request failed")
    }

    pub async fn put_sync_interval(&self, interval_secs: u64) -> Response {
        self.client
            .put(format!("{}/v1/sync/interval", self.base_url))
            .json(&json!({ "interval_secs": interval_secs }))
            .send()
            .await
            .expect("Sync interval request failed")
    }
}
