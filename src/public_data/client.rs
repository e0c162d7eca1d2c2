//! HTTP client for the public data API.

use super::decode::{decode_detail_response, decode_list_response};
use super::models::{ExternalItem, ItemQuery, ItemsPage};
use super::{ItemSource, SourceError};
use crate::category::ItemCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://apis.data.go.kr/1320000";

/// Serial used for found item details when the caller doesn't know it.
const DEFAULT_FOUND_SERIAL: &str = "1";

fn list_path(category: ItemCategory) -> &'static str {
    match category {
        ItemCategory::Found => "LosfundInfoInqireService/getLosfundInfoAccToClAreaPd",
        ItemCategory::Lost => "LostGoodsInfoInqireService/getLostGoodsInfoAccToClAreaPd",
    }
}

fn detail_path(category: ItemCategory) -> &'static str {
    match category {
        ItemCategory::Found => "LosfundInfoInqireService/getLosfundDetailInfo",
        ItemCategory::Lost => "LostGoodsInfoInqireService/getLostGoodsDetailInfo",
    }
}

/// The portal hands out keys both raw and percent-encoded; keep the raw form
/// so the query builder encodes it exactly once.
fn normalize_service_key(key: &str) -> String {
    let key = key.trim();
    if key.contains('%') {
        urlencoding::decode(key)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| key.to_string())
    } else {
        key.to_string()
    }
}

/// HTTP client for the lost-and-found services on the public data portal.
///
/// Every request shares the client timeout, list and detail calls alike.
pub struct PublicDataClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl PublicDataClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the portal (e.g., "http://apis.data.go.kr/1320000")
    /// * `service_key` - Portal service key, raw or percent-encoded
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: &str, service_key: &str, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: normalize_service_key(service_key),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_xml(&self, path: &str, params: &[(&str, String)]) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(&[("serviceKey", self.service_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ItemSource for PublicDataClient {
    async fn fetch_page(
        &self,
        category: ItemCategory,
        query: &ItemQuery,
    ) -> Result<ItemsPage, SourceError> {
        let body = self
            .get_xml(list_path(category), &query.to_params(category))
            .await?;
        decode_list_response(category, &body)
    }

    async fn fetch_detail(
        &self,
        category: ItemCategory,
        atc_id: &str,
        serial: Option<&str>,
    ) -> Result<Option<ExternalItem>, SourceError> {
        let mut params = vec![("ATC_ID", atc_id.to_string()), ("_type", "xml".to_string())];
        if category == ItemCategory::Found {
            params.push(("FD_SN", serial.unwrap_or(DEFAULT_FOUND_SERIAL).to_string()));
        }

        let body = self.get_xml(detail_path(category), &params).await?;
        decode_detail_response(category, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PublicDataClient::new(DEFAULT_BASE_URL, "key", 10).unwrap();
        assert_eq!(client.base_url(), "http://apis.data.go.kr/1320000");
    }

    #[test]
    fn test_trailing_slash_removal() {
        let client = PublicDataClient::new("http://localhost:8080/", "key", 10).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_encoded_service_key_is_decoded() {
        assert_eq!(normalize_service_key("abc%2Bdef%3D%3D"), "abc+def==");
        assert_eq!(normalize_service_key(" abc+def== "), "abc+def==");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        // Port 9 (discard) is closed on test machines.
        let client = PublicDataClient::new("http://127.0.0.1:9", "key", 2).unwrap();
        let err = client
            .fetch_page(ItemCategory::Found, &ItemQuery::page(1, 10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::Unavailable(_) | SourceError::Timeout
        ));
    }
}
