//! Client for the police lost-and-found public data API.

mod client;
mod decode;
#[cfg(test)]
pub(crate) mod fake_source;
mod models;

pub use client::{PublicDataClient, DEFAULT_BASE_URL};
pub use decode::{decode_detail_response, decode_list_response};
pub use models::{ExternalItem, FoundItem, ItemQuery, ItemsPage, LostItem};

use crate::category::ItemCategory;
use crate::xml::XmlError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by an [`ItemSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("public data API unavailable: {0}")]
    Unavailable(String),

    #[error("public data API request timed out")]
    Timeout,

    #[error("public data API returned HTTP status {0}")]
    Status(u16),

    #[error("public data API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("malformed public data response: {0}")]
    Malformed(String),
}

impl From<XmlError> for SourceError {
    fn from(e: XmlError) -> Self {
        SourceError::Malformed(e.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

/// Source of lost and found listings.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch one page of listings for a category.
    async fn fetch_page(
        &self,
        category: ItemCategory,
        query: &ItemQuery,
    ) -> Result<ItemsPage, SourceError>;

    /// Fetch a single item. `serial` is the found item serial (`fdSn`),
    /// ignored for lost items.
    async fn fetch_detail(
        &self,
        category: ItemCategory,
        atc_id: &str,
        serial: Option<&str>,
    ) -> Result<Option<ExternalItem>, SourceError>;
}
