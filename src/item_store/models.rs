use crate::category::ItemCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A lost or found listing as stored locally.
///
/// Text columns are never null: absent upstream values are stored as "".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItemRow {
    pub atc_id: String,
    pub item_name: String,
    pub place: String,
    /// Raw upstream date, usually `YYYYMMDD`.
    pub date: String,
    pub content: String,
    pub image: String,
    pub storage: String,
    pub phone: String,
    pub mgmt_num: String,
    pub item_type_a: String,
    pub item_type_b: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    Success,
    Error,
}

impl SyncRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRunStatus::Success => "success",
            SyncRunStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(SyncRunStatus::Success),
            "error" => Some(SyncRunStatus::Error),
            _ => None,
        }
    }
}

fn serialize_ledger_type<S: serde::Serializer>(
    category: &ItemCategory,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(category.table_name())
}

/// Outcome of the latest sync attempt for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatusRow {
    /// Serialized as the table name, e.g. `get_list`.
    #[serde(rename = "type", serialize_with = "serialize_ledger_type")]
    pub sync_type: ItemCategory,
    pub last_sync: DateTime<Utc>,
    pub status: SyncRunStatus,
    pub items_count: usize,
    pub error_message: Option<String>,
}

impl SyncStatusRow {
    pub fn success(category: ItemCategory, items_count: usize, at: DateTime<Utc>) -> Self {
        Self {
            sync_type: category,
            last_sync: at,
            status: SyncRunStatus::Success,
            items_count,
            error_message: None,
        }
    }

    pub fn error(category: ItemCategory, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            sync_type: category,
            last_sync: at,
            status: SyncRunStatus::Error,
            items_count: 0,
            error_message: Some(message.into()),
        }
    }

    /// True when the last attempt succeeded less than `threshold` before `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        if self.status != SyncRunStatus::Success {
            return false;
        }
        match (now - self.last_sync).to_std() {
            Ok(age) => age < threshold,
            // last_sync in the future, treat as just synced
            Err(_) => true,
        }
    }
}

/// Filters for listing queries. Empty strings are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemFilter {
    /// Substring of the item name.
    pub keyword: Option<String>,
    /// Exact match on the top level item type.
    pub item_type: Option<String>,
    /// Inclusive lower bound, compared against the stored date with dashes removed.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Dates are accepted as `YYYY-MM-DD` or `YYYYMMDD`.
pub fn compact_date(date: &str) -> String {
    date.chars().filter(|c| *c != '-').collect()
}

impl ItemFilter {
    pub fn keyword(&self) -> Option<&str> {
        non_blank(&self.keyword)
    }

    pub fn item_type(&self) -> Option<&str> {
        non_blank(&self.item_type)
    }

    pub fn date_from(&self) -> Option<String> {
        non_blank(&self.date_from).map(compact_date)
    }

    pub fn date_to(&self) -> Option<String> {
        non_blank(&self.date_to).map(compact_date)
    }

    pub fn is_empty(&self) -> bool {
        self.keyword().is_none()
            && self.item_type().is_none()
            && self.date_from().is_none()
            && self.date_to().is_none()
    }

    /// In-memory equivalent of the store query, for rows that never hit the store.
    ///
    /// The keyword is a literal substring, ASCII case-insensitive.
    pub fn matches(&self, row: &StoredItemRow) -> bool {
        if let Some(keyword) = self.keyword() {
            let name = row.item_name.to_ascii_lowercase();
            if !name.contains(&keyword.to_ascii_lowercase()) {
                return false;
            }
        }
        if let Some(item_type) = self.item_type() {
            if row.item_type_a != item_type {
                return false;
            }
        }
        let date = compact_date(&row.date);
        if let Some(from) = self.date_from() {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to() {
            if date > to {
                return false;
            }
        }
        true
    }
}

/// 1-based pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Saturates instead of overflowing on absurd page numbers.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn is_first(&self) -> bool {
        self.page == 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}
