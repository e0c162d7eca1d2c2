//! In-memory [`ItemSource`] for unit tests.

use super::models::{ExternalItem, FoundItem, ItemQuery, ItemsPage, LostItem};
use super::{ItemSource, SourceError};
use crate::category::ItemCategory;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn found(atc_id: &str, name: &str) -> ExternalItem {
    ExternalItem::Found(FoundItem {
        atc_id: atc_id.to_string(),
        name: Some(name.to_string()),
        storage_place: Some("서울역 유실물센터".to_string()),
        found_date: Some("20240101".to_string()),
        category_name: Some("지갑 > 남성용 지갑".to_string()),
        ..Default::default()
    })
}

pub fn lost(atc_id: &str, name: &str) -> ExternalItem {
    ExternalItem::Lost(LostItem {
        atc_id: atc_id.to_string(),
        name: Some(name.to_string()),
        lost_place: Some("지하철 2호선".to_string()),
        lost_date: Some("20240102".to_string()),
        category_name: Some("휴대폰 > 스마트폰".to_string()),
        ..Default::default()
    })
}

#[derive(Default)]
pub struct FakeItemSource {
    items: Mutex<HashMap<ItemCategory, Vec<ExternalItem>>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    page_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl FakeItemSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(category: ItemCategory, items: Vec<ExternalItem>) -> Self {
        let source = Self::new();
        source.set_items(category, items);
        source
    }

    pub fn set_items(&self, category: ItemCategory, items: Vec<ExternalItem>) {
        self.items.lock().unwrap().insert(category, items);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), SourceError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemSource for FakeItemSource {
    async fn fetch_page(
        &self,
        category: ItemCategory,
        query: &ItemQuery,
    ) -> Result<ItemsPage, SourceError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        let all = self
            .items
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default();
        let rows = query.num_of_rows.max(1) as usize;
        let start = (query.page_no.max(1) as usize - 1) * rows;
        Ok(ItemsPage {
            items: all.iter().skip(start).take(rows).cloned().collect(),
            page_no: query.page_no.max(1),
            num_of_rows: rows as u32,
            total_count: all.len() as u64,
        })
    }

    async fn fetch_detail(
        &self,
        category: ItemCategory,
        atc_id: &str,
        _serial: Option<&str>,
    ) -> Result<Option<ExternalItem>, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&category)
            .and_then(|items| items.iter().find(|item| item.atc_id() == atc_id))
            .cloned())
    }
}
