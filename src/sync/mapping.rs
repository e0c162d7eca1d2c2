//! Conversion of upstream records into stored rows.

use crate::item_store::StoredItemRow;
use crate::public_data::{ExternalItem, FoundItem, LostItem};
use chrono::{DateTime, NaiveDate, Utc};

/// File name of the placeholder image the portal returns for items without a photo.
const NO_IMAGE_MARKER: &str = "img02_no_img.gif";

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date_or_today(value: &Option<String>, today: NaiveDate) -> String {
    value
        .clone()
        .unwrap_or_else(|| today.format("%Y-%m-%d").to_string())
}

fn image_url(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(url) if !url.contains(NO_IMAGE_MARKER) => url.to_string(),
        _ => String::new(),
    }
}

/// Splits `"지갑 > 남성용 지갑"` into its two levels.
pub fn split_item_type(category_name: &Option<String>) -> (String, String) {
    let Some(name) = category_name.as_deref() else {
        return (String::new(), String::new());
    };
    let mut parts = name.splitn(2, '>');
    let first = parts.next().unwrap_or_default().trim().to_string();
    let second = parts.next().unwrap_or_default().trim().to_string();
    (first, second)
}

fn found_row(item: &FoundItem, today: NaiveDate, now: DateTime<Utc>) -> StoredItemRow {
    let (item_type_a, item_type_b) = split_item_type(&item.category_name);
    StoredItemRow {
        atc_id: item.atc_id.clone(),
        item_name: or_empty(&item.name),
        // Listings only carry the storage place, details add where it was picked up.
        place: or_empty(&item.found_place.clone().or_else(|| item.storage_place.clone())),
        date: date_or_today(&item.found_date, today),
        content: or_empty(&item.description.clone().or_else(|| item.subject.clone())),
        image: image_url(&item.image_url),
        storage: or_empty(&item.storage_place),
        phone: or_empty(&item.phone),
        mgmt_num: or_empty(&item.serial),
        item_type_a,
        item_type_b,
        updated_at: now,
    }
}

fn lost_row(item: &LostItem, today: NaiveDate, now: DateTime<Utc>) -> StoredItemRow {
    let (item_type_a, item_type_b) = split_item_type(&item.category_name);
    StoredItemRow {
        atc_id: item.atc_id.clone(),
        item_name: or_empty(&item.name),
        place: or_empty(&item.lost_place),
        date: date_or_today(&item.lost_date, today),
        content: or_empty(&item.description.clone().or_else(|| item.subject.clone())),
        image: String::new(),
        storage: or_empty(&item.organization),
        phone: or_empty(&item.phone),
        mgmt_num: or_empty(&item.serial),
        item_type_a,
        item_type_b,
        updated_at: now,
    }
}

/// Maps an upstream record to a row. Missing text becomes "", a missing date
/// becomes `today` as `YYYY-MM-DD`.
pub fn to_stored_row(item: &ExternalItem, today: NaiveDate, now: DateTime<Utc>) -> StoredItemRow {
    match item {
        ExternalItem::Found(found) => found_row(found, today, now),
        ExternalItem::Lost(lost) => lost_row(lost, today, now),
    }
}
