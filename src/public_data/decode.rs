//! Typed decoding of public data XML responses.

use super::models::{ExternalItem, FoundItem, ItemsPage, LostItem};
use super::SourceError;
use crate::category::ItemCategory;
use crate::xml::{document_to_json, parse_xml, raise_value};
use serde_json::{Map, Value};

const SUCCESS_CODE: &str = "00";

/// Reads a scalar field as a trimmed, non-empty string.
fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number<T: std::str::FromStr>(object: &Map<String, Value>, key: &str) -> Option<T> {
    text(object, key).and_then(|s| s.parse().ok())
}

fn found_item(object: &Map<String, Value>) -> Option<FoundItem> {
    Some(FoundItem {
        atc_id: text(object, "atcId")?,
        name: text(object, "fdPrdtNm"),
        storage_place: text(object, "depPlace"),
        found_date: text(object, "fdYmd"),
        subject: text(object, "fdSbjt"),
        serial: text(object, "fdSn"),
        category_name: text(object, "prdtClNm"),
        image_url: text(object, "fdFilePathImg"),
        phone: text(object, "tel"),
        description: text(object, "uniq"),
        found_place: text(object, "fdPlace"),
    })
}

fn lost_item(object: &Map<String, Value>) -> Option<LostItem> {
    Some(LostItem {
        atc_id: text(object, "atcId")?,
        name: text(object, "lstPrdtNm"),
        lost_place: text(object, "lstPlace"),
        lost_date: text(object, "lstYmd"),
        subject: text(object, "lstSbjt"),
        serial: text(object, "lstSn"),
        category_name: text(object, "prdtClNm"),
        phone: text(object, "tel"),
        description: text(object, "uniq"),
        organization: text(object, "orgNm"),
    })
}

/// Converts one raised item object. Items without an `atcId` are dropped.
fn external_item(category: ItemCategory, value: &Value) -> Option<ExternalItem> {
    let object = value.as_object()?;
    match category {
        ItemCategory::Found => found_item(object).map(ExternalItem::Found),
        ItemCategory::Lost => lost_item(object).map(ExternalItem::Lost),
    }
}

/// Parses the body and returns the raised `response` object, after checking
/// for gateway and API level errors.
fn response_object(body: &str) -> Result<Map<String, Value>, SourceError> {
    let root = parse_xml(body)?;
    let mut document = match raise_value(document_to_json(&root)) {
        Value::Object(object) => object,
        _ => return Err(SourceError::Malformed("document is not an object".to_string())),
    };

    // The gateway answers key and quota problems with its own envelope.
    if let Some(Value::Object(gateway)) = document.remove("OpenAPI_ServiceResponse") {
        let header = gateway
            .get("cmmMsgHeader")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        return Err(SourceError::Api {
            code: text(&header, "returnReasonCode").unwrap_or_else(|| "unknown".to_string()),
            message: text(&header, "returnAuthMsg")
                .or_else(|| text(&header, "errMsg"))
                .unwrap_or_else(|| "gateway error".to_string()),
        });
    }

    let response = match document.remove("response") {
        Some(Value::Object(response)) => response,
        _ => return Err(SourceError::Malformed("missing response element".to_string())),
    };

    if let Some(header) = response.get("header").and_then(Value::as_object) {
        if let Some(code) = text(header, "resultCode") {
            if code != SUCCESS_CODE {
                return Err(SourceError::Api {
                    code,
                    message: text(header, "resultMsg").unwrap_or_default(),
                });
            }
        }
    }

    Ok(response)
}

/// Decodes a listing response.
///
/// `response.body.items.item` may be a single object, an array, or absent
/// when the page is empty.
pub fn decode_list_response(category: ItemCategory, body: &str) -> Result<ItemsPage, SourceError> {
    let response = response_object(body)?;
    let body = response
        .get("body")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::Malformed("missing response body".to_string()))?;

    let raw_items = match body.get("items") {
        None => vec![],
        Some(Value::Object(items)) => match items.get("item") {
            None => vec![],
            Some(Value::Array(values)) => values.iter().collect(),
            Some(value @ Value::Object(_)) => vec![value],
            Some(_) => return Err(SourceError::Malformed("unexpected item shape".to_string())),
        },
        Some(_) => return Err(SourceError::Malformed("unexpected items shape".to_string())),
    };

    let items = raw_items
        .into_iter()
        .filter_map(|value| external_item(category, value))
        .collect();

    Ok(ItemsPage {
        items,
        page_no: number(body, "pageNo").unwrap_or(1),
        num_of_rows: number(body, "numOfRows").unwrap_or(0),
        total_count: number(body, "totalCount").unwrap_or(0),
    })
}

/// Decodes a detail response, `Ok(None)` when the item does not exist.
pub fn decode_detail_response(
    category: ItemCategory,
    body: &str,
) -> Result<Option<ExternalItem>, SourceError> {
    let response = response_object(body)?;
    let body = match response.get("body").and_then(Value::as_object) {
        Some(body) => body,
        None => return Ok(None),
    };
    Ok(body
        .get("item")
        .and_then(|value| external_item(category, value)))
}
