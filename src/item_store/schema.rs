//! SQLite schema for the item database.
//!
//! Version 1 holds the found and lost listing tables and the sync status
//! ledger. Later versions append a `VersionedSchema` with a migration.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

macro_rules! item_columns {
    () => {
        &[
            sqlite_column!("atc_id", &SqlType::Text, is_primary_key = true),
            sqlite_column!("item_name", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("place", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("date", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("content", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("image", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("storage", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("phone", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("mgmt_num", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("item_type_a", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!("item_type_b", &SqlType::Text, non_null = true, default_value = Some("''")),
            sqlite_column!(
                "updated_at",
                &SqlType::Text,
                non_null = true,
                default_value = Some(DEFAULT_TIMESTAMP)
            ),
        ]
    };
}

// =============================================================================
// Version 1 - Listing tables and sync status ledger
// =============================================================================

/// Found items, one row per `atc_id`.
const FOUND_ITEMS_TABLE_V1: Table = Table {
    name: "get_list",
    columns: item_columns!(),
    indices: &[
        ("idx_get_list_date", "date DESC"),
        ("idx_get_list_item_type_a", "item_type_a"),
    ],
};

/// Lost item reports, one row per `atc_id`.
const LOST_ITEMS_TABLE_V1: Table = Table {
    name: "lost_list",
    columns: item_columns!(),
    indices: &[
        ("idx_lost_list_date", "date DESC"),
        ("idx_lost_list_item_type_a", "item_type_a"),
    ],
};

const SYNC_STATUS_TABLE_V1: Table = Table {
    name: "sync_status",
    columns: &[
        sqlite_column!("type", &SqlType::Text, is_primary_key = true),
        sqlite_column!("last_sync", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("items_count", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("error_message", &SqlType::Text),
    ],
    indices: &[],
};

pub const ITEMS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[FOUND_ITEMS_TABLE_V1, LOST_ITEMS_TABLE_V1, SYNC_STATUS_TABLE_V1],
    migration: None,
}];
