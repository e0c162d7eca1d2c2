use super::models::{ItemFilter, PageRequest, StoredItemRow, SyncRunStatus, SyncStatusRow};
use super::schema::ITEMS_VERSIONED_SCHEMAS;
use super::{ItemStore, SyncStatusStore};
use crate::category::ItemCategory;
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const ITEM_COLUMNS: &str = "atc_id, item_name, place, date, content, image, storage, phone, \
     mgmt_num, item_type_a, item_type_b, updated_at";

pub struct SqliteItemStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteItemStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open item database")?;
        if is_new_db {
            info!("Creating new item database at {:?}", path);
        }
        open_versioned(&mut conn, ITEMS_VERSIONED_SCHEMAS, is_new_db)
            .with_context(|| format!("Failed to open item database at {:?}", path))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests and as a throwaway store.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        open_versioned(&mut conn, ITEMS_VERSIONED_SCHEMAS, true)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Item database mutex poisoned"))
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    /// Unparsable timestamps read as the epoch, so a damaged ledger row is stale.
    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<StoredItemRow> {
        let updated_at: String = row.get("updated_at")?;
        Ok(StoredItemRow {
            atc_id: row.get("atc_id")?,
            item_name: row.get("item_name")?,
            place: row.get("place")?,
            date: row.get("date")?,
            content: row.get("content")?,
            image: row.get("image")?,
            storage: row.get("storage")?,
            phone: row.get("phone")?,
            mgmt_num: row.get("mgmt_num")?,
            item_type_a: row.get("item_type_a")?,
            item_type_b: row.get("item_type_b")?,
            updated_at: Self::parse_datetime(&updated_at),
        })
    }

    fn row_to_sync_status(row: &rusqlite::Row) -> rusqlite::Result<Option<SyncStatusRow>> {
        let sync_type: String = row.get("type")?;
        let Some(category) = ItemCategory::parse(&sync_type) else {
            return Ok(None);
        };
        let status: String = row.get("status")?;
        let last_sync: String = row.get("last_sync")?;
        let items_count: i64 = row.get("items_count")?;

        Ok(Some(SyncStatusRow {
            sync_type: category,
            last_sync: Self::parse_datetime(&last_sync),
            status: SyncRunStatus::parse(&status).unwrap_or(SyncRunStatus::Error),
            items_count: items_count.max(0) as usize,
            error_message: row.get("error_message")?,
        }))
    }
}

/// Builds the WHERE clause and bound values for a listing filter.
fn filter_clause(filter: &ItemFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    // instr over lower() keeps `%` and `_` literal and folds ASCII case only,
    // the same rule as ItemFilter::matches.
    if let Some(keyword) = filter.keyword() {
        conditions.push("instr(lower(item_name), ?) > 0");
        values.push(Value::Text(keyword.to_ascii_lowercase()));
    }
    if let Some(item_type) = filter.item_type() {
        conditions.push("item_type_a = ?");
        values.push(Value::Text(item_type.to_string()));
    }
    if let Some(date_from) = filter.date_from() {
        conditions.push("REPLACE(date, '-', '') >= ?");
        values.push(Value::Text(date_from));
    }
    if let Some(date_to) = filter.date_to() {
        conditions.push("REPLACE(date, '-', '') <= ?");
        values.push(Value::Text(date_to));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

impl ItemStore for SqliteItemStore {
    fn upsert_items(&self, category: ItemCategory, rows: &[StoredItemRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        // Last occurrence of an atc_id wins within a batch.
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, row) in rows.iter().enumerate() {
            positions.insert(row.atc_id.as_str(), index);
        }
        let unique: Vec<&StoredItemRow> = rows
            .iter()
            .enumerate()
            .filter(|(index, row)| positions.get(row.atc_id.as_str()) == Some(index))
            .map(|(_, row)| row)
            .collect();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table} ({columns})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(atc_id) DO UPDATE SET
                    item_name = excluded.item_name,
                    place = excluded.place,
                    date = excluded.date,
                    content = excluded.content,
                    image = excluded.image,
                    storage = excluded.storage,
                    phone = excluded.phone,
                    mgmt_num = excluded.mgmt_num,
                    item_type_a = excluded.item_type_a,
                    item_type_b = excluded.item_type_b,
                    updated_at = excluded.updated_at",
                table = category.table_name(),
                columns = ITEM_COLUMNS,
            ))?;
            for row in &unique {
                stmt.execute(params![
                    row.atc_id,
                    row.item_name,
                    row.place,
                    row.date,
                    row.content,
                    row.image,
                    row.storage,
                    row.phone,
                    row.mgmt_num,
                    row.item_type_a,
                    row.item_type_b,
                    Self::format_datetime(&row.updated_at),
                ])?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to commit upsert into {}", category.table_name()))?;

        debug!(
            "Upserted {} rows into {}",
            unique.len(),
            category.table_name()
        );
        Ok(unique.len())
    }

    fn list_items(
        &self,
        category: ItemCategory,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Vec<StoredItemRow>> {
        let (where_clause, mut values) = filter_clause(filter);
        values.push(Value::Integer(page.page_size as i64));
        values.push(Value::Integer(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY date DESC, atc_id ASC LIMIT ? OFFSET ?",
            ITEM_COLUMNS,
            category.table_name(),
            where_clause
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn get_item(&self, category: ItemCategory, atc_id: &str) -> Result<Option<StoredItemRow>> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE atc_id = ?1",
                    ITEM_COLUMNS,
                    category.table_name()
                ),
                params![atc_id],
                Self::row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    fn count_items(&self, category: ItemCategory) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", category.table_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl SyncStatusStore for SqliteItemStore {
    fn get_sync_status(&self, category: ItemCategory) -> Result<Option<SyncStatusRow>> {
        let conn = self.lock()?;
        let status = conn
            .query_row(
                "SELECT type, last_sync, status, items_count, error_message
                 FROM sync_status WHERE type = ?1",
                params![category.table_name()],
                Self::row_to_sync_status,
            )
            .optional()?;
        Ok(status.flatten())
    }

    fn set_sync_status(&self, status: &SyncStatusRow) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sync_status (type, last_sync, status, items_count, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(type) DO UPDATE SET
                last_sync = excluded.last_sync,
                status = excluded.status,
                items_count = excluded.items_count,
                error_message = excluded.error_message",
            params![
                status.sync_type.table_name(),
                Self::format_datetime(&status.last_sync),
                status.status.as_str(),
                status.items_count as i64,
                status.error_message,
            ],
        )
        .context("Failed to write sync status")?;
        Ok(())
    }

    fn list_sync_statuses(&self) -> Result<Vec<SyncStatusRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT type, last_sync, status, items_count, error_message
             FROM sync_status ORDER BY type",
        )?;
        let rows = stmt
            .query_map([], Self::row_to_sync_status)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().flatten().collect())
    }
}
