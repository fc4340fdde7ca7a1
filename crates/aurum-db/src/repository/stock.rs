//! # Stock Repository
//!
//! The serialized stock ledger: one row per physical piece of jewelry.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stock Item Lifecycle                               │
//! │                                                                         │
//! │  receive() ──► available ──── mark_sold (sale) ────► sold               │
//! │                   ▲  │                                │                 │
//! │                   │  └── transfer (placement only)    │                 │
//! │                   │                                   │                 │
//! │                   └──── mark_available (cancel) ◄─────┘                 │
//! │                                                                         │
//! │  Every transition is a compare-and-swap:                                │
//! │                                                                         │
//! │    UPDATE stocks SET status = 'sold', ...                               │
//! │    WHERE id = ? AND status = 'available' AND deleted_at IS NULL         │
//! │                                                                         │
//! │    rows_affected == 0  →  someone else got there first  →  Conflict     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are not stored on stock. [`StockItemDetail`] joins the product
//! weight and the category's current per-gram prices at read time.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::{fetch_location, fetch_product, fetch_storage_box};
use crate::error::{DbError, DbResult};
use aurum_core::codes;
use aurum_core::{
    CoreError, ReceiveStockRequest, StockFilter, StockItem, StockItemDetail, StockStatus,
};

/// Attempts at a fresh serial base when a batch collides with existing
/// serials (two receipts in the same millisecond).
const SERIAL_ATTEMPTS: i64 = 3;

const STOCK_SELECT: &str = "SELECT id, product_id, location_id, storage_box_id, serial_number, \
     status, supplier_name, notes, received_at, sold_at, transaction_id, barcode_printed, \
     barcode_printed_at, created_at, updated_at \
     FROM stocks WHERE deleted_at IS NULL";

const DETAIL_SELECT: &str = r#"
    SELECT
        s.id, s.product_id, s.location_id, s.storage_box_id, s.serial_number, s.status,
        s.supplier_name, s.notes, s.received_at, s.sold_at, s.transaction_id,
        s.barcode_printed, s.barcode_printed_at, s.created_at, s.updated_at,
        p.name AS product_name,
        p.barcode AS product_barcode,
        p.weight AS product_weight,
        g.id AS gold_category_id,
        g.name AS gold_category_name,
        g.purity AS gold_purity,
        g.buy_price_per_gram,
        g.sell_price_per_gram,
        l.name AS location_name,
        b.name AS storage_box_name
    FROM stocks s
    INNER JOIN products p ON p.id = s.product_id
    INNER JOIN gold_categories g ON g.id = p.gold_category_id
    INNER JOIN locations l ON l.id = s.location_id
    INNER JOIN storage_boxes b ON b.id = s.storage_box_id
    WHERE s.deleted_at IS NULL
"#;

// =============================================================================
// Shared lookups and transitions
// =============================================================================

pub(crate) async fn fetch_stock<'e, E>(executor: E, id: &str) -> DbResult<Option<StockItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{STOCK_SELECT} AND id = ?1");
    let stock = sqlx::query_as::<_, StockItem>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(stock)
}

pub(crate) async fn fetch_detail<'e, E>(executor: E, id: &str) -> DbResult<Option<StockItemDetail>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{DETAIL_SELECT} AND s.id = ?1");
    let detail = sqlx::query_as::<_, StockItemDetail>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(detail)
}

/// `available → sold`, linking the selling transaction.
///
/// The item must still be available *at the location it was validated
/// at*; a concurrent sale or transfer makes this fail with
/// `StockModified`.
pub(crate) async fn mark_sold(
    conn: &mut SqliteConnection,
    stock: &StockItem,
    transaction_id: &str,
    sold_at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stocks
        SET status = 'sold', sold_at = ?1, transaction_id = ?2, updated_at = ?1
        WHERE id = ?3
          AND status = 'available'
          AND location_id = ?4
          AND deleted_at IS NULL
        "#,
    )
    .bind(sold_at)
    .bind(transaction_id)
    .bind(&stock.id)
    .bind(&stock.location_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(stock_id = %stock.id, serial = %stock.serial_number, "Stock changed before sale");
        return Err(CoreError::StockModified {
            serial_number: stock.serial_number.clone(),
        }
        .into());
    }

    debug!(stock_id = %stock.id, transaction_id = %transaction_id, "Stock marked sold");
    Ok(())
}

/// `sold → available`, clearing the sale link. Only the transaction that
/// sold the item can release it.
pub(crate) async fn mark_available(
    conn: &mut SqliteConnection,
    stock: &StockItem,
    transaction_id: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stocks
        SET status = 'available', sold_at = NULL, transaction_id = NULL, updated_at = ?1
        WHERE id = ?2
          AND status = 'sold'
          AND transaction_id = ?3
          AND deleted_at IS NULL
        "#,
    )
    .bind(at)
    .bind(&stock.id)
    .bind(transaction_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(stock_id = %stock.id, serial = %stock.serial_number, "Stock changed before release");
        return Err(CoreError::StockModified {
            serial_number: stock.serial_number.clone(),
        }
        .into());
    }

    debug!(stock_id = %stock.id, transaction_id = %transaction_id, "Stock released");
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the stock ledger.
///
/// ## Usage
/// ```rust,ignore
/// let stocks = db.stocks();
/// let received = stocks.receive(&request).await?;
/// let detail = stocks.get_detail(&received[0].id).await?;
/// println!("{} sells for {}", detail.stock.serial_number, detail.sell_price());
/// ```
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Receives `quantity` new pieces of a product into a storage box.
    ///
    /// ## Serial Numbers
    /// ```text
    /// batch received at millis 1760774400000, quantity 3
    ///
    ///   base36(millis) → 7 chars    seq → 3 chars
    ///   ┌───────┐                   ┌───┐
    ///   MGVB3K0 ───────────────────  001
    ///   MGVB3K0 ───────────────────  002
    ///   MGVB3K0 ───────────────────  003
    /// ```
    /// A collision with an existing serial retries the whole batch on a
    /// shifted base.
    ///
    /// ## Errors
    /// * `NotFound` - product, location or box is missing
    /// * `Validation` - box is not in the location, or quantity out of range
    pub async fn receive(&self, request: &ReceiveStockRequest) -> DbResult<Vec<StockItem>> {
        request.validate()?;

        if fetch_product(&self.pool, &request.product_id).await?.is_none() {
            return Err(DbError::not_found("Product", &request.product_id));
        }
        if fetch_location(&self.pool, &request.location_id).await?.is_none() {
            return Err(DbError::not_found("Location", &request.location_id));
        }
        let storage_box = fetch_storage_box(&self.pool, &request.storage_box_id)
            .await?
            .ok_or_else(|| DbError::not_found("StorageBox", &request.storage_box_id))?;
        if !storage_box.belongs_to(&request.location_id) {
            return Err(CoreError::BoxNotInLocation {
                box_id: storage_box.id,
                location_id: request.location_id.clone(),
            }
            .into());
        }

        let mut last_error = None;
        for attempt in 0..SERIAL_ATTEMPTS {
            let now = Utc::now();
            let items = build_batch(request, now.timestamp_millis() + attempt, now);

            match self.insert_batch(&items).await {
                Ok(()) => {
                    info!(
                        product_id = %request.product_id,
                        location_id = %request.location_id,
                        storage_box_id = %request.storage_box_id,
                        quantity = request.quantity,
                        "Stock received"
                    );
                    return Ok(items);
                }
                Err(err @ DbError::UniqueViolation { .. }) => {
                    warn!(attempt, error = %err, "Serial batch collided, retrying");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| DbError::Internal("serial generation failed".to_string())))
    }

    async fn insert_batch(&self, items: &[StockItem]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            debug!(id = %item.id, serial = %item.serial_number, "Inserting stock item");

            sqlx::query(
                r#"
                INSERT INTO stocks (
                    id, product_id, location_id, storage_box_id, serial_number, status,
                    supplier_name, notes, received_at, sold_at, transaction_id,
                    barcode_printed, barcode_printed_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
            )
            .bind(&item.id)
            .bind(&item.product_id)
            .bind(&item.location_id)
            .bind(&item.storage_box_id)
            .bind(&item.serial_number)
            .bind(item.status)
            .bind(&item.supplier_name)
            .bind(&item.notes)
            .bind(item.received_at)
            .bind(item.sold_at)
            .bind(&item.transaction_id)
            .bind(item.barcode_printed)
            .bind(item.barcode_printed_at)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a stock item by its ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<StockItem>> {
        fetch_stock(&self.pool, id).await
    }

    /// Gets a stock item with product, category (live prices) and placement.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<StockItemDetail>> {
        fetch_detail(&self.pool, id).await
    }

    /// Barcode scanner lookup.
    pub async fn get_by_serial(&self, serial_number: &str) -> DbResult<Option<StockItemDetail>> {
        let sql = format!("{DETAIL_SELECT} AND s.serial_number = ?1");
        let detail = sqlx::query_as::<_, StockItemDetail>(&sql)
            .bind(serial_number.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(detail)
    }

    /// Lists stock, newest receipts first.
    pub async fn list(&self, filter: &StockFilter) -> DbResult<Vec<StockItemDetail>> {
        let sql = format!(
            "{DETAIL_SELECT}
               AND (?1 IS NULL OR s.location_id = ?1)
               AND (?2 IS NULL OR s.storage_box_id = ?2)
               AND (?3 IS NULL OR s.product_id = ?3)
               AND (?4 IS NULL OR s.status = ?4)
             ORDER BY s.received_at DESC, s.serial_number"
        );
        let items = sqlx::query_as::<_, StockItemDetail>(&sql)
            .bind(&filter.location_id)
            .bind(&filter.storage_box_id)
            .bind(&filter.product_id)
            .bind(filter.status)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = items.len(), "Stock list returned");
        Ok(items)
    }

    /// Stock of one box for label printing, ordered by serial.
    ///
    /// `status` defaults to `available`.
    pub async fn list_for_labels(
        &self,
        storage_box_id: &str,
        status: Option<StockStatus>,
    ) -> DbResult<Vec<StockItemDetail>> {
        let sql = format!("{DETAIL_SELECT} AND s.storage_box_id = ?1 AND s.status = ?2 ORDER BY s.serial_number");
        let items = sqlx::query_as::<_, StockItemDetail>(&sql)
            .bind(storage_box_id)
            .bind(status.unwrap_or(StockStatus::Available))
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Flags labels as printed. Returns how many items were updated;
    /// unknown ids are skipped.
    pub async fn mark_barcodes_printed(&self, stock_ids: &[String]) -> DbResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for stock_id in stock_ids {
            let result = sqlx::query(
                r#"
                UPDATE stocks
                SET barcode_printed = 1, barcode_printed_at = ?1, updated_at = ?1
                WHERE id = ?2 AND deleted_at IS NULL
                "#,
            )
            .bind(now)
            .bind(stock_id)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;

        debug!(requested = stock_ids.len(), updated, "Barcodes marked printed");
        Ok(updated)
    }

    /// Soft-deletes an available stock item.
    ///
    /// ## Errors
    /// * `NotFound` - no such stock
    /// * `Conflict` - the item is sold (or otherwise not available)
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let stock = fetch_stock(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", id))?;

        if !stock.status.is_deletable() {
            return Err(CoreError::StockNotDeletable {
                serial_number: stock.serial_number,
                status: stock.status,
            }
            .into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE stocks
            SET deleted_at = ?1, updated_at = ?1
            WHERE id = ?2 AND status = 'available' AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(stock_id = %id, "Stock changed before delete");
            return Err(CoreError::StockModified {
                serial_number: stock.serial_number,
            }
            .into());
        }

        info!(stock_id = %id, serial = %stock.serial_number, "Stock deleted");
        Ok(())
    }
}

fn build_batch(request: &ReceiveStockRequest, batch_millis: i64, now: DateTime<Utc>) -> Vec<StockItem> {
    codes::serial_numbers(batch_millis, request.quantity)
        .into_iter()
        .map(|serial_number| StockItem {
            id: Uuid::new_v4().to_string(),
            product_id: request.product_id.clone(),
            location_id: request.location_id.clone(),
            storage_box_id: request.storage_box_id.clone(),
            serial_number,
            status: StockStatus::Available,
            supplier_name: request.supplier_name.clone(),
            notes: request.notes.clone(),
            received_at: now,
            sold_at: None,
            transaction_id: None,
            barcode_printed: false,
            barcode_printed_at: None,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
