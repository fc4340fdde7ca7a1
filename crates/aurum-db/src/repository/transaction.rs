//! # Transaction Repository
//!
//! The sale and purchase engines, cancellation, and transaction reads.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         create_sale()                                   │
//! │                                                                         │
//! │  1. Pre-pass (pool reads, nothing locked)                               │
//! │     ├── location, member exist                 → NotFound               │
//! │     ├── each stock exists                      → Validation             │
//! │     ├── each stock available                   → Conflict               │
//! │     ├── each stock at the sale location        → Validation             │
//! │     └── totals: sub − discount + tax ≤ paid    → Validation             │
//! │                                                                         │
//! │  2. Atomic unit (BEGIN … COMMIT)                                        │
//! │     ├── INSERT transaction header   ← first write, takes the lock       │
//! │     ├── for each line:                                                  │
//! │     │     UPDATE stocks … WHERE status = 'available'  (CAS)             │
//! │     │     INSERT transaction_item (price snapshot)                      │
//! │     └── member accrual                                                  │
//! │                                                                         │
//! │  Any failure in 2 drops the transaction → full rollback                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purchase Flow ("setor")
//! The store buys gold by weight. No stock moves; optionally every line is
//! booked as raw material inside the same unit of work.
//!
//! ## Cancellation
//! A cancelled sale releases its stock back to `available`. A cancelled
//! purchase only flips its status: member accrual and raw material stay.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::{fetch_gold_category, fetch_location};
use super::member::{apply_in, fetch_member};
use super::raw_material::insert_raw_material;
use super::stock::{fetch_detail, fetch_stock, mark_available, mark_sold};
use super::unique_as;
use crate::error::{DbError, DbResult};
use aurum_core::codes;
use aurum_core::pricing::{purchase_line_total, sale_line_sub_total};
use aurum_core::validation::validate_required;
use aurum_core::{
    CoreError, GoldCategory, Money, PurchaseLine, PurchaseRequest, PurchaseTotals, Rate,
    RawMaterial, RawMaterialStatus, SaleLine, SaleRequest, SaleTotals, StockItemDetail,
    Transaction, TransactionDetail, TransactionFilter, TransactionItem, TransactionStatus,
    TransactionType,
};

const TRANSACTION_SELECT: &str = "SELECT id, code, transaction_type, member_id, location_id, \
     user_id, sub_total, discount, discount_percent, tax, grand_total, paid_amount, \
     change_amount, payment_method, customer_name, customer_phone, notes, status, \
     transaction_date, created_at, updated_at \
     FROM transactions WHERE deleted_at IS NULL";

const ITEM_SELECT: &str = "SELECT id, transaction_id, stock_id, product_id, gold_category_id, \
     item_name, barcode, weight, price_per_gram, unit_price, quantity, discount, sub_total, \
     notes, created_at \
     FROM transaction_items";

// =============================================================================
// Row helpers
// =============================================================================

async fn fetch_transaction<'e, E>(executor: E, id: &str) -> DbResult<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{TRANSACTION_SELECT} AND id = ?1");
    let transaction = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(transaction)
}

async fn fetch_items<'e, E>(executor: E, transaction_id: &str) -> DbResult<Vec<TransactionItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{ITEM_SELECT} WHERE transaction_id = ?1 ORDER BY rowid");
    let items = sqlx::query_as::<_, TransactionItem>(&sql)
        .bind(transaction_id)
        .fetch_all(executor)
        .await?;
    Ok(items)
}

async fn insert_header(conn: &mut SqliteConnection, transaction: &Transaction) -> DbResult<()> {
    debug!(
        id = %transaction.id,
        code = %transaction.code,
        kind = %transaction.transaction_type,
        grand_total = %transaction.grand_total,
        "Inserting transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, code, transaction_type, member_id, location_id, user_id,
            sub_total, discount, discount_percent, tax, grand_total, paid_amount,
            change_amount, payment_method, customer_name, customer_phone, notes,
            status, transaction_date, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20, ?21
        )
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.code)
    .bind(transaction.transaction_type)
    .bind(&transaction.member_id)
    .bind(&transaction.location_id)
    .bind(&transaction.user_id)
    .bind(transaction.sub_total)
    .bind(transaction.discount)
    .bind(transaction.discount_percent)
    .bind(transaction.tax)
    .bind(transaction.grand_total)
    .bind(transaction.paid_amount)
    .bind(transaction.change_amount)
    .bind(transaction.payment_method)
    .bind(&transaction.customer_name)
    .bind(&transaction.customer_phone)
    .bind(&transaction.notes)
    .bind(transaction.status)
    .bind(transaction.transaction_date)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(conn)
    .await
    .map_err(unique_as("code", &transaction.code))?;

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, stock_id, product_id, gold_category_id, item_name,
            barcode, weight, price_per_gram, unit_price, quantity, discount,
            sub_total, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(&item.stock_id)
    .bind(&item.product_id)
    .bind(&item.gold_category_id)
    .bind(&item.item_name)
    .bind(&item.barcode)
    .bind(item.weight)
    .bind(item.price_per_gram)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.discount)
    .bind(item.sub_total)
    .bind(&item.notes)
    .bind(item.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// A validated sale line with its price fixed at validation time.
struct PricedSaleLine<'a> {
    line: &'a SaleLine,
    detail: StockItemDetail,
    unit_price: Money,
    sub_total: Money,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sales, purchases and their cancellation.
///
/// ## Usage
/// ```rust,ignore
/// let engine = db.transactions();
/// let sale = engine.create_sale(&sale_request, &cashier_id).await?;
/// println!("{} grand {} change {}", sale.transaction.code,
///          sale.transaction.grand_total, sale.transaction.change_amount);
/// engine.cancel(&sale.transaction.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Sale
    // -------------------------------------------------------------------------

    /// Sells serialized stock.
    ///
    /// ## Errors
    /// * `Validation` - malformed request, missing stock, stock at another
    ///   location, discount above the price, or underpayment
    /// * `NotFound` - location or member missing
    /// * `Conflict` - a stock item is not available, or was sold/moved
    ///   concurrently
    pub async fn create_sale(&self, request: &SaleRequest, user_id: &str) -> DbResult<TransactionDetail> {
        request.validate()?;
        validate_required("user_id", user_id)?;

        if fetch_location(&self.pool, &request.location_id).await?.is_none() {
            return Err(DbError::not_found("Location", &request.location_id));
        }
        if let Some(member_id) = &request.member_id {
            if fetch_member(&self.pool, member_id).await?.is_none() {
                return Err(DbError::not_found("Member", member_id));
            }
        }

        let mut priced = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let detail = fetch_detail(&self.pool, &line.stock_id)
                .await?
                .ok_or_else(|| CoreError::SaleStockMissing {
                    stock_id: line.stock_id.clone(),
                })?;

            if !detail.stock.status.is_sellable() {
                return Err(CoreError::StockNotAvailable {
                    serial_number: detail.stock.serial_number,
                    status: detail.stock.status,
                }
                .into());
            }
            if detail.stock.location_id != request.location_id {
                return Err(CoreError::StockNotInLocation {
                    serial_number: detail.stock.serial_number,
                    location_id: request.location_id.clone(),
                }
                .into());
            }

            let unit_price = detail.sell_price();
            let sub_total = sale_line_sub_total(unit_price, line.discount)?;
            priced.push(PricedSaleLine {
                line,
                detail,
                unit_price,
                sub_total,
            });
        }

        let totals = SaleTotals::compute(
            priced.iter().map(|p| p.sub_total),
            request.discount,
            request.discount_percent,
            request.tax,
            request.paid_amount,
        )?;

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            code: codes::transaction_code(TransactionType::Sale, now),
            transaction_type: TransactionType::Sale,
            member_id: request.member_id.clone(),
            location_id: request.location_id.clone(),
            user_id: user_id.to_string(),
            sub_total: totals.sub_total,
            discount: totals.discount,
            discount_percent: totals.discount_percent,
            tax: totals.tax,
            grand_total: totals.grand_total,
            paid_amount: totals.paid_amount,
            change_amount: totals.change_amount,
            payment_method: request.payment_method,
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            notes: request.notes.clone(),
            status: TransactionStatus::Completed,
            transaction_date: now,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<TransactionItem> = priced
            .iter()
            .map(|p| TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                stock_id: Some(p.detail.stock.id.clone()),
                product_id: Some(p.detail.stock.product_id.clone()),
                gold_category_id: Some(p.detail.gold_category_id.clone()),
                item_name: p.detail.product_name.clone(),
                barcode: Some(p.detail.product_barcode.clone()),
                weight: p.detail.product_weight,
                price_per_gram: p.detail.sell_price_per_gram,
                unit_price: p.unit_price,
                quantity: 1,
                discount: p.line.discount,
                sub_total: p.sub_total,
                notes: p.line.notes.clone(),
                created_at: now,
            })
            .collect();

        let mut tx = self.pool.begin().await?;

        insert_header(&mut tx, &transaction).await?;
        for (p, item) in priced.iter().zip(&items) {
            mark_sold(&mut tx, &p.detail.stock, &transaction.id, now).await?;
            insert_item(&mut tx, item).await?;
        }
        if let Some(member_id) = &transaction.member_id {
            let grand_total = transaction.grand_total;
            apply_in(&mut tx, member_id, |s| s.apply_sale(grand_total)).await?;
        }

        tx.commit().await?;

        info!(
            code = %transaction.code,
            lines = items.len(),
            grand_total = %transaction.grand_total,
            change = %transaction.change_amount,
            "Sale completed"
        );
        Ok(TransactionDetail { transaction, items })
    }

    // -------------------------------------------------------------------------
    // Purchase
    // -------------------------------------------------------------------------

    /// Buys gold from a member or walk-in customer.
    ///
    /// The purchase is paid in full: `paid_amount = grand_total`,
    /// `change_amount = 0`.
    ///
    /// ## Errors
    /// * `Validation` - malformed request
    /// * `NotFound` - location, member or a gold category missing
    pub async fn create_purchase(
        &self,
        request: &PurchaseRequest,
        user_id: &str,
    ) -> DbResult<TransactionDetail> {
        request.validate()?;
        validate_required("user_id", user_id)?;

        if fetch_location(&self.pool, &request.location_id).await?.is_none() {
            return Err(DbError::not_found("Location", &request.location_id));
        }
        if let Some(member_id) = &request.member_id {
            if fetch_member(&self.pool, member_id).await?.is_none() {
                return Err(DbError::not_found("Member", member_id));
            }
        }

        let mut categories = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let category = match &line.gold_category_id {
                Some(id) => Some(
                    fetch_gold_category(&self.pool, id)
                        .await?
                        .ok_or_else(|| DbError::not_found("GoldCategory", id))?,
                ),
                None => None,
            };
            categories.push(category);
        }

        let line_totals: Vec<Money> = request
            .items
            .iter()
            .map(|line| purchase_line_total(line.weight, line.price_per_gram))
            .collect::<Result<_, _>>()?;
        let totals = PurchaseTotals::compute(line_totals.iter().copied())?;

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            code: codes::transaction_code(TransactionType::Purchase, now),
            transaction_type: TransactionType::Purchase,
            member_id: request.member_id.clone(),
            location_id: request.location_id.clone(),
            user_id: user_id.to_string(),
            sub_total: totals.grand_total,
            discount: Money::zero(),
            discount_percent: Rate::zero(),
            tax: Money::zero(),
            grand_total: totals.grand_total,
            paid_amount: totals.paid_amount(),
            change_amount: Money::zero(),
            payment_method: request.payment_method,
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            notes: request.notes.clone(),
            status: TransactionStatus::Completed,
            transaction_date: now,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<TransactionItem> = request
            .items
            .iter()
            .zip(&categories)
            .zip(&line_totals)
            .map(|((line, category), total)| TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                stock_id: None,
                product_id: None,
                gold_category_id: line.gold_category_id.clone(),
                item_name: deposit_item_name(category.as_ref(), line.purity.as_deref()),
                barcode: None,
                weight: line.weight,
                price_per_gram: line.price_per_gram,
                unit_price: *total,
                quantity: 1,
                discount: Money::zero(),
                sub_total: *total,
                notes: deposit_notes(line),
                created_at: now,
            })
            .collect();

        let raw_materials = if request.save_as_raw_material {
            raw_materials_for(request, &transaction, &categories, &line_totals, now)
        } else {
            Vec::new()
        };

        let mut tx = self.pool.begin().await?;

        insert_header(&mut tx, &transaction).await?;
        for item in &items {
            insert_item(&mut tx, item).await?;
        }
        if let Some(member_id) = &transaction.member_id {
            let grand_total = transaction.grand_total;
            apply_in(&mut tx, member_id, |s| s.apply_purchase(grand_total)).await?;
        }
        for raw_material in &raw_materials {
            insert_raw_material(&mut tx, raw_material).await?;
        }

        tx.commit().await?;

        info!(
            code = %transaction.code,
            lines = items.len(),
            grand_total = %transaction.grand_total,
            raw_materials = raw_materials.len(),
            "Purchase completed"
        );
        Ok(TransactionDetail { transaction, items })
    }

    // -------------------------------------------------------------------------
    // Cancellation
    // -------------------------------------------------------------------------

    /// Cancels a completed transaction.
    ///
    /// ## Errors
    /// * `NotFound` - no such transaction
    /// * `Conflict` - already cancelled, or a sold item changed meanwhile
    pub async fn cancel(&self, id: &str) -> DbResult<TransactionDetail> {
        let transaction = fetch_transaction(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        if transaction.status != TransactionStatus::Completed {
            return Err(CoreError::InvalidTransactionStatus {
                code: transaction.code,
                status: transaction.status,
            }
            .into());
        }

        let items = fetch_items(&self.pool, &transaction.id).await?;

        let mut sold_stock = Vec::new();
        if transaction.transaction_type == TransactionType::Sale {
            for stock_id in items.iter().filter_map(|item| item.stock_id.as_deref()) {
                let stock = fetch_stock(&self.pool, stock_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Stock", stock_id))?;
                sold_stock.push(stock);
            }
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'cancelled', updated_at = ?1
            WHERE id = ?2 AND status = 'completed' AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(&transaction.id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            warn!(code = %transaction.code, "Transaction changed before cancel");
            return Err(CoreError::InvalidTransactionStatus {
                code: transaction.code,
                status: TransactionStatus::Cancelled,
            }
            .into());
        }

        for stock in &sold_stock {
            mark_available(&mut tx, stock, &transaction.id, now).await?;
        }

        tx.commit().await?;

        info!(
            code = %transaction.code,
            kind = %transaction.transaction_type,
            released = sold_stock.len(),
            "Transaction cancelled"
        );

        let transaction = Transaction {
            status: TransactionStatus::Cancelled,
            updated_at: now,
            ..transaction
        };
        Ok(TransactionDetail { transaction, items })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a transaction with its items.
    pub async fn get(&self, id: &str) -> DbResult<Option<TransactionDetail>> {
        match fetch_transaction(&self.pool, id).await? {
            Some(transaction) => {
                let items = fetch_items(&self.pool, &transaction.id).await?;
                Ok(Some(TransactionDetail { transaction, items }))
            }
            None => Ok(None),
        }
    }

    /// Receipt lookup by code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<TransactionDetail>> {
        let sql = format!("{TRANSACTION_SELECT} AND code = ?1");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        match transaction {
            Some(transaction) => {
                let items = fetch_items(&self.pool, &transaction.id).await?;
                Ok(Some(TransactionDetail { transaction, items }))
            }
            None => Ok(None),
        }
    }

    /// Lists transaction headers, newest first.
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "{TRANSACTION_SELECT}
               AND (?1 IS NULL OR transaction_type = ?1)
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR location_id = ?3)
               AND (?4 IS NULL OR member_id = ?4)
               AND (?5 IS NULL OR transaction_date >= ?5)
               AND (?6 IS NULL OR transaction_date < ?6)
             ORDER BY transaction_date DESC, rowid DESC"
        );
        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(filter.transaction_type)
            .bind(filter.status)
            .bind(&filter.location_id)
            .bind(&filter.member_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = transactions.len(), "Transaction list returned");
        Ok(transactions)
    }
}

// =============================================================================
// Purchase helpers
// =============================================================================

/// Display name of a purchase line: the category name, else the purity the
/// cashier wrote down.
fn deposit_item_name(category: Option<&GoldCategory>, purity: Option<&str>) -> String {
    match (category, purity.map(str::trim).filter(|p| !p.is_empty())) {
        (Some(category), _) => format!("Gold deposit {}", category.name),
        (None, Some(purity)) => format!("Gold deposit {purity}"),
        (None, None) => "Gold deposit (uncategorized)".to_string(),
    }
}

/// `Condition: Scratched. Purity: 75%. free text`
fn deposit_notes(line: &PurchaseLine) -> Option<String> {
    let mut parts = vec![format!("Condition: {}.", line.condition.label())];
    if let Some(purity) = line.purity.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        parts.push(format!("Purity: {purity}."));
    }
    if let Some(notes) = line.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        parts.push(notes.to_string());
    }
    Some(parts.join(" "))
}

fn raw_materials_for(
    request: &PurchaseRequest,
    transaction: &Transaction,
    categories: &[Option<GoldCategory>],
    line_totals: &[Money],
    now: DateTime<Utc>,
) -> Vec<RawMaterial> {
    let mut codes_used = HashSet::new();

    request
        .items
        .iter()
        .zip(categories)
        .zip(line_totals)
        .map(|((line, category), total)| {
            // Codes share the millisecond; the random suffix separates them
            let mut code = codes::raw_material_code(now);
            while !codes_used.insert(code.clone()) {
                code = codes::raw_material_code(now);
            }

            RawMaterial {
                id: Uuid::new_v4().to_string(),
                code,
                gold_category_id: line.gold_category_id.clone(),
                location_id: request.location_id.clone(),
                weight_gross: line.effective_weight_gross(),
                weight: line.weight,
                shrinkage_percent: line.shrinkage_percent,
                purity: line
                    .purity
                    .clone()
                    .or_else(|| category.as_ref().and_then(|c| c.purity.clone())),
                buy_price_per_gram: line.price_per_gram,
                total_buy_price: *total,
                condition: line.condition,
                status: RawMaterialStatus::Available,
                supplier_name: request.customer_name.clone(),
                member_id: request.member_id.clone(),
                transaction_id: Some(transaction.id.clone()),
                received_by: transaction.user_id.clone(),
                received_at: now,
                processed_at: None,
                notes: line.notes.clone(),
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;
    use aurum_core::{
        ErrorKind, MemberTier, PaymentMethod, RawMaterialCondition, RawMaterialFilter, StockStatus,
        TransferRequest, Weight,
    };

    fn purchase_line(category_id: Option<&str>, grams_mg: i64, price: i64) -> PurchaseLine {
        PurchaseLine {
            gold_category_id: category_id.map(str::to_string),
            purity: None,
            weight_gross: Weight::zero(),
            shrinkage_percent: Rate::zero(),
            weight: Weight::from_milligrams(grams_mg),
            price_per_gram: Money::from_rupiah(price),
            condition: RawMaterialCondition::default(),
            notes: None,
        }
    }

    async fn transaction_count(fx: &Fixture) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(fx.db.pool())
            .await
            .unwrap()
    }

    // -------------------------------------------------------------------------
    // Sale
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sale_of_one_piece_to_member() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);

        let request = fx.sale_request(&[&stock.id], Some(&fx.member.id));
        let sale = fx
            .db
            .transactions()
            .create_sale(&request, &fx.user_id)
            .await
            .unwrap();

        let t = &sale.transaction;
        assert!(t.code.starts_with("SL"));
        assert_eq!(t.code.len(), 18);
        assert_eq!(t.status, TransactionStatus::Completed);
        assert_eq!(t.sub_total, Money::from_rupiah(1_000_000));
        assert_eq!(t.grand_total, Money::from_rupiah(1_000_000));
        assert_eq!(t.change_amount, Money::zero());
        assert_eq!(t.grand_total, t.sub_total - t.discount + t.tax);

        assert_eq!(sale.items.len(), 1);
        let item = &sale.items[0];
        assert_eq!(item.stock_id.as_deref(), Some(stock.id.as_str()));
        assert_eq!(item.item_name, fx.product.name);
        assert_eq!(item.barcode.as_deref(), Some(fx.product.barcode.as_str()));
        assert_eq!(item.weight, fx.product.weight);
        assert_eq!(item.price_per_gram, Money::from_rupiah(500_000));
        assert_eq!(item.unit_price, Money::from_rupiah(1_000_000));
        assert_eq!(item.quantity, 1);

        let sold = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(sold.status, StockStatus::Sold);
        assert!(sold.sold_at.is_some());
        assert_eq!(sold.transaction_id.as_deref(), Some(t.id.as_str()));

        let member = fx.db.members().get(&fx.member.id).await.unwrap().unwrap();
        assert_eq!(member.points, 10);
        assert_eq!(member.total_purchase, Money::from_rupiah(1_000_000));
        assert_eq!(member.transaction_count, 1);
        assert_eq!(member.tier, MemberTier::Regular);

        let stored = fx.db.transactions().get(&t.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.transaction.code, t.code);
    }

    #[tokio::test]
    async fn test_sale_percent_discount_tax_and_change() {
        let fx = Fixture::new().await;
        let stocks = fx.receive(2).await;

        let mut request = fx.sale_request(&[&stocks[0].id, &stocks[1].id], None);
        request.discount = Money::from_rupiah(999);
        request.discount_percent = Rate::from_percent(10);
        request.tax = Money::from_rupiah(50_000);
        request.paid_amount = Money::from_rupiah(2_000_000);
        request.payment_method = PaymentMethod::Card;
        request.items[0].discount = Money::from_rupiah(100_000);

        let sale = fx
            .db
            .transactions()
            .create_sale(&request, &fx.user_id)
            .await
            .unwrap();

        let t = &sale.transaction;
        // 900,000 + 1,000,000
        assert_eq!(t.sub_total, Money::from_rupiah(1_900_000));
        // the percent wins over the literal amount
        assert_eq!(t.discount, Money::from_rupiah(190_000));
        assert_eq!(t.grand_total, Money::from_rupiah(1_760_000));
        assert_eq!(t.change_amount, Money::from_rupiah(240_000));
        assert_eq!(t.payment_method, PaymentMethod::Card);
        assert_eq!(sale.items[0].sub_total, Money::from_rupiah(900_000));
    }

    #[tokio::test]
    async fn test_underpaid_sale_persists_nothing() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);

        let mut request = fx.sale_request(&[&stock.id], Some(&fx.member.id));
        request.paid_amount = Money::from_rupiah(999_999);

        let err = fx
            .db
            .transactions()
            .create_sale(&request, &fx.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientPayment { .. })));
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(transaction_count(&fx).await, 0);
        let untouched = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, StockStatus::Available);
        let member = fx.db.members().get(&fx.member.id).await.unwrap().unwrap();
        assert_eq!(member.points, 0);
    }

    #[tokio::test]
    async fn test_sale_rejections() {
        let fx = Fixture::new().await;
        let stocks = fx.receive(2).await;
        let engine = fx.db.transactions();

        // Missing stock
        let ghost = Uuid::new_v4().to_string();
        let err = engine
            .create_sale(&fx.sale_request(&[&ghost], None), &fx.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleStockMissing { .. })));
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Unknown member
        let err = engine
            .create_sale(&fx.sale_request(&[&stocks[0].id], Some(&ghost)), &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Same stock twice
        let err = engine
            .create_sale(&fx.sale_request(&[&stocks[0].id, &stocks[0].id], None), &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Stock held at another location
        fx.db
            .transfers()
            .transfer(
                &TransferRequest {
                    stock_id: stocks[1].id.clone(),
                    to_location_id: fx.location2.id.clone(),
                    to_box_id: fx.box_b.id.clone(),
                    notes: None,
                },
                &fx.user_id,
            )
            .await
            .unwrap();
        let err = engine
            .create_sale(&fx.sale_request(&[&stocks[1].id], None), &fx.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::StockNotInLocation { .. })));

        // Already sold
        fx.sell(&stocks[0].id, None).await;
        let err = engine
            .create_sale(&fx.sale_request(&[&stocks[0].id], None), &fx.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::StockNotAvailable { .. })));
        assert!(err.is_conflict());

        assert_eq!(transaction_count(&fx).await, 1);
    }

    #[tokio::test]
    async fn test_line_discount_above_price_is_rejected() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);

        let mut request = fx.sale_request(&[&stock.id], None);
        request.items[0].discount = Money::from_rupiah(1_000_001);

        let err = fx
            .db
            .transactions()
            .create_sale(&request, &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_sale_prices_follow_live_category_price() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);
        fx.set_sell_price(Money::from_rupiah(510_000)).await;

        let mut request = fx.sale_request(&[&stock.id], None);
        request.paid_amount = Money::from_rupiah(1_020_000);
        let sale = fx
            .db
            .transactions()
            .create_sale(&request, &fx.user_id)
            .await
            .unwrap();
        assert_eq!(sale.transaction.grand_total, Money::from_rupiah(1_020_000));
        assert_eq!(sale.items[0].price_per_gram, Money::from_rupiah(510_000));
    }

    // -------------------------------------------------------------------------
    // Cancellation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_sale_releases_stock() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);
        let sale = fx.sell(&stock.id, None).await;
        let engine = fx.db.transactions();

        let cancelled = engine.cancel(&sale.transaction.id).await.unwrap();
        assert_eq!(cancelled.transaction.status, TransactionStatus::Cancelled);

        let released = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(released.status, StockStatus::Available);
        assert!(released.sold_at.is_none());
        assert!(released.transaction_id.is_none());

        let stored = engine.get(&sale.transaction.id).await.unwrap().unwrap();
        assert_eq!(stored.transaction.status, TransactionStatus::Cancelled);

        let err = engine.cancel(&sale.transaction.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidTransactionStatus { .. })));
        assert!(err.is_conflict());

        let err = engine.cancel(&Uuid::new_v4().to_string()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Released stock sells again
        let again = fx.sell(&stock.id, None).await;
        assert_ne!(again.transaction.id, sale.transaction.id);
    }

    // -------------------------------------------------------------------------
    // Purchase
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_purchase_totals_names_and_member_accrual() {
        let fx = Fixture::new().await;

        let mut unnamed = purchase_line(None, 2_500, 400_000);
        unnamed.purity = Some("75%".into());
        unnamed.condition = RawMaterialCondition::Scratched;
        unnamed.notes = Some("broken clasp".into());

        let request = PurchaseRequest {
            location_id: fx.location1.id.clone(),
            member_id: Some(fx.member.id.clone()),
            customer_name: None,
            customer_phone: None,
            items: vec![purchase_line(Some(&fx.category.id), 5_000, 450_000), unnamed],
            payment_method: PaymentMethod::Transfer,
            notes: None,
            save_as_raw_material: false,
        };

        let purchase = fx
            .db
            .transactions()
            .create_purchase(&request, &fx.user_id)
            .await
            .unwrap();

        let t = &purchase.transaction;
        assert!(t.code.starts_with("PR"));
        assert_eq!(t.transaction_type, TransactionType::Purchase);
        assert_eq!(t.grand_total, Money::from_rupiah(3_250_000));
        assert_eq!(t.sub_total, t.grand_total);
        assert_eq!(t.paid_amount, t.grand_total);
        assert_eq!(t.change_amount, Money::zero());

        let sum: Money = purchase.items.iter().map(|i| i.sub_total).sum();
        assert_eq!(sum, t.grand_total);
        assert_eq!(purchase.items[0].item_name, format!("Gold deposit {}", fx.category.name));
        assert_eq!(purchase.items[1].item_name, "Gold deposit 75%");
        assert_eq!(
            purchase.items[1].notes.as_deref(),
            Some("Condition: Scratched. Purity: 75%. broken clasp")
        );
        assert!(purchase.items.iter().all(|i| i.stock_id.is_none()));

        let member = fx.db.members().get(&fx.member.id).await.unwrap().unwrap();
        assert_eq!(member.total_sell, Money::from_rupiah(3_250_000));
        assert_eq!(member.total_purchase, Money::zero());
        assert_eq!(member.points, 16);
        assert_eq!(member.transaction_count, 1);

        let raw = fx
            .db
            .raw_materials()
            .list(&RawMaterialFilter::default())
            .await
            .unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn test_purchase_books_raw_material_atomically() {
        let fx = Fixture::new().await;

        let mut gross = purchase_line(Some(&fx.category.id), 4_000, 450_000);
        gross.weight_gross = Weight::from_milligrams(4_200);
        let request = PurchaseRequest {
            location_id: fx.location1.id.clone(),
            member_id: Some(fx.member.id.clone()),
            customer_name: Some("Budi".into()),
            customer_phone: None,
            items: vec![gross, purchase_line(None, 1_000, 300_000)],
            payment_method: PaymentMethod::Cash,
            notes: None,
            save_as_raw_material: true,
        };

        let purchase = fx
            .db
            .transactions()
            .create_purchase(&request, &fx.user_id)
            .await
            .unwrap();

        let raw = fx
            .db
            .raw_materials()
            .list(&RawMaterialFilter::default())
            .await
            .unwrap();
        assert_eq!(raw.len(), 2);
        assert_ne!(raw[0].code, raw[1].code);
        for material in &raw {
            assert_eq!(material.status, RawMaterialStatus::Available);
            assert_eq!(material.transaction_id.as_deref(), Some(purchase.transaction.id.as_str()));
            assert_eq!(material.member_id.as_deref(), Some(fx.member.id.as_str()));
            assert_eq!(material.received_by, fx.user_id);
            assert_eq!(material.supplier_name.as_deref(), Some("Budi"));
            assert_eq!(material.total_buy_price, material.buy_price_per_gram.for_weight(material.weight));
        }

        let with_gross = raw.iter().find(|m| m.gold_category_id.is_some()).unwrap();
        assert_eq!(with_gross.weight_gross, Weight::from_milligrams(4_200));
        let defaulted = raw.iter().find(|m| m.gold_category_id.is_none()).unwrap();
        assert_eq!(defaulted.weight_gross, defaulted.weight);
    }

    #[tokio::test]
    async fn test_purchase_with_unknown_category_persists_nothing() {
        let fx = Fixture::new().await;
        let ghost = Uuid::new_v4().to_string();

        let request = PurchaseRequest {
            location_id: fx.location1.id.clone(),
            member_id: Some(fx.member.id.clone()),
            customer_name: None,
            customer_phone: None,
            items: vec![
                purchase_line(Some(&fx.category.id), 1_000, 450_000),
                purchase_line(Some(&ghost), 1_000, 450_000),
            ],
            payment_method: PaymentMethod::Cash,
            notes: None,
            save_as_raw_material: true,
        };

        let err = fx
            .db
            .transactions()
            .create_purchase(&request, &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(transaction_count(&fx).await, 0);

        let member = fx.db.members().get(&fx.member.id).await.unwrap().unwrap();
        assert_eq!(member.transaction_count, 0);
    }

    #[tokio::test]
    async fn test_totals_beyond_money_bounds_are_rejected() {
        let fx = Fixture::new().await;
        let ceiling = aurum_core::MAX_AMOUNT_RUPIAH;

        // Each line fits, the grand total does not.
        let request = PurchaseRequest {
            location_id: fx.location1.id.clone(),
            member_id: Some(fx.member.id.clone()),
            customer_name: None,
            customer_phone: None,
            items: vec![
                purchase_line(None, 1_000, ceiling),
                purchase_line(None, 1_000, ceiling),
            ],
            payment_method: PaymentMethod::Cash,
            notes: None,
            save_as_raw_material: true,
        };
        let err = fx
            .db
            .transactions()
            .create_purchase(&request, &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stock = fx.receive(1).await.remove(0);
        let mut sale = fx.sale_request(&[&stock.id], None);
        sale.tax = Money::from_rupiah(i64::MAX);
        sale.paid_amount = Money::from_rupiah(i64::MAX);
        let err = fx
            .db
            .transactions()
            .create_sale(&sale, &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(transaction_count(&fx).await, 0);
        let member = fx.db.members().get(&fx.member.id).await.unwrap().unwrap();
        assert_eq!(member.total_sell, Money::zero());
        assert_eq!(member.transaction_count, 0);
        let stock = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(stock.status, StockStatus::Available);
    }

    #[tokio::test]
    async fn test_cancel_purchase_keeps_accrual_and_raw_material() {
        let fx = Fixture::new().await;
        let request = PurchaseRequest {
            location_id: fx.location1.id.clone(),
            member_id: Some(fx.member.id.clone()),
            customer_name: None,
            customer_phone: None,
            items: vec![purchase_line(Some(&fx.category.id), 1_000, 400_000)],
            payment_method: PaymentMethod::Cash,
            notes: None,
            save_as_raw_material: true,
        };
        let purchase = fx
            .db
            .transactions()
            .create_purchase(&request, &fx.user_id)
            .await
            .unwrap();

        let cancelled = fx
            .db
            .transactions()
            .cancel(&purchase.transaction.id)
            .await
            .unwrap();
        assert_eq!(cancelled.transaction.status, TransactionStatus::Cancelled);

        let member = fx.db.members().get(&fx.member.id).await.unwrap().unwrap();
        assert_eq!(member.total_sell, Money::from_rupiah(400_000));
        assert_eq!(member.points, 2);

        let raw = fx
            .db
            .raw_materials()
            .list(&RawMaterialFilter::default())
            .await
            .unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].status, RawMaterialStatus::Available);
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_and_lookup_by_code() {
        let fx = Fixture::new().await;
        let stocks = fx.receive(2).await;
        let first = fx.sell(&stocks[0].id, Some(&fx.member.id)).await;
        let second = fx.sell(&stocks[1].id, None).await;
        let engine = fx.db.transactions();

        let all = engine.list(&TransactionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.transaction.id);

        let for_member = engine
            .list(&TransactionFilter {
                member_id: Some(fx.member.id.clone()),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(for_member.len(), 1);
        assert_eq!(for_member[0].id, first.transaction.id);

        let purchases = engine
            .list(&TransactionFilter {
                transaction_type: Some(TransactionType::Purchase),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        assert!(purchases.is_empty());

        let future = engine
            .list(&TransactionFilter {
                from: Some(Utc::now() + chrono::Duration::days(1)),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        assert!(future.is_empty());

        let receipt = engine
            .get_by_code(&first.transaction.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.transaction.id, first.transaction.id);
        assert_eq!(receipt.items.len(), 1);
        assert!(engine.get_by_code("SL00000000DEADBEEF").await.unwrap().is_none());
    }

    #[test]
    fn test_deposit_item_name_fallbacks() {
        let category = GoldCategory::new("K24", "24 Karat", None, Money::zero(), Money::zero());
        assert_eq!(deposit_item_name(Some(&category), Some("99%")), "Gold deposit 24 Karat");
        assert_eq!(deposit_item_name(None, Some(" 70% ")), "Gold deposit 70%");
        assert_eq!(deposit_item_name(None, Some("")), "Gold deposit (uncategorized)");
        assert_eq!(deposit_item_name(None, None), "Gold deposit (uncategorized)");
    }

    // -------------------------------------------------------------------------
    // Concurrency (file-backed, several connections)
    // -------------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_of_one_piece_have_one_winner() {
        let fx = Fixture::file_backed().await;
        let stock = fx.receive(1).await.remove(0);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = fx.db.clone();
            let request = fx.sale_request(&[&stock.id], None);
            let user_id = fx.user_id.clone();
            handles.push(tokio::spawn(async move {
                db.transactions().create_sale(&request, &user_id).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(err) => assert!(err.is_conflict(), "unexpected error: {err:?}"),
            }
        }
        assert_eq!(winners, 1);

        let sales = fx.db.transactions().list(&TransactionFilter::default()).await.unwrap();
        assert_eq!(sales.len(), 1);
        let sold = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(sold.transaction_id.as_deref(), Some(sales[0].id.as_str()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sale_and_transfer_cannot_both_succeed() {
        let fx = Fixture::file_backed().await;
        let stock = fx.receive(1).await.remove(0);

        let sale = {
            let db = fx.db.clone();
            let request = fx.sale_request(&[&stock.id], None);
            let user_id = fx.user_id.clone();
            tokio::spawn(async move { db.transactions().create_sale(&request, &user_id).await })
        };
        let transfer = {
            let db = fx.db.clone();
            let request = TransferRequest {
                stock_id: stock.id.clone(),
                to_location_id: fx.location2.id.clone(),
                to_box_id: fx.box_b.id.clone(),
                notes: None,
            };
            let user_id = fx.user_id.clone();
            tokio::spawn(async move { db.transfers().transfer(&request, &user_id).await })
        };

        let sale = sale.await.unwrap();
        let transfer = transfer.await.unwrap();
        assert!(sale.is_ok() != transfer.is_ok(), "sale: {sale:?}, transfer: {transfer:?}");

        let after = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        match (sale, transfer) {
            (Ok(_), Err(err)) => {
                assert!(err.is_conflict());
                assert_eq!(after.status, StockStatus::Sold);
                assert_eq!(after.location_id, fx.location1.id);
            }
            (Err(err), Ok(_)) => {
                // Either the CAS lost, or the pre-pass already saw the new location
                assert!(
                    err.is_conflict()
                        || matches!(err, DbError::Domain(CoreError::StockNotInLocation { .. })),
                    "unexpected error: {err:?}"
                );
                assert_eq!(after.status, StockStatus::Available);
                assert_eq!(after.location_id, fx.location2.id);
            }
            _ => unreachable!(),
        }
    }
}
