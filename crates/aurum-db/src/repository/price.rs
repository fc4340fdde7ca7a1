//! # Price Revision Repository
//!
//! Gold prices change only here, in batches, each batch leaving an audit
//! trail.
//!
//! ```text
//!   PriceRevisionRequest
//!   ├── K24: buy 450.000 → 455.000, sell 500.000 → 510.000
//!   └── K22: buy 410.000 → 415.000, sell 460.000 → 468.000
//!            │
//!            ▼  one unit of work
//!   price_update_logs  (1 row: who, when, notes)
//!   price_details      (1 row per category: old/new buy, old/new sell)
//!   gold_categories    (live prices updated)
//! ```
//!
//! Stock prices are never stored, so a revision reprices every piece of
//! the category at once.

use chrono::{DateTime, FixedOffset, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::catalog::{fetch_active_gold_categories, fetch_gold_category};
use crate::error::{DbError, DbResult};
use aurum_core::validation::validate_required;
use aurum_core::{PriceDetail, PriceRevision, PriceRevisionRequest, PriceUpdateLog, PriceUpdateStatus};

/// Default page size of [`PriceRepository::list_logs`].
pub const DEFAULT_LOG_LIMIT: u32 = 50;

const LOG_SELECT: &str =
    "SELECT id, updated_by, notes, update_date, created_at FROM price_update_logs";

const DETAIL_SELECT: &str = "SELECT id, log_id, gold_category_id, old_buy_price, new_buy_price, \
     old_sell_price, new_sell_price, created_at FROM price_details";

/// Repository for price revisions.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: SqlitePool,
}

impl PriceRepository {
    /// Creates a new PriceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PriceRepository { pool }
    }

    /// Applies a batch of price changes all-or-nothing.
    ///
    /// ## Errors
    /// * `Validation` - empty batch, negative price, category listed twice
    /// * `NotFound` - an entry names a missing category; nothing is applied
    pub async fn bulk_update(
        &self,
        request: &PriceRevisionRequest,
        user_id: &str,
    ) -> DbResult<PriceRevision> {
        request.validate()?;
        validate_required("updated_by", user_id)?;

        let now = Utc::now();
        let log = PriceUpdateLog {
            id: Uuid::new_v4().to_string(),
            updated_by: user_id.to_string(),
            notes: request.notes.clone(),
            update_date: now,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO price_update_logs (id, updated_by, notes, update_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&log.id)
        .bind(&log.updated_by)
        .bind(&log.notes)
        .bind(log.update_date)
        .bind(log.created_at)
        .execute(&mut *tx)
        .await?;

        let mut details = Vec::with_capacity(request.entries.len());
        for entry in &request.entries {
            let category = fetch_gold_category(&mut *tx, &entry.gold_category_id)
                .await?
                .ok_or_else(|| DbError::not_found("GoldCategory", &entry.gold_category_id))?;

            let detail = PriceDetail {
                id: Uuid::new_v4().to_string(),
                log_id: log.id.clone(),
                gold_category_id: category.id.clone(),
                old_buy_price: category.buy_price_per_gram,
                new_buy_price: entry.new_buy_price,
                old_sell_price: category.sell_price_per_gram,
                new_sell_price: entry.new_sell_price,
                created_at: now,
            };

            debug!(
                category = %category.code,
                buy = %detail.new_buy_price,
                sell = %detail.new_sell_price,
                "Revising gold price"
            );

            sqlx::query(
                r#"
                INSERT INTO price_details (
                    id, log_id, gold_category_id, old_buy_price, new_buy_price,
                    old_sell_price, new_sell_price, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&detail.id)
            .bind(&detail.log_id)
            .bind(&detail.gold_category_id)
            .bind(detail.old_buy_price)
            .bind(detail.new_buy_price)
            .bind(detail.old_sell_price)
            .bind(detail.new_sell_price)
            .bind(detail.created_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE gold_categories
                SET buy_price_per_gram = ?1, sell_price_per_gram = ?2, updated_at = ?3
                WHERE id = ?4
                "#,
            )
            .bind(detail.new_buy_price)
            .bind(detail.new_sell_price)
            .bind(now)
            .bind(&category.id)
            .execute(&mut *tx)
            .await?;

            details.push(detail);
        }

        tx.commit().await?;

        info!(log_id = %log.id, categories = details.len(), "Gold prices revised");
        Ok(PriceRevision { log, details })
    }

    /// Whether no revision has been made yet on the store's current
    /// calendar day. Advisory only; nothing blocks on it.
    pub async fn needs_update_today(
        &self,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> DbResult<PriceUpdateStatus> {
        let sql = format!("{LOG_SELECT} ORDER BY created_at DESC, rowid DESC LIMIT 1");
        let last_update = sqlx::query_as::<_, PriceUpdateLog>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        let today = now.with_timezone(&offset).date_naive();
        let needs_update = match &last_update {
            Some(log) => log.created_at.with_timezone(&offset).date_naive() != today,
            None => true,
        };

        let categories = fetch_active_gold_categories(&self.pool).await?;

        Ok(PriceUpdateStatus {
            needs_update,
            last_update,
            categories,
        })
    }

    /// Most recent revisions with their details, newest first.
    pub async fn list_logs(&self, limit: u32) -> DbResult<Vec<PriceRevision>> {
        let sql = format!("{LOG_SELECT} ORDER BY created_at DESC, rowid DESC LIMIT ?1");
        let logs = sqlx::query_as::<_, PriceUpdateLog>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut revisions = Vec::with_capacity(logs.len());
        for log in logs {
            let details = self.details_of(&log.id).await?;
            revisions.push(PriceRevision { log, details });
        }
        Ok(revisions)
    }

    pub async fn get_log(&self, id: &str) -> DbResult<Option<PriceRevision>> {
        let sql = format!("{LOG_SELECT} WHERE id = ?1");
        let log = sqlx::query_as::<_, PriceUpdateLog>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match log {
            Some(log) => {
                let details = self.details_of(&log.id).await?;
                Ok(Some(PriceRevision { log, details }))
            }
            None => Ok(None),
        }
    }

    async fn details_of(&self, log_id: &str) -> DbResult<Vec<PriceDetail>> {
        let sql = format!("{DETAIL_SELECT} WHERE log_id = ?1 ORDER BY rowid");
        let details = sqlx::query_as::<_, PriceDetail>(&sql)
            .bind(log_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(details)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
