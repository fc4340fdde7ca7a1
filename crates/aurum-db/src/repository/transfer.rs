//! # Transfer Repository
//!
//! Moves one available stock item to another location/box and records the
//! move.
//!
//! ```text
//!   Store 1 / Tray A                          Warehouse / Safe B
//!   ┌──────────────┐     transfer()           ┌──────────────┐
//!   │  0MGVB3K001  │ ───────────────────────► │  0MGVB3K001  │
//!   └──────────────┘                          └──────────────┘
//!          │
//!          └─► StockTransfer { from: Store 1/A, to: Warehouse/B, completed }
//! ```
//!
//! Status stays `available` throughout; only the placement changes. Every
//! call is a new transfer record.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::{fetch_location, fetch_storage_box};
use super::stock::fetch_stock;
use crate::error::{DbError, DbResult};
use aurum_core::codes;
use aurum_core::validation::validate_required;
use aurum_core::{CoreError, StockTransfer, TransferFilter, TransferRequest, TransferStatus};

const TRANSFER_SELECT: &str = "SELECT id, transfer_number, stock_id, from_location_id, from_box_id, \
     to_location_id, to_box_id, transferred_by, status, notes, transferred_at, created_at \
     FROM stock_transfers WHERE deleted_at IS NULL";

/// Repository for stock transfers.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new TransferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Moves an available stock item and records a completed transfer.
    ///
    /// ## Errors
    /// * `NotFound` - stock, destination location or destination box missing
    /// * `Conflict` - stock is not available, or changed concurrently
    /// * `Validation` - destination box is not in the destination location
    pub async fn transfer(&self, request: &TransferRequest, user_id: &str) -> DbResult<StockTransfer> {
        request.validate()?;
        validate_required("transferred_by", user_id)?;

        // Pre-pass: read-only checks through the pool
        let stock = fetch_stock(&self.pool, &request.stock_id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", &request.stock_id))?;
        if fetch_location(&self.pool, &request.to_location_id).await?.is_none() {
            return Err(DbError::not_found("Location", &request.to_location_id));
        }
        let to_box = fetch_storage_box(&self.pool, &request.to_box_id)
            .await?
            .ok_or_else(|| DbError::not_found("StorageBox", &request.to_box_id))?;

        if !stock.status.is_transferable() {
            return Err(CoreError::StockNotAvailable {
                serial_number: stock.serial_number,
                status: stock.status,
            }
            .into());
        }
        if !to_box.belongs_to(&request.to_location_id) {
            return Err(CoreError::BoxNotInLocation {
                box_id: to_box.id,
                location_id: request.to_location_id.clone(),
            }
            .into());
        }

        let now = Utc::now();
        let transfer = StockTransfer {
            id: Uuid::new_v4().to_string(),
            transfer_number: codes::transfer_number(now),
            stock_id: stock.id.clone(),
            from_location_id: stock.location_id.clone(),
            from_box_id: stock.storage_box_id.clone(),
            to_location_id: request.to_location_id.clone(),
            to_box_id: request.to_box_id.clone(),
            transferred_by: user_id.to_string(),
            status: TransferStatus::Completed,
            notes: request.notes.clone(),
            transferred_at: now,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        // CAS on status and the placement we validated against
        let moved = sqlx::query(
            r#"
            UPDATE stocks
            SET location_id = ?1, storage_box_id = ?2, updated_at = ?3
            WHERE id = ?4
              AND status = 'available'
              AND location_id = ?5
              AND storage_box_id = ?6
              AND deleted_at IS NULL
            "#,
        )
        .bind(&transfer.to_location_id)
        .bind(&transfer.to_box_id)
        .bind(now)
        .bind(&stock.id)
        .bind(&transfer.from_location_id)
        .bind(&transfer.from_box_id)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            warn!(stock_id = %stock.id, serial = %stock.serial_number, "Stock changed before transfer");
            return Err(CoreError::StockModified {
                serial_number: stock.serial_number,
            }
            .into());
        }

        debug!(id = %transfer.id, number = %transfer.transfer_number, "Inserting stock transfer");

        sqlx::query(
            r#"
            INSERT INTO stock_transfers (
                id, transfer_number, stock_id, from_location_id, from_box_id,
                to_location_id, to_box_id, transferred_by, status, notes,
                transferred_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.transfer_number)
        .bind(&transfer.stock_id)
        .bind(&transfer.from_location_id)
        .bind(&transfer.from_box_id)
        .bind(&transfer.to_location_id)
        .bind(&transfer.to_box_id)
        .bind(&transfer.transferred_by)
        .bind(transfer.status)
        .bind(&transfer.notes)
        .bind(transfer.transferred_at)
        .bind(transfer.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            transfer_number = %transfer.transfer_number,
            serial = %stock.serial_number,
            from_location = %transfer.from_location_id,
            to_location = %transfer.to_location_id,
            "Stock transferred"
        );
        Ok(transfer)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<StockTransfer>> {
        let sql = format!("{TRANSFER_SELECT} AND id = ?1");
        let transfer = sqlx::query_as::<_, StockTransfer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(transfer)
    }

    /// Lists transfers, newest first.
    pub async fn list(&self, filter: &TransferFilter) -> DbResult<Vec<StockTransfer>> {
        let sql = format!(
            "{TRANSFER_SELECT}
               AND (?1 IS NULL OR stock_id = ?1)
               AND (?2 IS NULL OR from_location_id = ?2)
               AND (?3 IS NULL OR to_location_id = ?3)
             ORDER BY transferred_at DESC, rowid DESC"
        );
        let transfers = sqlx::query_as::<_, StockTransfer>(&sql)
            .bind(&filter.stock_id)
            .bind(&filter.from_location_id)
            .bind(&filter.to_location_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(transfers)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;
    use aurum_core::{ErrorKind, StockStatus};

    fn request(stock_id: &str, to_location_id: &str, to_box_id: &str) -> TransferRequest {
        TransferRequest {
            stock_id: stock_id.to_string(),
            to_location_id: to_location_id.to_string(),
            to_box_id: to_box_id.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_transfer_moves_stock_and_records_origin() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);
        let transfers = fx.db.transfers();

        let moved = transfers
            .transfer(&request(&stock.id, &fx.location2.id, &fx.box_b.id), &fx.user_id)
            .await
            .unwrap();

        assert_eq!(moved.status, TransferStatus::Completed);
        assert_eq!(moved.from_location_id, fx.location1.id);
        assert_eq!(moved.from_box_id, fx.box_a.id);
        assert_eq!(moved.to_location_id, fx.location2.id);
        assert_eq!(moved.to_box_id, fx.box_b.id);
        assert!(moved.transfer_number.starts_with("TRF"));

        let after = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(after.location_id, fx.location2.id);
        assert_eq!(after.storage_box_id, fx.box_b.id);
        assert_eq!(after.status, StockStatus::Available);

        // Not idempotent: moving back is a second, independent transfer
        let back = transfers
            .transfer(&request(&stock.id, &fx.location1.id, &fx.box_a.id), &fx.user_id)
            .await
            .unwrap();
        assert_ne!(back.id, moved.id);
        assert_eq!(back.from_location_id, fx.location2.id);

        let history = transfers
            .list(&TransferFilter {
                stock_id: Some(stock.id.clone()),
                ..TransferFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, back.id);

        let fetched = transfers.get(&moved.id).await.unwrap().unwrap();
        assert_eq!(fetched.transfer_number, moved.transfer_number);
    }

    #[tokio::test]
    async fn test_transfer_missing_references() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);
        let transfers = fx.db.transfers();
        let ghost = Uuid::new_v4().to_string();

        let err = transfers
            .transfer(&request(&ghost, &fx.location2.id, &fx.box_b.id), &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = transfers
            .transfer(&request(&stock.id, &ghost, &fx.box_b.id), &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = transfers
            .transfer(&request(&stock.id, &fx.location2.id, &ghost), &fx.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_transfer_rejects_box_outside_destination() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);

        let err = fx
            .db
            .transfers()
            .transfer(&request(&stock.id, &fx.location2.id, &fx.box_a.id), &fx.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BoxNotInLocation { .. })));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let unchanged = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(unchanged.location_id, fx.location1.id);
    }

    #[tokio::test]
    async fn test_sold_stock_cannot_move() {
        let fx = Fixture::new().await;
        let stock = fx.receive(1).await.remove(0);
        fx.force_status(&stock.id, StockStatus::Sold).await;

        let err = fx
            .db
            .transfers()
            .transfer(&request(&stock.id, &fx.location2.id, &fx.box_b.id), &fx.user_id)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let history = fx.db.transfers().list(&TransferFilter::default()).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_chain_from_committed_placement() {
        let fx = Fixture::file_backed().await;
        let start = (fx.location1.id.clone(), fx.box_a.id.clone());
        let stock = fx.receive(1).await.remove(0);

        for _ in 0..5 {
            let records_before = fx
                .db
                .transfers()
                .list(&TransferFilter::default())
                .await
                .unwrap()
                .len();

            let mut handles = Vec::new();
            for i in 0..4 {
                let db = fx.db.clone();
                let user_id = fx.user_id.clone();
                let to = if i % 2 == 0 {
                    request(&stock.id, &fx.location2.id, &fx.box_b.id)
                } else {
                    request(&stock.id, &fx.location1.id, &fx.box_a.id)
                };
                handles.push(tokio::spawn(async move {
                    db.transfers().transfer(&to, &user_id).await
                }));
            }

            let mut winners = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => winners += 1,
                    // Validated against a placement that another transfer replaced
                    Err(err) => assert!(err.is_conflict(), "unexpected error: {err:?}"),
                }
            }
            assert!(winners >= 1);

            let records = fx
                .db
                .transfers()
                .list(&TransferFilter::default())
                .await
                .unwrap();
            assert_eq!(records.len(), records_before + winners);
        }

        // Replay the log in commit order: each move starts where the last ended.
        let moves: Vec<(String, String, String, String)> = sqlx::query_as(
            "SELECT from_location_id, from_box_id, to_location_id, to_box_id \
             FROM stock_transfers WHERE stock_id = ?1 ORDER BY rowid",
        )
        .bind(&stock.id)
        .fetch_all(fx.db.pool())
        .await
        .unwrap();
        assert!(moves.len() >= 5);

        let mut placement = start;
        for (from_location, from_box, to_location, to_box) in moves {
            assert_eq!((&from_location, &from_box), (&placement.0, &placement.1));
            placement = (to_location, to_box);
        }

        let after = fx.db.stocks().get(&stock.id).await.unwrap().unwrap();
        assert_eq!((after.location_id, after.storage_box_id), placement);
        assert_eq!(after.status, StockStatus::Available);
    }
}
