//! # Raw Material Repository
//!
//! Unprocessed gold held by the store: booked by a purchase or received
//! directly from a supplier.
//!
//! ```text
//!   available ──► processed ──► sold
//!       │                        ▲
//!       └────────────────────────┘
//! ```
//! Only `available` raw material may be corrected or soft-deleted.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::{fetch_gold_category, fetch_location};
use super::unique_as;
use crate::error::{DbError, DbResult};
use aurum_core::codes;
use aurum_core::pricing::purchase_line_total;
use aurum_core::validation::validate_required;
use aurum_core::{
    CoreError, NewRawMaterial, RawMaterial, RawMaterialFilter, RawMaterialStatus, RawMaterialUpdate,
    ValidationError,
};

const RAW_MATERIAL_SELECT: &str = "SELECT id, code, gold_category_id, location_id, weight_gross, \
     weight, shrinkage_percent, purity, buy_price_per_gram, total_buy_price, condition, status, \
     supplier_name, member_id, transaction_id, received_by, received_at, processed_at, notes, \
     created_at, updated_at \
     FROM raw_materials WHERE deleted_at IS NULL";

/// Inserts one raw material row on an open connection or transaction.
pub(crate) async fn insert_raw_material(
    conn: &mut SqliteConnection,
    material: &RawMaterial,
) -> DbResult<()> {
    debug!(
        id = %material.id,
        code = %material.code,
        weight = %material.weight,
        "Inserting raw material"
    );

    sqlx::query(
        r#"
        INSERT INTO raw_materials (
            id, code, gold_category_id, location_id, weight_gross, weight,
            shrinkage_percent, purity, buy_price_per_gram, total_buy_price,
            condition, status, supplier_name, member_id, transaction_id,
            received_by, received_at, processed_at, notes, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20, ?21
        )
        "#,
    )
    .bind(&material.id)
    .bind(&material.code)
    .bind(&material.gold_category_id)
    .bind(&material.location_id)
    .bind(material.weight_gross)
    .bind(material.weight)
    .bind(material.shrinkage_percent)
    .bind(&material.purity)
    .bind(material.buy_price_per_gram)
    .bind(material.total_buy_price)
    .bind(material.condition)
    .bind(material.status)
    .bind(&material.supplier_name)
    .bind(&material.member_id)
    .bind(&material.transaction_id)
    .bind(&material.received_by)
    .bind(material.received_at)
    .bind(material.processed_at)
    .bind(&material.notes)
    .bind(material.created_at)
    .bind(material.updated_at)
    .execute(conn)
    .await
    .map_err(unique_as("code", &material.code))?;

    Ok(())
}

/// Repository for raw material.
#[derive(Debug, Clone)]
pub struct RawMaterialRepository {
    pool: SqlitePool,
}

impl RawMaterialRepository {
    /// Creates a new RawMaterialRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RawMaterialRepository { pool }
    }

    /// Receives raw material outside a purchase.
    ///
    /// Gross weight defaults to the net weight; purity defaults to the
    /// category's.
    pub async fn create(&self, request: &NewRawMaterial, user_id: &str) -> DbResult<RawMaterial> {
        request.validate()?;
        validate_required("received_by", user_id)?;

        if fetch_location(&self.pool, &request.location_id).await?.is_none() {
            return Err(DbError::not_found("Location", &request.location_id));
        }
        let category = match &request.gold_category_id {
            Some(id) => Some(
                fetch_gold_category(&self.pool, id)
                    .await?
                    .ok_or_else(|| DbError::not_found("GoldCategory", id))?,
            ),
            None => None,
        };

        let total_buy_price = purchase_line_total(request.weight, request.buy_price_per_gram)?;

        let now = Utc::now();
        let weight_gross = if request.weight_gross.is_zero() {
            request.weight
        } else {
            request.weight_gross
        };

        let material = RawMaterial {
            id: Uuid::new_v4().to_string(),
            code: codes::raw_material_code(now),
            gold_category_id: request.gold_category_id.clone(),
            location_id: request.location_id.clone(),
            weight_gross,
            weight: request.weight,
            shrinkage_percent: request.shrinkage_percent,
            purity: request
                .purity
                .clone()
                .or_else(|| category.and_then(|c| c.purity)),
            buy_price_per_gram: request.buy_price_per_gram,
            total_buy_price,
            condition: request.condition,
            status: RawMaterialStatus::Available,
            supplier_name: request.supplier_name.clone(),
            member_id: None,
            transaction_id: None,
            received_by: user_id.to_string(),
            received_at: now,
            processed_at: None,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.pool.acquire().await?;
        insert_raw_material(&mut conn, &material).await?;

        info!(code = %material.code, weight = %material.weight, "Raw material received");
        Ok(material)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<RawMaterial>> {
        let sql = format!("{RAW_MATERIAL_SELECT} AND id = ?1");
        let material = sqlx::query_as::<_, RawMaterial>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(material)
    }

    /// Lists raw material, newest first.
    pub async fn list(&self, filter: &RawMaterialFilter) -> DbResult<Vec<RawMaterial>> {
        let sql = format!(
            "{RAW_MATERIAL_SELECT}
               AND (?1 IS NULL OR location_id = ?1)
               AND (?2 IS NULL OR status = ?2)
             ORDER BY received_at DESC, rowid DESC"
        );
        let materials = sqlx::query_as::<_, RawMaterial>(&sql)
            .bind(&filter.location_id)
            .bind(filter.status)
            .fetch_all(&self.pool)
            .await?;
        Ok(materials)
    }

    /// Moves raw material forward to `processed` or `sold`.
    ///
    /// ## Errors
    /// * `NotFound` - no such raw material
    /// * `Conflict` - the transition is not allowed from the current status
    pub async fn update_status(&self, id: &str, next: RawMaterialStatus) -> DbResult<RawMaterial> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("RawMaterial", id))?;

        if !current.status.can_transition_to(next) {
            return Err(CoreError::RawMaterialNotAvailable {
                code: current.code,
                status: current.status,
            }
            .into());
        }

        let now = Utc::now();
        let processed_at = match next {
            RawMaterialStatus::Processed => Some(now),
            _ => current.processed_at,
        };

        let result = sqlx::query(
            r#"
            UPDATE raw_materials
            SET status = ?1, processed_at = ?2, updated_at = ?3
            WHERE id = ?4 AND status = ?5 AND deleted_at IS NULL
            "#,
        )
        .bind(next)
        .bind(processed_at)
        .bind(now)
        .bind(&current.id)
        .bind(current.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(code = %current.code, "Raw material changed before status update");
            return Err(CoreError::RawMaterialNotAvailable {
                code: current.code,
                status: current.status,
            }
            .into());
        }

        info!(code = %current.code, from = %current.status, to = %next, "Raw material status changed");
        Ok(RawMaterial {
            status: next,
            processed_at,
            updated_at: now,
            ..current
        })
    }

    /// Corrects an `available` lot's weights, price, grading or placement.
    ///
    /// `total_buy_price` is recomputed from the resulting net weight and
    /// per-gram price, so the stored total never drifts from its inputs.
    ///
    /// ## Errors
    /// * `NotFound` - raw material, new location or new category missing
    /// * `Validation` - net heavier than gross, or the total is out of range
    /// * `Conflict` - not `available`, or changed concurrently
    pub async fn update(&self, id: &str, changes: &RawMaterialUpdate) -> DbResult<RawMaterial> {
        changes.validate()?;

        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("RawMaterial", id))?;

        if current.status != RawMaterialStatus::Available {
            return Err(CoreError::RawMaterialNotAvailable {
                code: current.code,
                status: current.status,
            }
            .into());
        }
        if let Some(location_id) = &changes.location_id {
            if fetch_location(&self.pool, location_id).await?.is_none() {
                return Err(DbError::not_found("Location", location_id));
            }
        }
        if let Some(category_id) = &changes.gold_category_id {
            if fetch_gold_category(&self.pool, category_id).await?.is_none() {
                return Err(DbError::not_found("GoldCategory", category_id));
            }
        }

        let weight = changes.weight.unwrap_or(current.weight);
        let weight_gross = changes.weight_gross.unwrap_or(current.weight_gross);
        if weight > weight_gross {
            return Err(ValidationError::OutOfRange {
                field: "weight".to_string(),
                min: 1,
                max: weight_gross.milligrams(),
            }
            .into());
        }
        let buy_price_per_gram = changes.buy_price_per_gram.unwrap_or(current.buy_price_per_gram);
        let total_buy_price = purchase_line_total(weight, buy_price_per_gram)?;

        let updated = RawMaterial {
            location_id: changes.location_id.clone().unwrap_or(current.location_id.clone()),
            gold_category_id: changes
                .gold_category_id
                .clone()
                .or(current.gold_category_id.clone()),
            weight_gross,
            weight,
            shrinkage_percent: changes.shrinkage_percent.unwrap_or(current.shrinkage_percent),
            purity: changes.purity.clone().or(current.purity.clone()),
            buy_price_per_gram,
            total_buy_price,
            condition: changes.condition.unwrap_or(current.condition),
            supplier_name: changes.supplier_name.clone().or(current.supplier_name.clone()),
            notes: changes.notes.clone().or(current.notes.clone()),
            updated_at: Utc::now(),
            ..current.clone()
        };

        let result = sqlx::query(
            r#"
            UPDATE raw_materials
            SET location_id = ?1, gold_category_id = ?2, weight_gross = ?3, weight = ?4,
                shrinkage_percent = ?5, purity = ?6, buy_price_per_gram = ?7,
                total_buy_price = ?8, condition = ?9, supplier_name = ?10, notes = ?11,
                updated_at = ?12
            WHERE id = ?13 AND status = 'available' AND deleted_at IS NULL
            "#,
        )
        .bind(&updated.location_id)
        .bind(&updated.gold_category_id)
        .bind(updated.weight_gross)
        .bind(updated.weight)
        .bind(updated.shrinkage_percent)
        .bind(&updated.purity)
        .bind(updated.buy_price_per_gram)
        .bind(updated.total_buy_price)
        .bind(updated.condition)
        .bind(&updated.supplier_name)
        .bind(&updated.notes)
        .bind(updated.updated_at)
        .bind(&updated.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(code = %current.code, "Raw material changed before update");
            return Err(CoreError::RawMaterialNotAvailable {
                code: current.code,
                status: current.status,
            }
            .into());
        }

        info!(
            code = %updated.code,
            weight = %updated.weight,
            total = %updated.total_buy_price,
            "Raw material updated"
        );
        Ok(updated)
    }

    /// Soft-deletes raw material that is still `available`.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("RawMaterial", id))?;

        if current.status != RawMaterialStatus::Available {
            return Err(CoreError::RawMaterialNotAvailable {
                code: current.code,
                status: current.status,
            }
            .into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE raw_materials
            SET deleted_at = ?1, updated_at = ?1
            WHERE id = ?2 AND status = 'available' AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(&current.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(code = %current.code, "Raw material changed before delete");
            return Err(CoreError::RawMaterialNotAvailable {
                code: current.code,
                status: current.status,
            }
            .into());
        }

        debug!(code = %current.code, "Raw material deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;
    use aurum_core::{ErrorKind, Money, Rate, RawMaterialCondition, Weight};

    fn new_material(fx: &Fixture, category: bool) -> NewRawMaterial {
        NewRawMaterial {
            location_id: fx.location2.id.clone(),
            gold_category_id: category.then(|| fx.category.id.clone()),
            weight_gross: Weight::zero(),
            shrinkage_percent: Rate::zero(),
            weight: Weight::from_milligrams(10_500),
            purity: None,
            buy_price_per_gram: Money::from_rupiah(440_000),
            condition: RawMaterialCondition::Damaged,
            supplier_name: Some("PT Logam Mulia".into()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_direct_receipt_defaults() {
        let fx = Fixture::new().await;
        let material = fx
            .db
            .raw_materials()
            .create(&new_material(&fx, true), &fx.user_id)
            .await
            .unwrap();

        assert!(material.code.starts_with("RM"));
        assert_eq!(material.weight_gross, material.weight);
        assert_eq!(material.total_buy_price, Money::from_rupiah(4_620_000));
        assert_eq!(material.purity, fx.category.purity);
        assert_eq!(material.status, RawMaterialStatus::Available);
        assert!(material.transaction_id.is_none());

        let stored = fx.db.raw_materials().get(&material.id).await.unwrap().unwrap();
        assert_eq!(stored.code, material.code);
        assert_eq!(stored.condition, RawMaterialCondition::Damaged);
    }

    #[tokio::test]
    async fn test_receipt_requires_known_references() {
        let fx = Fixture::new().await;
        let raw = fx.db.raw_materials();

        let mut request = new_material(&fx, false);
        request.location_id = Uuid::new_v4().to_string();
        let err = raw.create(&request, &fx.user_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let mut request = new_material(&fx, false);
        request.gold_category_id = Some(Uuid::new_v4().to_string());
        let err = raw.create(&request, &fx.user_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_status_moves_forward_only() {
        let fx = Fixture::new().await;
        let raw = fx.db.raw_materials();
        let material = raw.create(&new_material(&fx, false), &fx.user_id).await.unwrap();

        let processed = raw
            .update_status(&material.id, RawMaterialStatus::Processed)
            .await
            .unwrap();
        assert_eq!(processed.status, RawMaterialStatus::Processed);
        assert!(processed.processed_at.is_some());

        let err = raw
            .update_status(&material.id, RawMaterialStatus::Available)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let sold = raw.update_status(&material.id, RawMaterialStatus::Sold).await.unwrap();
        assert_eq!(sold.status, RawMaterialStatus::Sold);
        assert!(sold.processed_at.is_some());

        let stored = raw.get(&material.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RawMaterialStatus::Sold);
        assert!(stored.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_soft_delete_only_while_available() {
        let fx = Fixture::new().await;
        let raw = fx.db.raw_materials();
        let kept = raw.create(&new_material(&fx, false), &fx.user_id).await.unwrap();
        let dropped = raw.create(&new_material(&fx, false), &fx.user_id).await.unwrap();

        raw.update_status(&kept.id, RawMaterialStatus::Sold).await.unwrap();
        let err = raw.soft_delete(&kept.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RawMaterialNotAvailable { .. })));

        raw.soft_delete(&dropped.id).await.unwrap();
        assert!(raw.get(&dropped.id).await.unwrap().is_none());

        let err = raw.soft_delete(&dropped.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let fx = Fixture::new().await;
        let raw = fx.db.raw_materials();
        let first = raw.create(&new_material(&fx, false), &fx.user_id).await.unwrap();
        let second = raw.create(&new_material(&fx, false), &fx.user_id).await.unwrap();
        raw.update_status(&first.id, RawMaterialStatus::Processed).await.unwrap();

        let available = raw
            .list(&RawMaterialFilter {
                status: Some(RawMaterialStatus::Available),
                ..RawMaterialFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, second.id);

        let elsewhere = raw
            .list(&RawMaterialFilter {
                location_id: Some(fx.location1.id.clone()),
                ..RawMaterialFilter::default()
            })
            .await
            .unwrap();
        assert!(elsewhere.is_empty());

        let all = raw.list(&RawMaterialFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_recomputes_total() {
        let fx = Fixture::new().await;
        let raw = fx.db.raw_materials();
        let material = raw.create(&new_material(&fx, false), &fx.user_id).await.unwrap();

        // Re-weighed at the workshop: 10.5 g gross, 9.8 g net.
        let weighed = raw
            .update(
                &material.id,
                &RawMaterialUpdate {
                    weight: Some(Weight::from_milligrams(9_800)),
                    condition: Some(RawMaterialCondition::Scratched),
                    ..RawMaterialUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(weighed.weight_gross, Weight::from_milligrams(10_500));
        assert_eq!(weighed.total_buy_price, Money::from_rupiah(4_312_000));

        let repriced = raw
            .update(
                &material.id,
                &RawMaterialUpdate {
                    buy_price_per_gram: Some(Money::from_rupiah(450_000)),
                    location_id: Some(fx.location1.id.clone()),
                    gold_category_id: Some(fx.category.id.clone()),
                    ..RawMaterialUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(repriced.total_buy_price, Money::from_rupiah(4_410_000));

        let stored = raw.get(&material.id).await.unwrap().unwrap();
        assert_eq!(stored.weight, Weight::from_milligrams(9_800));
        assert_eq!(stored.buy_price_per_gram, Money::from_rupiah(450_000));
        assert_eq!(stored.total_buy_price, stored.buy_price_per_gram.for_weight(stored.weight));
        assert_eq!(stored.condition, RawMaterialCondition::Scratched);
        assert_eq!(stored.location_id, fx.location1.id);
        assert_eq!(stored.gold_category_id.as_deref(), Some(fx.category.id.as_str()));
        assert_eq!(stored.supplier_name.as_deref(), Some("PT Logam Mulia"));
    }

    #[tokio::test]
    async fn test_update_rejections() {
        let fx = Fixture::new().await;
        let raw = fx.db.raw_materials();
        let material = raw.create(&new_material(&fx, false), &fx.user_id).await.unwrap();

        // Net heavier than the stored gross
        let err = raw
            .update(
                &material.id,
                &RawMaterialUpdate {
                    weight: Some(Weight::from_milligrams(11_000)),
                    ..RawMaterialUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = raw
            .update(
                &material.id,
                &RawMaterialUpdate {
                    location_id: Some(Uuid::new_v4().to_string()),
                    ..RawMaterialUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        raw.update_status(&material.id, RawMaterialStatus::Processed).await.unwrap();
        let err = raw
            .update(
                &material.id,
                &RawMaterialUpdate {
                    notes: Some("melted".into()),
                    ..RawMaterialUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = raw.get(&material.id).await.unwrap().unwrap();
        assert_eq!(stored.weight, material.weight);
        assert_eq!(stored.total_buy_price, material.total_buy_price);
        assert!(stored.notes.is_none());
    }
}
