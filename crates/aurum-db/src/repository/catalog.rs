//! # Catalog Repository
//!
//! Reference data the ledger points at: gold categories (with their live
//! per-gram prices), products, locations and storage boxes.
//!
//! ```text
//! GoldCategory ◄── Product ◄── StockItem ──► StorageBox ──► Location
//!  (prices)        (weight)     (serial)      (tray)         (store/warehouse)
//! ```
//!
//! Category prices are never written here after creation; they change only
//! through [`PriceRepository::bulk_update`](super::price::PriceRepository::bulk_update).

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use super::unique_as;
use crate::error::{DbError, DbResult};
use aurum_core::validation::{validate_amount, validate_name, validate_optional_text, validate_weight};
use aurum_core::{GoldCategory, Location, LocationFilter, Product, StorageBox};

const GOLD_CATEGORY_SELECT: &str = "SELECT id, code, name, purity, buy_price_per_gram, \
     sell_price_per_gram, description, is_active, created_at, updated_at \
     FROM gold_categories WHERE deleted_at IS NULL";

const PRODUCT_SELECT: &str = "SELECT id, barcode, name, jewelry_type, gold_category_id, weight, \
     description, is_active, created_at, updated_at \
     FROM products WHERE deleted_at IS NULL";

const LOCATION_SELECT: &str = "SELECT id, code, name, location_type, address, is_active, \
     created_at, updated_at \
     FROM locations WHERE deleted_at IS NULL";

const STORAGE_BOX_SELECT: &str = "SELECT id, location_id, code, name, description, is_active, \
     created_at, updated_at \
     FROM storage_boxes WHERE deleted_at IS NULL";

// =============================================================================
// Shared lookups
// =============================================================================
// Usable with the pool (pre-pass) or inside an open transaction.

pub(crate) async fn fetch_gold_category<'e, E>(executor: E, id: &str) -> DbResult<Option<GoldCategory>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{GOLD_CATEGORY_SELECT} AND id = ?1");
    let category = sqlx::query_as::<_, GoldCategory>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(category)
}

pub(crate) async fn fetch_active_gold_categories<'e, E>(executor: E) -> DbResult<Vec<GoldCategory>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{GOLD_CATEGORY_SELECT} AND is_active = 1 ORDER BY code");
    let categories = sqlx::query_as::<_, GoldCategory>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(categories)
}

pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{PRODUCT_SELECT} AND id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(product)
}

pub(crate) async fn fetch_location<'e, E>(executor: E, id: &str) -> DbResult<Option<Location>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{LOCATION_SELECT} AND id = ?1");
    let location = sqlx::query_as::<_, Location>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(location)
}

pub(crate) async fn fetch_storage_box<'e, E>(executor: E, id: &str) -> DbResult<Option<StorageBox>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{STORAGE_BOX_SELECT} AND id = ?1");
    let storage_box = sqlx::query_as::<_, StorageBox>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(storage_box)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reference data.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
/// catalog.create_gold_category(&GoldCategory::new("K24", "24 Karat", None, buy, sell)).await?;
/// let active = catalog.list_gold_categories(true).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Gold categories
    // -------------------------------------------------------------------------

    /// Inserts a gold category.
    ///
    /// ## Errors
    /// * `UniqueViolation` - an active category already uses `code`
    pub async fn create_gold_category(&self, category: &GoldCategory) -> DbResult<()> {
        validate_name("code", &category.code, 20)?;
        validate_name("name", &category.name, 100)?;
        validate_optional_text("purity", category.purity.as_deref(), 50)?;
        validate_amount("buy_price_per_gram", category.buy_price_per_gram)?;
        validate_amount("sell_price_per_gram", category.sell_price_per_gram)?;

        debug!(id = %category.id, code = %category.code, "Inserting gold category");

        sqlx::query(
            r#"
            INSERT INTO gold_categories (
                id, code, name, purity, buy_price_per_gram, sell_price_per_gram,
                description, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&category.id)
        .bind(&category.code)
        .bind(&category.name)
        .bind(&category.purity)
        .bind(category.buy_price_per_gram)
        .bind(category.sell_price_per_gram)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unique_as("code", &category.code))?;

        Ok(())
    }

    /// Gets a gold category by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(GoldCategory))` - found
    /// * `Ok(None)` - missing or soft-deleted
    pub async fn get_gold_category(&self, id: &str) -> DbResult<Option<GoldCategory>> {
        fetch_gold_category(&self.pool, id).await
    }

    /// Lists gold categories ordered by code.
    pub async fn list_gold_categories(&self, active_only: bool) -> DbResult<Vec<GoldCategory>> {
        if active_only {
            return fetch_active_gold_categories(&self.pool).await;
        }

        let sql = format!("{GOLD_CATEGORY_SELECT} ORDER BY code");
        let categories = sqlx::query_as::<_, GoldCategory>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Inserts a product design.
    ///
    /// ## Errors
    /// * `NotFound` - the gold category does not exist
    /// * `UniqueViolation` - the barcode is taken
    pub async fn create_product(&self, product: &Product) -> DbResult<()> {
        validate_name("barcode", &product.barcode, 50)?;
        validate_name("name", &product.name, 100)?;
        validate_weight("weight", product.weight)?;

        if fetch_gold_category(&self.pool, &product.gold_category_id).await?.is_none() {
            return Err(DbError::not_found("GoldCategory", &product.gold_category_id));
        }

        debug!(id = %product.id, barcode = %product.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, barcode, name, jewelry_type, gold_category_id, weight,
                description, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.jewelry_type)
        .bind(&product.gold_category_id)
        .bind(product.weight)
        .bind(&product.description)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unique_as("barcode", &product.barcode))?;

        Ok(())
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    // -------------------------------------------------------------------------
    // Locations
    // -------------------------------------------------------------------------

    /// Inserts a warehouse or store.
    pub async fn create_location(&self, location: &Location) -> DbResult<()> {
        validate_name("code", &location.code, 20)?;
        validate_name("name", &location.name, 100)?;
        validate_optional_text("address", location.address.as_deref(), 500)?;

        debug!(id = %location.id, code = %location.code, "Inserting location");

        sqlx::query(
            r#"
            INSERT INTO locations (
                id, code, name, location_type, address, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&location.id)
        .bind(&location.code)
        .bind(&location.name)
        .bind(location.location_type)
        .bind(&location.address)
        .bind(location.is_active)
        .bind(location.created_at)
        .bind(location.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unique_as("code", &location.code))?;

        Ok(())
    }

    pub async fn get_location(&self, id: &str) -> DbResult<Option<Location>> {
        fetch_location(&self.pool, id).await
    }

    /// Lists locations ordered by code.
    pub async fn list_locations(&self, filter: &LocationFilter) -> DbResult<Vec<Location>> {
        let sql = format!("{LOCATION_SELECT} AND (?1 IS NULL OR location_type = ?1) ORDER BY code");
        let locations = sqlx::query_as::<_, Location>(&sql)
            .bind(filter.location_type)
            .fetch_all(&self.pool)
            .await?;
        Ok(locations)
    }

    // -------------------------------------------------------------------------
    // Storage boxes
    // -------------------------------------------------------------------------

    /// Inserts a storage box.
    ///
    /// ## Errors
    /// * `NotFound` - the location does not exist
    /// * `UniqueViolation` - the code is taken within that location
    pub async fn create_storage_box(&self, storage_box: &StorageBox) -> DbResult<()> {
        validate_name("code", &storage_box.code, 20)?;
        validate_name("name", &storage_box.name, 100)?;

        if fetch_location(&self.pool, &storage_box.location_id).await?.is_none() {
            return Err(DbError::not_found("Location", &storage_box.location_id));
        }

        debug!(
            id = %storage_box.id,
            location_id = %storage_box.location_id,
            code = %storage_box.code,
            "Inserting storage box"
        );

        sqlx::query(
            r#"
            INSERT INTO storage_boxes (
                id, location_id, code, name, description, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&storage_box.id)
        .bind(&storage_box.location_id)
        .bind(&storage_box.code)
        .bind(&storage_box.name)
        .bind(&storage_box.description)
        .bind(storage_box.is_active)
        .bind(storage_box.created_at)
        .bind(storage_box.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unique_as("code", &storage_box.code))?;

        Ok(())
    }

    pub async fn get_storage_box(&self, id: &str) -> DbResult<Option<StorageBox>> {
        fetch_storage_box(&self.pool, id).await
    }

    /// Boxes of one location ordered by code.
    pub async fn list_storage_boxes(&self, location_id: &str) -> DbResult<Vec<StorageBox>> {
        let sql = format!("{STORAGE_BOX_SELECT} AND location_id = ?1 ORDER BY code");
        let boxes = sqlx::query_as::<_, StorageBox>(&sql)
            .bind(location_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(boxes)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
