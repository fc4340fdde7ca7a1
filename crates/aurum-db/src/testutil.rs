//! Shared test fixtures.
//!
//! ```text
//!   K24 (buy 450.000 / sell 500.000 per gram)
//!    └── Ring RG-001, 2 g  → sells for 1.000.000
//!
//!   STORE1 (store)      WH1 (warehouse)
//!    └── Tray A          └── Safe B
//! ```

use std::path::PathBuf;

use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use aurum_core::{
    GoldCategory, Location, LocationType, Member, Money, NewMember, PaymentMethod, PriceEntry,
    PriceRevisionRequest, Product, Rate, ReceiveStockRequest, SaleLine, SaleRequest, StockItem,
    StockStatus, StorageBox, TransactionDetail, Weight,
};

pub(crate) struct Fixture {
    pub db: Database,
    pub category: GoldCategory,
    pub product: Product,
    pub location1: Location,
    pub box_a: StorageBox,
    pub location2: Location,
    pub box_b: StorageBox,
    pub member: Member,
    pub user_id: String,
    file: Option<PathBuf>,
}

impl Fixture {
    /// Seeded in-memory database.
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Self::seed(db, None).await
    }

    /// Seeded database on a temporary file with several connections, for
    /// tests where writers really race.
    pub async fn file_backed() -> Self {
        let path = std::env::temp_dir().join(format!("aurum-test-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();
        Self::seed(db, Some(path)).await
    }

    async fn seed(db: Database, file: Option<PathBuf>) -> Self {
        let catalog = db.catalog();

        let category = GoldCategory::new(
            "K24",
            "24 Karat",
            Some("99.9%".into()),
            Money::from_rupiah(450_000),
            Money::from_rupiah(500_000),
        );
        catalog.create_gold_category(&category).await.unwrap();

        let product = Product::new("RG-001", "Plain ring", category.id.clone(), Weight::from_grams(2));
        catalog.create_product(&product).await.unwrap();

        let location1 = Location::new("STORE1", "Main store", LocationType::Store);
        catalog.create_location(&location1).await.unwrap();
        let box_a = StorageBox::new(location1.id.clone(), "A", "Tray A");
        catalog.create_storage_box(&box_a).await.unwrap();

        let location2 = Location::new("WH1", "Back warehouse", LocationType::Warehouse);
        catalog.create_location(&location2).await.unwrap();
        let box_b = StorageBox::new(location2.id.clone(), "B", "Safe B");
        catalog.create_storage_box(&box_b).await.unwrap();

        let member = db
            .members()
            .create(&NewMember {
                name: "Siti Rahma".into(),
                phone: Some("0812000111".into()),
                email: None,
                address: None,
                id_number: None,
            })
            .await
            .unwrap();

        Fixture {
            db,
            category,
            product,
            location1,
            box_a,
            location2,
            box_b,
            member,
            user_id: "cashier-1".to_string(),
            file,
        }
    }

    /// Receives `quantity` pieces of the ring into STORE1 / Tray A.
    pub async fn receive(&self, quantity: u32) -> Vec<StockItem> {
        self.db
            .stocks()
            .receive(&ReceiveStockRequest {
                product_id: self.product.id.clone(),
                location_id: self.location1.id.clone(),
                storage_box_id: self.box_a.id.clone(),
                quantity,
                supplier_name: None,
                notes: None,
            })
            .await
            .unwrap()
    }

    /// Bypasses the engines to put a stock row into any status.
    pub async fn force_status(&self, stock_id: &str, status: StockStatus) {
        sqlx::query("UPDATE stocks SET status = ?1 WHERE id = ?2")
            .bind(status)
            .bind(stock_id)
            .execute(self.db.pool())
            .await
            .unwrap();
    }

    /// Cash sale at STORE1 paying exactly 1.000.000 per piece.
    pub fn sale_request<S: AsRef<str>>(&self, stock_ids: &[S], member_id: Option<&str>) -> SaleRequest {
        SaleRequest {
            location_id: self.location1.id.clone(),
            member_id: member_id.map(str::to_string),
            customer_name: None,
            customer_phone: None,
            items: stock_ids
                .iter()
                .map(|id| SaleLine {
                    stock_id: id.as_ref().to_string(),
                    discount: Money::zero(),
                    notes: None,
                })
                .collect(),
            discount: Money::zero(),
            discount_percent: Rate::zero(),
            tax: Money::zero(),
            payment_method: PaymentMethod::Cash,
            paid_amount: Money::from_rupiah(1_000_000) * stock_ids.len() as i64,
            notes: None,
        }
    }

    pub async fn sell(&self, stock_id: &str, member_id: Option<&str>) -> TransactionDetail {
        self.db
            .transactions()
            .create_sale(&self.sale_request(&[stock_id], member_id), &self.user_id)
            .await
            .unwrap()
    }

    /// Revises the K24 sell price, leaving the buy price as seeded.
    pub async fn set_sell_price(&self, sell: Money) {
        self.db
            .prices()
            .bulk_update(
                &PriceRevisionRequest {
                    entries: vec![PriceEntry {
                        gold_category_id: self.category.id.clone(),
                        new_buy_price: self.category.buy_price_per_gram,
                        new_sell_price: sell,
                    }],
                    notes: None,
                },
                &self.user_id,
            )
            .await
            .unwrap();
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if let Some(path) = &self.file {
            for suffix in ["", "-wal", "-shm"] {
                let mut name = path.clone().into_os_string();
                name.push(suffix);
                let _ = std::fs::remove_file(name);
            }
        }
    }
}
