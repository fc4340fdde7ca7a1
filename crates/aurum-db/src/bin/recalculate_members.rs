//! # Member Loyalty Sweep
//!
//! Rebuilds every member's totals, transaction count, points and tier from
//! their completed transactions.
//!
//! ## Usage
//! ```bash
//! cargo run -p aurum-db --bin recalculate-members
//! AURUM_DATABASE_PATH=./data/aurum.db cargo run -p aurum-db --bin recalculate-members
//! ```
//!
//! Run it after repairing data by hand. Manual point awards are not
//! derivable from transactions and are dropped by the sweep.

use tracing::info;

use aurum_db::telemetry::init_tracing;
use aurum_db::{AppConfig, Database};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_filter);

    info!(path = %config.database_path.display(), "Starting member recalculation");

    let db = Database::new(config.to_db_config()).await?;
    let updated = db.members().recalculate_all().await?;
    db.close().await;

    info!(members = updated, "Member recalculation complete");
    Ok(())
}
