//! Seeds a database with an admin, one vendor with a vendor account, a
//! shopper and a handful of products.
//!
//! ```text
//! DATABASE_PATH=bazaar.db cargo run -p bazaar-api --bin seed
//! ```
//!
//! All seeded accounts use the password `password123`.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bazaar_api::auth::hash_password;
use bazaar_api::ApiConfig;
use bazaar_core::{Product, Role, User, Vendor};
use bazaar_db::{Database, DbConfig};

const SEED_PASSWORD: &str = "password123";

const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("Ceramic Mug", "Stoneware, 350 ml", 1250, 40),
    ("Linen Tote", "Natural linen shopping bag", 1899, 25),
    ("Desk Lamp", "Warm white LED, dimmable", 4599, 10),
    ("Notebook", "A5 dotted, 120 pages", 799, 100),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ApiConfig::load().context("invalid configuration")?;
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("failed to open database")?;

    if db.users().get_by_email("admin@bazaar.local").await?.is_some() {
        info!("Database already seeded");
        return Ok(());
    }

    let hash = hash_password(SEED_PASSWORD)?;

    let admin = User::new("admin", "admin@bazaar.local", hash.clone());
    db.users().insert(&admin).await?;
    db.users().set_role(&admin.id, Role::Admin, None).await?;

    let vendor = Vendor::new(
        "Corner Goods",
        "hello@cornergoods.local",
        "+15550100",
        Some("12 Market Street".to_string()),
    );
    db.vendors().insert(&vendor).await?;

    let seller = User::new("corner", "seller@cornergoods.local", hash.clone());
    db.users().insert(&seller).await?;
    db.users()
        .set_role(&seller.id, Role::Vendor, Some(vendor.id.as_str()))
        .await?;

    let shopper = User::new("shopper", "shopper@bazaar.local", hash);
    db.users().insert(&shopper).await?;

    for (name, description, price_cents, stock) in PRODUCTS {
        let product = Product::new(
            vendor.id.clone(),
            *name,
            Some(description.to_string()),
            *price_cents,
            *stock,
        );
        db.products().insert(&product).await?;
    }

    info!(
        vendor_id = %vendor.id,
        products = PRODUCTS.len(),
        "Seeded admin, vendor account, shopper and products"
    );

    db.close().await;
    Ok(())
}
