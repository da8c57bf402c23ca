//! # Vendor Repository
//!
//! CRUD for marketplace vendors. Deleting a vendor cascades to its
//! products and unlinks its vendor accounts (`users.vendor_id` → NULL).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::Vendor;

/// Repository for vendors.
#[derive(Debug, Clone)]
pub struct VendorRepository {
    pool: SqlitePool,
}

impl VendorRepository {
    /// Creates a new VendorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VendorRepository { pool }
    }

    /// Inserts a new vendor.
    pub async fn insert(&self, vendor: &Vendor) -> DbResult<()> {
        debug!(id = %vendor.id, name = %vendor.name, "Inserting vendor");

        sqlx::query(
            r#"
            INSERT INTO vendors (id, name, email, phone, address, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&vendor.id)
        .bind(&vendor.name)
        .bind(&vendor.email)
        .bind(&vendor.phone)
        .bind(&vendor.address)
        .bind(vendor.created_at)
        .bind(vendor.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a vendor by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Vendor>> {
        let vendor = sqlx::query_as::<_, Vendor>(
            r#"
            SELECT id, name, email, phone, address, created_at, updated_at
            FROM vendors
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vendor)
    }

    /// Lists vendors by name.
    pub async fn list(&self) -> DbResult<Vec<Vendor>> {
        let vendors = sqlx::query_as::<_, Vendor>(
            r#"
            SELECT id, name, email, phone, address, created_at, updated_at
            FROM vendors
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vendors)
    }

    /// Writes every mutable column of `vendor`.
    pub async fn update(&self, vendor: &Vendor) -> DbResult<()> {
        debug!(id = %vendor.id, "Updating vendor");

        let result = sqlx::query(
            r#"
            UPDATE vendors SET
                name = ?2,
                email = ?3,
                phone = ?4,
                address = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&vendor.id)
        .bind(&vendor.name)
        .bind(&vendor.email)
        .bind(&vendor.phone)
        .bind(&vendor.address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Vendor", &vendor.id));
        }

        Ok(())
    }

    /// Deletes a vendor and, through the schema, its products.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting vendor");

        let result = sqlx::query("DELETE FROM vendors WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Vendor", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{create_product, create_vendor, test_db};
    use bazaar_core::VendorUpdate;

    #[tokio::test]
    async fn test_vendor_crud() {
        let db = test_db().await;
        let mut vendor = create_vendor(&db, "Acme").await;

        VendorUpdate {
            phone: Some("555-0199".into()),
            ..Default::default()
        }
        .apply(&mut vendor);
        db.vendors().update(&vendor).await.unwrap();

        let stored = db.vendors().get_by_id(&vendor.id).await.unwrap().unwrap();
        assert_eq!(stored.phone, "555-0199");
        assert_eq!(db.vendors().list().await.unwrap().len(), 1);

        db.vendors().delete(&vendor.id).await.unwrap();
        assert!(db.vendors().get_by_id(&vendor.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_vendor_removes_products() {
        let db = test_db().await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 5000, 3).await;

        db.vendors().delete(&vendor.id).await.unwrap();
        assert!(db.products().get_by_id(&product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_vendor_email() {
        let db = test_db().await;
        create_vendor(&db, "Acme").await;

        let dup = Vendor::new("Acme Two", "acme@vendor.example.com", "555-0101", None);
        assert!(db.vendors().insert(&dup).await.unwrap_err().is_unique_violation_on("email"));
    }
}
