//! # User Repository
//!
//! The credential store: accounts, password hashes, roles and the
//! single-use password-reset token.
//!
//! Email and username uniqueness is enforced by the schema; a duplicate
//! surfaces as [`DbError::UniqueViolation`] with the offending column in
//! `field` (e.g. `users.email`).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{ProfileUpdate, Role, User};

const SELECT_USER: &str = r#"
    SELECT
        id, username, email, password_hash, role, vendor_id,
        reset_token, reset_token_expires_at, created_at, updated_at
    FROM users
"#;

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new account.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, username = %user.username, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, role, vendor_id,
                reset_token, reset_token_expires_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.vendor_id)
        .bind(&user.reset_token)
        .bind(user.reset_token_expires_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE id = ?1", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by (already normalized) email.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE email = ?1", SELECT_USER))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by username.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE username = ?1", SELECT_USER))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets the user holding a password-reset token. Expiry is not checked
    /// here; see [`User::reset_token_matches`].
    pub async fn get_by_reset_token(&self, token: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE reset_token = ?1", SELECT_USER))
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Lists all accounts, oldest first.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!("{} ORDER BY created_at", SELECT_USER))
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Applies a profile update and returns the stored user.
    ///
    /// Values must already be validated and normalized by the caller.
    pub async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> DbResult<User> {
        debug!(id = %id, "Updating user profile");

        let mut user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        if let Some(username) = &update.username {
            user.username = username.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        user.updated_at = Utc::now();

        sqlx::query("UPDATE users SET username = ?2, email = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(user)
    }

    /// Stores a password-reset token, replacing any previous one.
    pub async fn set_reset_token(
        &self,
        id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, "Storing password reset token");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                reset_token = ?2,
                reset_token_expires_at = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Sets a new password hash, consumes the reset token and revokes every
    /// refresh token of the user, in one transaction.
    ///
    /// ## Returns
    /// The number of refresh tokens revoked.
    pub async fn reset_password(&self, id: &str, password_hash: &str) -> DbResult<u64> {
        debug!(id = %id, "Resetting password");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = ?2,
                reset_token = NULL,
                reset_token_expires_at = NULL,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        let revoked = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(revoked)
    }

    /// Changes an account's role. `vendor_id` is stored for vendor accounts
    /// and cleared otherwise.
    pub async fn set_role(&self, id: &str, role: Role, vendor_id: Option<&str>) -> DbResult<User> {
        debug!(id = %id, role = %role, "Changing user role");

        let vendor_id = match role {
            Role::Vendor => vendor_id,
            Role::User | Role::Admin => None,
        };

        let result = sqlx::query(
            "UPDATE users SET role = ?2, vendor_id = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(role)
        .bind(vendor_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Deletes an account. Refresh tokens, orders and wishlist rows cascade.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::repository::test_support::{create_user, create_vendor, test_db};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;

        let by_id = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");
        assert_eq!(by_id.role, Role::User);
        assert_eq!(by_id.password_hash, "hash");

        assert!(db.users().get_by_email("alice@example.com").await.unwrap().is_some());
        assert!(db.users().get_by_username("alice").await.unwrap().is_some());
        assert!(db.users().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let db = test_db().await;
        create_user(&db, "alice").await;

        let dup = User::new("alice2", "alice@example.com", "hash");
        let err = db.users().insert(&dup).await.unwrap_err();
        assert!(err.is_unique_violation_on("email"));

        let dup = User::new("alice", "other@example.com", "hash");
        let err = db.users().insert(&dup).await.unwrap_err();
        assert!(err.is_unique_violation_on("username"));
    }

    #[tokio::test]
    async fn test_reset_token_flow_revokes_sessions() {
        let db = test_db().await;
        let user = create_user(&db, "bob").await;
        let expires = Utc::now() + Duration::minutes(30);

        db.users().set_reset_token(&user.id, "reset-1", expires).await.unwrap();
        db.refresh_tokens()
            .save("refresh-1", &user.id, Duration::hours(24))
            .await
            .unwrap();

        let holder = db.users().get_by_reset_token("reset-1").await.unwrap().unwrap();
        assert_eq!(holder.id, user.id);
        assert!(holder.reset_token_matches("reset-1", Utc::now()));

        let revoked = db.users().reset_password(&user.id, "new-hash").await.unwrap();
        assert_eq!(revoked, 1);

        let after = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(after.password_hash, "new-hash");
        assert!(after.reset_token.is_none());
        assert!(db.users().get_by_reset_token("reset-1").await.unwrap().is_none());
        assert!(db
            .refresh_tokens()
            .lookup("refresh-1", &user.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_set_role_links_vendor_only_for_vendors() {
        let db = test_db().await;
        let user = create_user(&db, "carol").await;
        let vendor = create_vendor(&db, "Acme").await;

        let updated = db
            .users()
            .set_role(&user.id, Role::Vendor, Some(vendor.id.as_str()))
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Vendor);
        assert_eq!(updated.vendor_id.as_deref(), Some(vendor.id.as_str()));

        let updated = db
            .users()
            .set_role(&user.id, Role::Admin, Some(vendor.id.as_str()))
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(updated.vendor_id.is_none());
    }

    #[tokio::test]
    async fn test_update_profile_and_delete() {
        let db = test_db().await;
        let user = create_user(&db, "dave").await;

        let updated = db
            .users()
            .update_profile(
                &user.id,
                &ProfileUpdate {
                    username: Some("david".into()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "david");
        assert_eq!(updated.email, "dave@example.com");

        db.users().delete(&user.id).await.unwrap();
        assert!(matches!(
            db.users().delete(&user.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
