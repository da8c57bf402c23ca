//! # Refresh Token Repository
//!
//! Server-side record of issued refresh tokens.
//!
//! ## Token Validity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A refresh token is usable only when ALL of these hold:                │
//! │                                                                         │
//! │   1. signature and `exp` claim verify          (bazaar-api auth)       │
//! │   2. a row exists for (token, user_id)          lookup()               │
//! │   3. the row's expires_at is in the future      RefreshTokenRecord     │
//! │                                                 ::is_expired()          │
//! │                                                                         │
//! │  Deleting the row (logout, password reset, user deletion) revokes it.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bazaar_core::RefreshTokenRecord;

/// Repository for persisted refresh tokens.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    /// Creates a new RefreshTokenRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RefreshTokenRepository { pool }
    }

    /// Persists a freshly issued refresh token valid for `ttl`.
    ///
    /// ## Errors
    /// - `DbError::UniqueViolation` if the exact token string is already stored
    /// - `DbError::ForeignKeyViolation` if the user does not exist
    pub async fn save(
        &self,
        token: &str,
        user_id: &str,
        ttl: Duration,
    ) -> DbResult<RefreshTokenRecord> {
        let now = Utc::now();
        let record = RefreshTokenRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token: token.to_string(),
            expires_at: now + ttl,
            created_at: now,
        };

        debug!(user_id = %user_id, expires_at = %record.expires_at, "Saving refresh token");

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: "refresh token".to_string(),
            },
            other => other,
        })?;

        Ok(record)
    }

    /// Finds the stored record for `token` belonging to `user_id`.
    ///
    /// Expired rows are returned as-is; the caller decides with
    /// [`RefreshTokenRecord::is_expired`].
    pub async fn lookup(&self, token: &str, user_id: &str) -> DbResult<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token, expires_at, created_at
            FROM refresh_tokens
            WHERE token = ?1 AND user_id = ?2
            "#,
        )
        .bind(token)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Revokes one token. Returns whether a row was removed.
    pub async fn revoke(&self, token: &str, user_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?1 AND user_id = ?2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every token of a user (all sessions).
    pub async fn revoke_all_for_user(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        debug!(user_id = %user_id, revoked = result.rows_affected(), "Revoked refresh tokens");
        Ok(result.rows_affected())
    }

    /// Deletes rows whose `expires_at` has passed. Run at startup.
    pub async fn purge_expired(&self) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE julianday(expires_at) <= julianday(?1)",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let purged = result.rows_affected();
        if purged > 0 {
            info!(purged, "Purged expired refresh tokens");
        }
        Ok(purged)
    }

    /// Counts stored tokens for a user (for diagnostics).
    pub async fn count_for_user(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{create_user, test_db};

    #[tokio::test]
    async fn test_save_and_lookup() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;

        let saved = db
            .refresh_tokens()
            .save("token-a", &user.id, Duration::hours(24))
            .await
            .unwrap();

        let found = db
            .refresh_tokens()
            .lookup("token-a", &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, saved.id);
        assert!(!found.is_expired(Utc::now()));

        // Token must belong to the given user
        assert!(db
            .refresh_tokens()
            .lookup("token-a", "someone-else")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_token_is_rejected() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let repo = db.refresh_tokens();

        repo.save("same", &user.id, Duration::hours(1)).await.unwrap();
        let err = repo.save("same", &user.id, Duration::hours(1)).await.unwrap_err();

        assert!(err.is_unique_violation_on("token"));
        assert_eq!(repo.count_for_user(&user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_record_is_reported_and_purged() {
        let db = test_db().await;
        let user = create_user(&db, "bob").await;
        let repo = db.refresh_tokens();

        repo.save("old", &user.id, Duration::seconds(-5)).await.unwrap();
        repo.save("fresh", &user.id, Duration::hours(1)).await.unwrap();

        let old = repo.lookup("old", &user.id).await.unwrap().unwrap();
        assert!(old.is_expired(Utc::now()));

        assert_eq!(repo.purge_expired().await.unwrap(), 1);
        assert!(repo.lookup("old", &user.id).await.unwrap().is_none());
        assert!(repo.lookup("fresh", &user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke() {
        let db = test_db().await;
        let user = create_user(&db, "carol").await;
        let repo = db.refresh_tokens();

        repo.save("t1", &user.id, Duration::hours(1)).await.unwrap();
        repo.save("t2", &user.id, Duration::hours(1)).await.unwrap();

        assert!(repo.revoke("t1", &user.id).await.unwrap());
        assert!(!repo.revoke("t1", &user.id).await.unwrap());
        assert_eq!(repo.revoke_all_for_user(&user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let db = test_db().await;
        let user = create_user(&db, "dave").await;
        db.refresh_tokens()
            .save("t", &user.id, Duration::hours(1))
            .await
            .unwrap();

        db.users().delete(&user.id).await.unwrap();
        assert_eq!(db.refresh_tokens().count_for_user(&user.id).await.unwrap(), 0);
    }
}
