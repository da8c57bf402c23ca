//! JWT authentication module.
//!
//! Issues and verifies access/refresh tokens, and hashes passwords.
//!
//! ## Token Kinds
//! ```text
//! ┌──────────┬──────────────┬──────────────────────────────────────────────┐
//! │ Kind     │ Default TTL  │ Accepted by                                  │
//! ├──────────┼──────────────┼──────────────────────────────────────────────┤
//! │ access   │ 30 minutes   │ Authorization: Bearer on protected routes    │
//! │ refresh  │ 24 hours     │ POST /refresh (and only if stored in the db) │
//! └──────────┴──────────────┴──────────────────────────────────────────────┘
//! ```

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::TokenConfig;
use bazaar_core::{Role, User};

/// Whether a token grants API access or may only be exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Token type ("access" or "refresh")
    pub token_type: TokenKind,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID, unique per issuance
    pub jti: String,
}

/// Token signing failure.
#[derive(Debug, thiserror::Error)]
#[error("Failed to sign token: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

/// Password hashing failure.
#[derive(Debug, thiserror::Error)]
#[error("Failed to hash password: {0}")]
pub struct PasswordError(String);

/// JWT token service.
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a new token service.
    pub fn new(config: TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        TokenService {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.config.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.config.refresh_ttl
    }

    /// Sign a token of `kind` for `user`, valid for `ttl`.
    pub fn issue(&self, user: &User, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            token_type: kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Generate an access token.
    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        self.issue(user, TokenKind::Access, self.config.access_ttl)
    }

    /// Generate a refresh token.
    pub fn issue_refresh(&self, user: &User) -> Result<String, TokenError> {
        self.issue(user, TokenKind::Refresh, self.config.refresh_ttl)
    }

    /// Check signature and expiry (zero leeway). Any failure yields `None`.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "Token rejected");
                None
            }
        }
    }

    /// [`verify`](Self::verify) and require a specific token kind.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Option<Claims> {
        self.verify(token).filter(|claims| claims.token_type == kind)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// Verify a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TokenConfig {
            secret: "test-secret".to_string(),
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::hours(24),
        })
    }

    fn user() -> User {
        User::new("alice", "alice@example.com", "hash")
    }

    #[test]
    fn test_jwt_roundtrip() {
        let service = service();
        let user = user();

        let access_token = service.issue_access(&user).unwrap();
        let claims = service.verify_kind(&access_token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_every_issuance_is_unique() {
        let service = service();
        let user = user();

        let a = service.issue_refresh(&user).unwrap();
        let b = service.issue_refresh(&user).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_token_type() {
        let service = service();
        let access_token = service.issue_access(&user()).unwrap();

        assert!(service.verify(&access_token).is_some());
        assert!(service.verify_kind(&access_token, TokenKind::Refresh).is_none());
    }

    #[test]
    fn test_corrupted_signature_is_rejected() {
        let service = service();
        let token = service.issue_refresh(&user()).unwrap();

        let (head, signature) = token.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
        let corrupted = format!("{}.{}{}", head, flipped, &signature[1..]);

        assert!(service.verify(&corrupted).is_none());
        assert!(service.verify("not.a.jwt").is_none());
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let token = service().issue_access(&user()).unwrap();
        let other = TokenService::new(TokenConfig {
            secret: "another-secret".to_string(),
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::hours(24),
        });

        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = service();
        let token = service
            .issue(&user(), TokenKind::Access, Duration::seconds(-1))
            .unwrap();

        assert!(service.verify(&token).is_none());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }
}
