//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Bazaar                                 │
//! │                                                                         │
//! │  Handler: Result<Json<T>, ApiError>                                    │
//! │         │                                                               │
//! │         ├── ValidationError ──► CoreError::Validation ──┐              │
//! │         ├── CoreError (rules, access checks) ───────────┤              │
//! │         ├── DbError (queries, constraints) ─────────────┼──► ApiError  │
//! │         └── EmailError (reset link) ────────────────────┘       │      │
//! │                                                                  ▼      │
//! │                              HTTP status + {"code", "message"} JSON    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with the real cause; clients get a generic
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::{PasswordError, TokenError};
use crate::email::EmailError;
use bazaar_core::{CoreError, ValidationError};
use bazaar_db::DbError;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 3f2a..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing, invalid or expired credentials (401)
    Unauthenticated,

    /// Role or ownership check failed (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Duplicate resource or insufficient stock (409)
    Conflict,

    /// Operation not allowed in the current state (400)
    InvalidState,

    /// Input validation failed (400)
    ValidationError,

    /// Email could not be delivered (502)
    EmailDelivery,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InvalidState | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::EmailDelivery => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthenticated, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                let field = field.rsplit('.').next().unwrap_or(&field).to_string();
                ApiError::new(ErrorCode::Conflict, format!("{} already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Domain(e) => ApiError::from(e),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthenticated(msg) => ApiError::unauthenticated(msg),
            CoreError::Forbidden(msg) => ApiError::new(ErrorCode::Forbidden, msg),
            CoreError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            CoreError::Conflict(msg) => ApiError::new(ErrorCode::Conflict, msg),
            CoreError::InvalidState(msg) => ApiError::new(ErrorCode::InvalidState, msg),
            e @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::Conflict, e.to_string())
            }
            e @ (CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::AmountOverflow) => {
                ApiError::validation(e.to_string())
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        tracing::error!("{}", err);
        ApiError::new(ErrorCode::EmailDelivery, "Email could not be sent")
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        tracing::error!("{}", err);
        ApiError::internal("Could not issue token")
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("{}", err);
        ApiError::internal("Could not process password")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (CoreError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (CoreError::forbidden("x"), StatusCode::FORBIDDEN),
            (CoreError::not_found("Product", "1"), StatusCode::NOT_FOUND),
            (CoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (CoreError::invalid_state("x"), StatusCode::BAD_REQUEST),
            (
                CoreError::InsufficientStock {
                    product_id: "p".into(),
                    available: 1,
                    requested: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                CoreError::QuantityTooLarge { requested: 1000, max: 999 },
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::AmountOverflow, StatusCode::BAD_REQUEST),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).code.status(), status);
        }
    }

    #[test]
    fn test_db_error_mapping() {
        let dup = ApiError::from(DbError::duplicate("users.email", "a@example.com"));
        assert_eq!(dup.code, ErrorCode::Conflict);
        assert_eq!(dup.message, "email already exists");

        let internal = ApiError::from(DbError::QueryFailed("syntax error near SELEKT".into()));
        assert_eq!(internal.code.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("SELEKT"));

        let domain = ApiError::from(DbError::Domain(CoreError::invalid_state("Cart is empty")));
        assert_eq!(domain.code, ErrorCode::InvalidState);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::not_found("Order", "42")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Order not found: 42");
    }

    #[test]
    fn test_email_failure_is_bad_gateway() {
        let err = ApiError::from(EmailError::Delivery("smtp down".into()));
        assert_eq!(err.code.status(), StatusCode::BAD_GATEWAY);
    }
}
