//! Account and token flows: registration, login, refresh, logout and
//! password reset.
//!
//! ## Refresh Flow
//! ```text
//! refresh token ──► verify signature + exp ──► kind == refresh?
//!                                                   │
//!          ┌────────────────────────────────────────┘
//!          ▼
//!   stored for (token, sub)? ──► stored expires_at in future? ──► user exists?
//!          │                           │                             │
//!          └──── any "no" ─────────────┴─────────────────────────────┴──► 401
//!                                                                    │
//!                        new access token + the SAME refresh token ◄─┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, TokenKind};
use crate::email::{EmailMessage, EmailTemplate};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use bazaar_core::validation::{
    ensure_passwords_match, validate_email, validate_password, validate_username,
};
use bazaar_core::{CoreError, User};

// =============================================================================
// Requests / Responses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    /// Whether the welcome email went out.
    pub email_sent: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub email_sent: bool,
}

// =============================================================================
// Service
// =============================================================================

/// Authentication service over the shared state.
pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        AuthService { state }
    }

    /// Creates a regular account and sends the welcome email.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<RegisterResponse> {
        let username = req.username.trim().to_string();
        validate_username(&username)?;
        let email = validate_email(&req.email)?;
        validate_password(&req.password)?;
        ensure_passwords_match(&req.password, &req.confirm_password)?;

        let users = self.state.db.users();
        if users.get_by_email(&email).await?.is_some() {
            return Err(CoreError::Conflict("Email already registered".to_string()).into());
        }
        if users.get_by_username(&username).await?.is_some() {
            return Err(CoreError::Conflict("Username already taken".to_string()).into());
        }

        let user = User::new(username, email, hash_password(&req.password)?);
        users.insert(&user).await?;

        info!(user_id = %user.id, "User registered");

        let email_sent = self.send_best_effort(&user, EmailTemplate::Welcome);
        Ok(RegisterResponse { user, email_sent })
    }

    /// Exchanges credentials for an access + refresh token pair.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<TokenResponse> {
        let email = req.email.trim().to_lowercase();

        let user = match self.state.db.users().get_by_email(&email).await? {
            Some(user) if verify_password(&req.password, &user.password_hash) => user,
            _ => {
                warn!("Failed login attempt");
                return Err(ApiError::unauthenticated("Incorrect email or password"));
            }
        };

        let tokens = &self.state.tokens;
        let access_token = tokens.issue_access(&user)?;
        let refresh_token = tokens.issue_refresh(&user)?;

        self.state
            .db
            .refresh_tokens()
            .save(&refresh_token, &user.id, tokens.refresh_ttl())
            .await?;

        info!(user_id = %user.id, "Token issued successfully");
        Ok(self.token_response(access_token, refresh_token))
    }

    /// Issues a new access token for a valid, stored refresh token.
    ///
    /// The refresh token is returned unchanged (no rotation).
    pub async fn refresh(&self, req: RefreshRequest) -> ApiResult<TokenResponse> {
        let invalid = || ApiError::unauthenticated("Invalid refresh token");

        let claims = self
            .state
            .tokens
            .verify_kind(&req.refresh_token, TokenKind::Refresh)
            .ok_or_else(invalid)?;

        let record = self
            .state
            .db
            .refresh_tokens()
            .lookup(&req.refresh_token, &claims.sub)
            .await?
            .ok_or_else(invalid)?;

        if record.is_expired(Utc::now()) {
            return Err(ApiError::unauthenticated("Refresh token expired"));
        }

        let user = self
            .state
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .ok_or_else(invalid)?;

        let access_token = self.state.tokens.issue_access(&user)?;

        info!(user_id = %user.id, "Token refreshed successfully");
        Ok(self.token_response(access_token, req.refresh_token))
    }

    /// Revokes the caller's refresh token.
    pub async fn logout(&self, user: &User, refresh_token: &str) -> ApiResult<()> {
        let revoked = self
            .state
            .db
            .refresh_tokens()
            .revoke(refresh_token, &user.id)
            .await?;

        if !revoked {
            return Err(ApiError::not_found("Refresh token", "presented"));
        }

        info!(user_id = %user.id, "Refresh token revoked");
        Ok(())
    }

    /// Stores a single-use reset token and emails the reset link.
    pub async fn request_password_reset(&self, req: PasswordResetRequest) -> ApiResult<MessageResponse> {
        let email = validate_email(&req.email)?;

        let user = self
            .state
            .db
            .users()
            .get_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::not_found("User with email", &email))?;

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.state.config.password_reset_ttl();
        self.state
            .db
            .users()
            .set_reset_token(&user.id, &token, expires_at)
            .await?;

        let link = format!(
            "{}/reset-password?token={}",
            self.state.config.public_base_url.trim_end_matches('/'),
            token
        );
        let message = EmailMessage::render(
            &user.email,
            &user.username,
            EmailTemplate::PasswordReset { link },
        );
        self.state.email.send(&message)?;

        info!(user_id = %user.id, "Password reset requested");
        Ok(MessageResponse {
            message: "Password reset email has been sent.".to_string(),
            email_sent: true,
        })
    }

    /// Sets a new password using a reset token and revokes all sessions.
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> ApiResult<MessageResponse> {
        ensure_passwords_match(&req.new_password, &req.confirm_password)?;
        validate_password(&req.new_password)?;

        let invalid = || ApiError::from(CoreError::invalid_state("Invalid or expired token"));

        let user = self
            .state
            .db
            .users()
            .get_by_reset_token(&req.token)
            .await?
            .ok_or_else(invalid)?;

        if !user.reset_token_matches(&req.token, Utc::now()) {
            return Err(invalid());
        }

        let revoked = self
            .state
            .db
            .users()
            .reset_password(&user.id, &hash_password(&req.new_password)?)
            .await?;

        info!(user_id = %user.id, revoked_sessions = revoked, "Password reset");

        let login_link = format!(
            "{}/token",
            self.state.config.public_base_url.trim_end_matches('/')
        );
        let email_sent = self.send_best_effort(&user, EmailTemplate::PasswordChanged { login_link });

        Ok(MessageResponse {
            message: "Password has been reset.".to_string(),
            email_sent,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn token_response(&self, access_token: String, refresh_token: String) -> TokenResponse {
        TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.state.tokens.access_ttl().num_seconds(),
        }
    }

    /// Sends an email whose failure must not fail the request.
    fn send_best_effort(&self, user: &User, template: EmailTemplate) -> bool {
        let message = EmailMessage::render(&user.email, &user.username, template);
        match self.state.email.send(&message) {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Email not sent");
                false
            }
        }
    }
}
