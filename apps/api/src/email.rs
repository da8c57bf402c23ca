//! # Transactional Email
//!
//! Account emails (welcome, password reset, password changed) go through the
//! [`EmailSender`] trait. The server uses [`LogEmailSender`], which writes the
//! message to the log; tests inject a recording or failing sender.
//!
//! ## Failure Policy
//! ```text
//! ┌──────────────────┬────────────────────────────────────────────────────┐
//! │ Template         │ On send failure                                    │
//! ├──────────────────┼────────────────────────────────────────────────────┤
//! │ Welcome          │ warn!, registration succeeds, email_sent = false   │
//! │ PasswordReset    │ request fails with 502 (the link is the point)     │
//! │ PasswordChanged  │ warn!, reset succeeds, email_sent = false          │
//! └──────────────────┴────────────────────────────────────────────────────┘
//! ```

use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

/// Which account email to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum EmailTemplate {
    Welcome,
    PasswordReset { link: String },
    PasswordChanged { login_link: String },
}

/// A rendered email addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub template: EmailTemplate,
}

impl EmailMessage {
    /// Renders `template` for `username` at `to`.
    pub fn render(to: &str, username: &str, template: EmailTemplate) -> Self {
        let (subject, body) = match &template {
            EmailTemplate::Welcome => (
                "Welcome to Bazaar".to_string(),
                format!("Hi {},\n\nYour Bazaar account is ready.", username),
            ),
            EmailTemplate::PasswordReset { link } => (
                "Reset your Bazaar password".to_string(),
                format!(
                    "Hi {},\n\nUse this link to choose a new password:\n{}\n\nThe link expires soon and works once.",
                    username, link
                ),
            ),
            EmailTemplate::PasswordChanged { login_link } => (
                "Your Bazaar password was changed".to_string(),
                format!(
                    "Hi {},\n\nYour password has been changed. You can log in here:\n{}",
                    username, login_link
                ),
            ),
        };

        EmailMessage {
            to: to.to_string(),
            subject,
            body,
            template,
        }
    }
}

/// Email delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email delivery failed: {0}")]
    Delivery(String),
}

/// Delivers account emails.
pub trait EmailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Email sent"
        );
        Ok(())
    }
}

/// Keeps every message in memory; can be switched to fail.
#[derive(Debug, Default)]
pub struct MemoryEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every delivery fails.
    pub fn failing() -> Self {
        MemoryEmailSender {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The most recent message to `to`.
    pub fn last_to(&self, to: &str) -> Option<EmailMessage> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

impl EmailSender for MemoryEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Delivery("mail server unavailable".to_string()));
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(message.clone()),
            Err(poisoned) => poisoned.into_inner().push(message.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reset_contains_link() {
        let message = EmailMessage::render(
            "bob@example.com",
            "bob",
            EmailTemplate::PasswordReset {
                link: "http://localhost:8000/reset-password?token=abc".into(),
            },
        );

        assert!(message.body.contains("token=abc"));
        assert!(message.body.contains("bob"));
        assert_eq!(message.to, "bob@example.com");
    }

    #[test]
    fn test_memory_sender_records_and_fails() {
        let sender = MemoryEmailSender::new();
        let message = EmailMessage::render("a@example.com", "a", EmailTemplate::Welcome);

        sender.send(&message).unwrap();
        assert_eq!(sender.last_to("a@example.com").unwrap().template, EmailTemplate::Welcome);

        let failing = MemoryEmailSender::failing();
        assert!(failing.send(&message).is_err());
        assert!(failing.sent().is_empty());
    }
}
