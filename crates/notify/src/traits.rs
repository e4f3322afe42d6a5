//! Notifier trait definition and shared error types.

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A rendered message addressed to one recipient.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DispatchRequest {
    /// Recipient email address.
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Id of the alert that caused this message.
    pub correlation_id: String,
}

/// Acknowledgement from a channel that a message was accepted for delivery.
///
/// "Accepted" means queued by the transport, not read by the recipient.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Receipt {
    pub channel: String,
    /// Transport-assigned id, when the transport reports one.
    pub notification_id: Option<String>,
    pub status: Option<String>,
}

impl Receipt {
    pub fn accepted(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            notification_id: None,
            status: None,
        }
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Hand a message to this channel for delivery.
    async fn send(&self, request: &DispatchRequest) -> Result<Receipt, NotifyError>;

    /// Human-readable name for this channel (e.g., "http", "email").
    fn channel_name(&self) -> &str;
}
