//! Notifier that only writes the message to the log.
//!
//! Used for dry runs and local development when no delivery service is
//! reachable.

use crate::traits::{DispatchRequest, Notifier, NotifyError, Receipt};

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, request: &DispatchRequest) -> Result<Receipt, NotifyError> {
        tracing::info!(
            channel = "log",
            recipient = %request.recipient,
            alert_id = %request.correlation_id,
            subject = %request.subject,
            body = %request.body,
            "notification (log only)"
        );
        Ok(Receipt::accepted(self.channel_name()))
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
