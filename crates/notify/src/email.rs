//! SMTP email notifier via `lettre` with TLS support.
//!
//! Sends each dispatch request as an email to the request's recipient.
//! Supports STARTTLS, implicit TLS and plain connections.

use crate::traits::{DispatchRequest, Notifier, NotifyError, Receipt};
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

/// Sends notifications as emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP configuration.
    ///
    /// - `smtp_port`: defaults to 587. Port 465 uses implicit TLS.
    /// - `tls`: when false on a port other than 465, the connection is
    ///   unencrypted (local relays and test servers).
    /// - `from`: sender address, optionally with a display name.
    ///
    /// SMTP credentials are resolved from the `SMTP_USERNAME` and `SMTP_PASSWORD`
    /// environment variables. If both are set, they are passed to the transport;
    /// otherwise the connection is unauthenticated.
    pub fn from_config(
        smtp_host: &str,
        smtp_port: Option<u16>,
        tls: bool,
        from: &str,
    ) -> Result<Self, NotifyError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let port = smtp_port.unwrap_or(587);

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(port)
        };

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, request: &DispatchRequest) -> Result<Message, NotifyError> {
        let to: Mailbox = request
            .recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                NotifyError::Rejected(format!("invalid recipient '{}': {e}", request.recipient))
            })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&request.subject)
            .body(request.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, request: &DispatchRequest) -> Result<Receipt, NotifyError> {
        let email = self.build_message(request)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            alert_id = %request.correlation_id,
            subject = %request.subject,
            "notification delivered"
        );

        Ok(Receipt {
            channel: self.channel_name().to_string(),
            notification_id: None,
            status: Some(response.code().to_string()),
        })
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
