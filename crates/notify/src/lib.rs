//! Notification delivery for triggered hive alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - Notification-service HTTP client, SMTP and log-only notifiers
//! - Minijinja template rendering for alert messages
//! - `notifier_from_config` to build the configured channel

pub mod email;
pub mod http;
pub mod log;
pub mod templating;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use hivewatch_core::config::{NotifyConfig, NotifyTransport};

pub use email::EmailNotifier;
pub use http::HttpNotifier;
pub use log::LogNotifier;
pub use templating::{AlertContext, MessageTemplates, TemplateContext};
pub use traits::{DispatchRequest, Notifier, NotifyError, Receipt};

/// Build the notifier selected by `NOTIFY_TRANSPORT`.
///
/// `request_timeout` bounds each HTTP call to the notification service.
pub fn notifier_from_config(
    config: &NotifyConfig,
    request_timeout: Duration,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.transport {
        NotifyTransport::Http => {
            let url = config.service_url.as_deref().ok_or_else(|| {
                NotifyError::Config("NOTIFICATION_SERVICE_URL is not set".to_string())
            })?;
            Ok(Arc::new(HttpNotifier::new(url, request_timeout)?))
        }
        NotifyTransport::Email => {
            let host = config
                .smtp_host
                .as_deref()
                .ok_or_else(|| NotifyError::Config("SMTP_HOST is not set".to_string()))?;
            let from = config
                .smtp_from
                .as_deref()
                .ok_or_else(|| NotifyError::Config("SMTP_FROM is not set".to_string()))?;
            Ok(Arc::new(EmailNotifier::from_config(
                host,
                config.smtp_port,
                config.smtp_tls,
                from,
            )?))
        }
        NotifyTransport::Log => Ok(Arc::new(LogNotifier)),
    }
}
