//! Client for the notification microservice.
//!
//! Posts a dispatch request to `{base}/api/notifications/send`. The service
//! queues an email and answers with a notification id; a response with
//! `success: false` or a non-2xx status is a failed delivery.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::traits::{DispatchRequest, Notifier, NotifyError, Receipt};

const SEND_PATH: &str = "/api/notifications/send";

/// Request body understood by the notification service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBody<'a> {
    recipient_email: &'a str,
    subject: &'a str,
    message: &'a str,
    channel: &'static str,
    alert_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    notification_id: Option<String>,
    #[serde(default)]
    success: bool,
    message: Option<String>,
    status: Option<String>,
}

/// Delivers dispatch requests through the notification service's HTTP API.
#[derive(Debug)]
pub struct HttpNotifier {
    /// Full send endpoint (base URL + path).
    endpoint: String,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl HttpNotifier {
    /// Create a notifier for the service at `base_url`.
    ///
    /// A trailing slash on `base_url` is ignored. `timeout` bounds each
    /// request end to end.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(NotifyError::Config(
                "notification service URL is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: format!("{base}{SEND_PATH}"),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, request: &DispatchRequest) -> Result<Receipt, NotifyError> {
        let body = SendBody {
            recipient_email: &request.recipient,
            subject: &request.subject,
            message: &request.body,
            channel: "EMAIL",
            alert_id: &request.correlation_id,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.endpoint,
                %status,
                body = %body_text,
                "notification service returned non-2xx status"
            );
            return Err(NotifyError::Rejected(format!(
                "notification service returned {status}: {body_text}"
            )));
        }

        let reply: SendResponse = response.json().await?;
        if !reply.success {
            return Err(NotifyError::Rejected(
                reply
                    .message
                    .unwrap_or_else(|| "service reported failure".to_string()),
            ));
        }

        tracing::debug!(
            alert_id = %request.correlation_id,
            notification_id = ?reply.notification_id,
            status = ?reply.status,
            "notification accepted by service"
        );

        Ok(Receipt {
            channel: self.channel_name().to_string(),
            notification_id: reply.notification_id,
            status: reply.status,
        })
    }

    fn channel_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> DispatchRequest {
        DispatchRequest {
            recipient: "keeper@example.com".into(),
            subject: "Alert Triggered".into(),
            body: "Alert triggered: Hot hive".into(),
            correlation_id: "alert-42".into(),
        }
    }

    fn notifier(server: &MockServer) -> HttpNotifier {
        HttpNotifier::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let n = HttpNotifier::new("http://notify.local:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(n.endpoint(), "http://notify.local:8080/api/notifications/send");
    }

    #[test]
    fn empty_url_is_config_error() {
        let err = HttpNotifier::new("  ", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[tokio::test]
    async fn posts_request_and_returns_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/send"))
            .and(body_json(json!({
                "recipientEmail": "keeper@example.com",
                "subject": "Alert Triggered",
                "message": "Alert triggered: Hot hive",
                "channel": "EMAIL",
                "alertId": "alert-42"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notificationId": "n-1",
                "success": true,
                "message": "Notification queued",
                "status": "PENDING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = notifier(&server).send(&request()).await.unwrap();
        assert_eq!(receipt.channel, "http");
        assert_eq!(receipt.notification_id.as_deref(), Some("n-1"));
        assert_eq!(receipt.status.as_deref(), Some("PENDING"));
    }

    #[tokio::test]
    async fn unsuccessful_reply_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "recipient blocked"
            })))
            .mount(&server)
            .await;

        match notifier(&server).send(&request()).await.unwrap_err() {
            NotifyError::Rejected(msg) => assert_eq!(msg, "recipient blocked"),
            other => panic!("expected Rejected error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        match notifier(&server).send(&request()).await.unwrap_err() {
            NotifyError::Rejected(msg) => {
                assert!(msg.contains("503"), "got: {msg}");
                assert!(msg.contains("down"), "got: {msg}");
            }
            other => panic!("expected Rejected error, got: {other:?}"),
        }
    }
}
