//! Notification channels.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::NotifyError;
use crate::ports::Notifier;

/// Writes notifications to the log instead of posting them.
#[derive(Debug, Default)]
pub struct LogNotifier {
    sent: AtomicU64,
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        channel: &str,
        body: &str,
        previous: Option<&str>,
    ) -> Result<String, NotifyError> {
        info!(channel, previous, "Notification\n{body}");
        Ok(match previous {
            Some(id) => id.to_string(),
            None => format!("log-{}", self.sent.fetch_add(1, Ordering::Relaxed) + 1),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookReply {
    message_id: String,
}

/// Posts `{channel, text, messageId}` to a webhook that answers with the
/// id of the created or updated message.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let url = url.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError {
                channel: url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        channel: &str,
        body: &str,
        previous: Option<&str>,
    ) -> Result<String, NotifyError> {
        let failed = |message: String| NotifyError {
            channel: channel.to_string(),
            message,
        };
        let message = WebhookMessage {
            channel,
            text: body,
            message_id: previous,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("webhook returned {}", response.status())));
        }
        let reply: WebhookReply = response.json().await.map_err(|e| failed(e.to_string()))?;
        Ok(reply.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_keeps_previous_id() {
        let notifier = LogNotifier::default();
        let first = notifier.notify("#ops", "hello", None).await.unwrap();
        assert_eq!(first, "log-1");
        let again = notifier.notify("#ops", "hello again", Some(&first)).await.unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_webhook_message_shape() {
        let value = serde_json::to_value(WebhookMessage {
            channel: "#ops",
            text: "body",
            message_id: None,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"channel": "#ops", "text": "body"}));
    }
}
