//! LoopMessage iMessage delivery.

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Delivery, Notifier, mask_phone};
use crate::error::ServiceError;

/// Production send endpoint.
pub const LOOPMESSAGE_SEND_URL: &str = "https://server.loopmessage.com/api/v1/message/send/";

/// Credentials and addressing for [`LoopMessageNotifier`].
#[derive(Debug, Clone)]
pub struct LoopMessageSettings {
    /// Value of the `Authorization` header.
    pub auth_key: String,
    /// Value of the `Loop-Secret-Key` header.
    pub secret_key: String,
    /// Phone number or e-mail receiving the texts.
    pub recipient: String,
    /// Sender name registered with LoopMessage.
    pub sender_name: String,
    /// Send endpoint; overridable for tests.
    pub send_url: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: &'a str,
    text: &'a str,
    sender_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// [`Notifier`] backed by the LoopMessage REST API.
#[derive(Debug, Clone)]
pub struct LoopMessageNotifier {
    client: reqwest::Client,
    settings: LoopMessageSettings,
}

impl LoopMessageNotifier {
    /// Builds a notifier with a 15 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] when a credential or the
    /// recipient is empty, or the HTTP client cannot be built.
    pub fn new(settings: LoopMessageSettings) -> Result<Self, ServiceError> {
        if settings.auth_key.is_empty() || settings.secret_key.is_empty() {
            return Err(ServiceError::NotConfigured(
                "LoopMessage API credentials".to_string(),
            ));
        }
        if settings.recipient.is_empty() {
            return Err(ServiceError::NotConfigured("NOTIFICATION_NUMBER".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::NotConfigured(format!("http client: {e}")))?;
        Ok(Self { client, settings })
    }

    async fn deliver(&self, text: String) -> Result<Delivery, ServiceError> {
        let body = SendRequest {
            recipient: &self.settings.recipient,
            text: &text,
            sender_name: &self.settings.sender_name,
        };
        let response = self
            .client
            .post(&self.settings.send_url)
            .header("Authorization", &self.settings.auth_key)
            .header("Loop-Secret-Key", &self.settings.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;

        let status = response.status();
        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Notification(format!("HTTP {status}: {e}")))?;

        if status == reqwest::StatusCode::OK && parsed.success {
            info!(
                recipient = %mask_phone(&self.settings.recipient),
                message_id = parsed.message_id.as_deref().unwrap_or("-"),
                "notification delivered"
            );
            Ok(Delivery {
                message_id: parsed.message_id,
            })
        } else {
            let reason = parsed
                .message
                .unwrap_or_else(|| format!("request failed with status {status}"));
            warn!(recipient = %mask_phone(&self.settings.recipient), %reason, "notification rejected");
            Err(ServiceError::Notification(reason))
        }
    }
}

impl Notifier for LoopMessageNotifier {
    fn send(&self, text: String) -> BoxFuture<'_, Result<Delivery, ServiceError>> {
        Box::pin(self.deliver(text))
    }

    fn recipient(&self) -> &str {
        &self.settings.recipient
    }

    fn provider(&self) -> &'static str {
        "LoopMessage"
    }
}
