//! Chat notices through a Slack-compatible incoming webhook.

use std::fmt;

use async_trait::async_trait;
use serde_json::json;
use zeroize::Zeroizing;

use crate::relay::{Notice, Notifier, NotifyError};

/// Posts [`Notice::Chat`] lines as `{"text": …}` to a webhook URL.
///
/// The URL embeds the webhook secret, so it is zeroized on drop and never
/// printed.
pub struct SlackWebhook {
    client: reqwest::Client,
    url: Zeroizing<String>,
}

impl SlackWebhook {
    pub fn new(url: Zeroizing<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// The JSON body posted for `text`.
    pub fn payload(text: &str) -> serde_json::Value {
        json!({ "text": text })
    }
}

impl fmt::Debug for SlackWebhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackWebhook")
            .field("url", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        let Notice::Chat(text) = notice else {
            return Ok(());
        };
        let response = self
            .client
            .post(self.url.as_str())
            .json(&Self::payload(text))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}
