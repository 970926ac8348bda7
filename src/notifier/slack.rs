//! Slack Web API transport
//!
//! Both destinations go through `chat.postMessage`: a channel ID for group
//! messages, a user ID for direct messages.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Notifier;
use crate::error::{MonitorError, Result};

pub struct SlackNotifier {
    api_url: String,
    token: String,
    http_client: Client,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http_client: Client::new(),
        }
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.api_url);
        debug!("Posting message to {}", channel);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&PostMessage { channel, text })
            .send()
            .await
            .map_err(|e| MonitorError::DeliveryError(format!("{}: {}", channel, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::DeliveryError(format!(
                "{}: chat API returned {}",
                channel, status
            )));
        }

        let body: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::DeliveryError(format!("{}: unreadable reply: {}", channel, e)))?;

        if !body.ok {
            let reason = body.error.unwrap_or_else(|| "unknown_error".to_string());
            warn!("Chat API rejected message to {}: {}", channel, reason);
            return Err(MonitorError::DeliveryError(format!("{}: {}", channel, reason)));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send_group_message(&self, group_id: &str, text: &str) -> Result<()> {
        self.post_message(group_id, text).await
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<()> {
        self.post_message(user_id, text).await
    }
}
