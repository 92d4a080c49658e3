//! Messages posted to the chat webhook, and the sink that posts them.
//!
//! The payload follows the webhook format of the common chat platforms: an optional plain `content`
//! line and a list of rich embeds.

mod format;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::Error;

pub use self::format::format;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageStyle {
    /// One rich embed per notification
    #[default]
    Embed,
    /// A single line of text per notification
    Plain,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Somewhere notifications can be delivered to
#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    async fn send(&self, message: &Message) -> Result<(), Error>;
}

/// Posts messages to a webhook url. Every message is tried exactly once
#[derive(Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String, timeout: Option<u64>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout.unwrap_or(60)))
            .build()?;

        Ok(Self { client, url })
    }
}

impl NotificationSink for WebhookSink {
    #[instrument(skip_all)]
    async fn send(&self, message: &Message) -> Result<(), Error> {
        let resp = self.client.post(&self.url).json(message).send().await?;
        trace!(status = %resp.status(), "webhook response");

        // Chat webhooks answer with 204 No Content unless asked to wait for the message
        if !resp.status().is_success() {
            return Err(Error::WebhookStatus(resp.status()));
        }

        Ok(())
    }
}
