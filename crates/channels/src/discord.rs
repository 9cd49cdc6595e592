//! Discord adapters.
//!
//! - [`DiscordWebhook`] posts pipeline output to an incoming-webhook URL as
//!   embeds (one per output kind)
//! - [`request_from_message`] turns a relayed Discord message event into a
//!   pipeline request and [`render_reply`] renders the answer

use serde::Serialize;
use tracing::{debug, error};
use vera_core::channel::ChannelMessage;
use vera_core::error::ChannelError;
use vera_core::pipeline::{PipelineRequest, PipelineResponse};
use vera_core::text::{truncate_chars, truncate_content};

/// Longest embed description Discord accepts.
pub const DISCORD_EMBED_LIMIT: usize = 4096;

pub const LINK_SUMMARIES_COLOR: u32 = 0x4caf50;
pub const THREAD_DRAFTS_COLOR: u32 = 0x03a9f4;
pub const REPLY_COLOR: u32 = 0x9c27b0;

/// Server id and name used for direct messages.
pub const DM_SERVER_ID: &str = "dm";
pub const DM_SERVER_NAME: &str = "Direct Message";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

impl Embed {
    fn new(title: &str, description: &str, color: u32) -> Self {
        Self {
            title: title.to_string(),
            description: truncate_chars(&truncate_content(description), DISCORD_EMBED_LIMIT),
            color: Some(color),
        }
    }
}

/// Body of an incoming-webhook POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordPayload {
    pub username: String,
    pub content: String,
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
}

/// Build the webhook payload for one pipeline response.
///
/// `content` is the first section; each non-empty output kind gets an embed.
pub fn build_discord_payload(username: &str, response: &PipelineResponse) -> DiscordPayload {
    let mut embeds = Vec::new();

    if !response.link_summaries.is_empty() {
        embeds.push(Embed::new(
            "Link summaries",
            &response.link_summaries.join("\n"),
            LINK_SUMMARIES_COLOR,
        ));
    }

    if !response.tweet_threads.is_empty() {
        let threads = response
            .tweet_threads
            .iter()
            .map(|t| format!("• {}\n{}", t.url, t.thread))
            .collect::<Vec<_>>()
            .join("\n\n");
        embeds.push(Embed::new("Thread drafts", &threads, THREAD_DRAFTS_COLOR));
    }

    if !response.general_response.is_empty() {
        embeds.push(Embed::new("Reply", &response.general_response, REPLY_COLOR));
    }

    DiscordPayload {
        username: username.to_string(),
        content: response.sections.first().cloned().unwrap_or_default(),
        embeds,
        thread_name: None,
    }
}

/// Add `thread_id` to the webhook URL when one is given.
pub fn build_webhook_url(base: &str, thread_id: Option<&str>) -> Result<String, ChannelError> {
    let Some(thread_id) = thread_id.filter(|t| !t.is_empty()) else {
        return Ok(base.to_string());
    };

    let mut url = url::Url::parse(base).map_err(|e| ChannelError::NotConfigured(format!(
        "invalid Discord webhook URL: {e}"
    )))?;
    url.query_pairs_mut().append_pair("thread_id", thread_id);
    Ok(url.to_string())
}

/// Sends pipeline output to a Discord incoming webhook.
pub struct DiscordWebhook {
    webhook_url: String,
    username: String,
    client: reqwest::Client,
}

impl DiscordWebhook {
    pub fn new(webhook_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            username: username.into(),
            client: reqwest::Client::new(),
        }
    }

    /// `None` when no webhook URL is configured.
    pub fn from_config(config: &vera_config::AppConfig) -> Option<Self> {
        let url = config.discord.webhook_url.as_deref()?;
        Some(Self::new(url, &config.discord.username))
    }

    /// Post `response`; failures are logged and never returned.
    pub async fn notify(
        &self,
        response: &PipelineResponse,
        thread_id: Option<&str>,
        thread_name: Option<&str>,
    ) {
        let mut payload = build_discord_payload(&self.username, response);
        payload.thread_name = thread_name.filter(|n| !n.is_empty()).map(String::from);

        if let Err(e) = self.deliver(&payload, thread_id).await {
            error!(error = %e, "Discord webhook delivery failed");
        }
    }

    async fn deliver(
        &self,
        payload: &DiscordPayload,
        thread_id: Option<&str>,
    ) -> Result<(), ChannelError> {
        let target = build_webhook_url(&self.webhook_url, thread_id)?;

        let response = self
            .client
            .post(&target)
            .json(payload)
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: "discord".into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::DeliveryFailed {
                channel: "discord".into(),
                reason: format!("status {}: {body}", status.as_u16()),
            });
        }

        debug!(embeds = payload.embeds.len(), "Discord webhook delivered");
        Ok(())
    }
}

/// The pipeline request for a Discord message event, or `None` for bot
/// authors.
///
/// Events carry platform details in metadata: `is_bot` (bool),
/// `guild_id` / `guild_name` (absent in DMs) and `mentions` (user ids).
/// `bot_user_id` is the bot's own id, used to detect mentions.
pub fn request_from_message(
    msg: &ChannelMessage,
    bot_user_id: Option<&str>,
) -> Option<PipelineRequest> {
    let is_bot = msg
        .metadata
        .get("is_bot")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if is_bot {
        return None;
    }

    let (server_id, server_name) = match msg.meta_str("guild_id") {
        Some(guild_id) => (
            guild_id.to_string(),
            msg.meta_str("guild_name").unwrap_or(guild_id).to_string(),
        ),
        None => (DM_SERVER_ID.to_string(), DM_SERVER_NAME.to_string()),
    };

    let is_mentioned = bot_user_id.filter(|id| !id.is_empty()).is_some_and(|bot_id| {
        msg.metadata
            .get("mentions")
            .and_then(|v| v.as_array())
            .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(bot_id)))
    });

    let user_name = msg.sender_name.clone().unwrap_or_else(|| msg.sender_id.clone());

    Some(
        PipelineRequest::new(msg.content.clone())
            .with_user(msg.sender_id.clone(), user_name)
            .with_server(server_id, server_name)
            .mentioned(is_mentioned),
    )
}

/// Reply text for a Discord message: sections separated by blank lines,
/// or `None` when there is nothing to say.
pub fn render_reply(response: &PipelineResponse) -> Option<String> {
    let text = response.render_text();
    (!text.trim().is_empty()).then_some(text)
}
