//! Chat channel adapters for Vera.
//!
//! - **Discord** — outbound webhook delivery (embeds, threads) and the
//!   mapping of relayed message events onto pipeline requests
//! - **Webhook** — normalization of arbitrary inbound HTTP posts plus
//!   optional HMAC-SHA256 signature checks

pub mod discord;
pub mod webhook;

pub use discord::{
    DiscordPayload, DiscordWebhook, Embed, build_discord_payload, build_webhook_url,
    render_reply, request_from_message,
};
pub use webhook::{InboundWebhook, SignatureVerifier, WebhookMetadata, derive_message_text, normalize};
