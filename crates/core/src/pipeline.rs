//! Request and response shapes at the pipeline boundary.
//!
//! Platform adapters normalize their input into a [`PipelineRequest`] and
//! render a [`PipelineResponse`] back to their users.

use serde::{Deserialize, Serialize};
use crate::knowledge::KnowledgeTriple;

pub const DEFAULT_USER_ID: &str = "anonymous";
pub const DEFAULT_USER_NAME: &str = "friend";
pub const DEFAULT_SERVER_ID: &str = "global";
pub const DEFAULT_SERVER_NAME: &str = "the server";

/// A normalized inbound chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub message_text: String,

    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default = "default_user_name")]
    pub user_name: String,

    #[serde(default = "default_server_id")]
    pub server_id: String,

    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// The message explicitly addresses the assistant
    #[serde(default)]
    pub is_mentioned: bool,
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.into()
}
fn default_user_name() -> String {
    DEFAULT_USER_NAME.into()
}
fn default_server_id() -> String {
    DEFAULT_SERVER_ID.into()
}
fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.into()
}

impl PipelineRequest {
    /// A request with every identity field at its default.
    pub fn new(message_text: impl Into<String>) -> Self {
        Self {
            message_text: message_text.into(),
            user_id: default_user_id(),
            user_name: default_user_name(),
            server_id: default_server_id(),
            server_name: default_server_name(),
            is_mentioned: false,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.user_name = user_name.into();
        self
    }

    pub fn with_server(mut self, server_id: impl Into<String>, server_name: impl Into<String>) -> Self {
        self.server_id = server_id.into();
        self.server_name = server_name.into();
        self
    }

    pub fn mentioned(mut self, is_mentioned: bool) -> Self {
        self.is_mentioned = is_mentioned;
        self
    }
}

/// A reconstructed discussion thread for one social-post URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetThread {
    /// The original (non-mirrored) URL
    pub url: String,
    pub thread: String,
}

/// Everything one pipeline pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    /// Rendered output sections, in display order. Never empty.
    pub sections: Vec<String>,
    pub link_summaries: Vec<String>,
    pub tweet_threads: Vec<TweetThread>,
    /// Empty when no conversational reply was produced
    pub general_response: String,
    pub knowledge_triples: Vec<KnowledgeTriple>,
    pub knowledge_context: Vec<KnowledgeTriple>,
}

impl PipelineResponse {
    /// Sections joined for plain-text delivery.
    pub fn render_text(&self) -> String {
        self.sections.join("\n\n")
    }
}
