//! # Vera Core
//!
//! Domain types, traits, and error definitions for the Vera message-enrichment
//! runtime. It defines the domain model that all other crates implement
//! against and performs no I/O of its own.
//!
//! ## Design Philosophy
//!
//! Every external capability is defined as a trait here. Implementations live
//! in their respective crates:
//! - [`Provider`] — text generation (Gemini, OpenAI-compatible)
//! - [`KvStore`] — key-value persistence for the memory store
//! - [`ContentFetcher`] — HTTP retrieval of linked pages
//! - [`KnowledgeLibrary`] — optional structured extraction

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod memory;
pub mod knowledge;
pub mod fetch;
pub mod pipeline;
pub mod text;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use channel::{ChannelMessage, ChannelId};
pub use memory::{KvStore, MemoryRecord, PersonMemory};
pub use knowledge::{KnowledgeLibrary, KnowledgeTriple};
pub use fetch::ContentFetcher;
pub use pipeline::{PipelineRequest, PipelineResponse, TweetThread};
pub use text::{truncate_content, MAX_CONTENT_CHARS};
