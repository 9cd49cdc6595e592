//! The Vera enrichment pipeline.
//!
//! Every inbound chat message is turned into a [`PipelineResponse`]:
//!
//! 1. **Classify** the URLs it contains
//! 2. **Summarize** generic links and **draft threads** from social posts
//! 3. **Extract** knowledge triples and remember the message
//! 4. **Reply** conversationally when the message calls for it
//!
//! Platform adapters (gateway, webhook, CLI) only normalize input and render
//! output; all the work happens here.
//!
//! [`PipelineResponse`]: vera_core::PipelineResponse

pub mod generate;
pub mod knowledge;
pub mod pipeline;
pub mod summaries;
pub mod tweets;
pub mod urls;
pub mod welcome;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use generate::Generator;
pub use knowledge::{KnowledgeExtractor, format_knowledge};
pub use pipeline::Pipeline;
pub use urls::{extract_urls, is_tweet_url, to_mirror_url};
pub use welcome::welcome;
