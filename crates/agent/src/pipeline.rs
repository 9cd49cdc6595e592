//! The message-enrichment pipeline.
//!
//! One pass per inbound message:
//!
//! 1. **Remember** the sender (profile upsert, previous profile kept aside)
//! 2. **Classify** URLs into social posts and generic links
//! 3. **Summarize** generic links, then **draft threads** from posts, in input order
//! 4. **Extract** knowledge and append the message to the server's log
//! 5. **Recall** recent facts about the sender
//! 6. **Reply** when the message has no URLs or mentions the assistant
//! 7. **Render** sections for the adapter

use std::sync::Arc;

use tracing::{debug, info, instrument};
use vera_core::fetch::ContentFetcher;
use vera_core::knowledge::{KnowledgeLibrary, KnowledgeTriple};
use vera_core::memory::{MemoryRecord, PersonMemory};
use vera_core::pipeline::{PipelineRequest, PipelineResponse, TweetThread};
use vera_core::text::server_or_default;
use vera_core::Result;
use vera_memory::MemoryStore;
use vera_memory::store::DEFAULT_RECENT_LIMIT;

use crate::generate::Generator;
use crate::knowledge::{KnowledgeExtractor, MAX_TRIPLES, format_knowledge};
use crate::summaries::summarize_link;
use crate::tweets::build_thread;
use crate::urls::{DEFAULT_MIRROR_BASE, extract_urls, is_tweet_url};

/// The only section when nothing else was produced.
pub const FALLBACK_SECTION: &str =
    "I did not find URLs, but I am ready to help with summaries or questions.";

/// Orchestrates one enrichment pass per message.
#[derive(Clone)]
pub struct Pipeline {
    generator: Generator,
    fetcher: Arc<dyn ContentFetcher>,
    memory: MemoryStore,
    knowledge: KnowledgeExtractor,
    mirror_base: String,
    agent_name: String,
}

impl Pipeline {
    pub fn new(generator: Generator, fetcher: Arc<dyn ContentFetcher>, memory: MemoryStore) -> Self {
        Self {
            knowledge: KnowledgeExtractor::new(generator.clone()),
            generator,
            fetcher,
            memory,
            mirror_base: DEFAULT_MIRROR_BASE.to_string(),
            agent_name: "Vera".to_string(),
        }
    }

    /// Try `library` before generation-based knowledge extraction.
    pub fn with_library(mut self, library: Arc<dyn KnowledgeLibrary>) -> Self {
        self.knowledge = self.knowledge.with_library(library);
        self
    }

    pub fn with_mirror_base(mut self, mirror_base: impl Into<String>) -> Self {
        self.mirror_base = mirror_base.into();
        self
    }

    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = agent_name.into();
        self
    }

    /// Wire every dependency from configuration.
    pub fn from_config(config: &vera_config::AppConfig) -> Result<Self> {
        let generator = Generator::from_config(config)?;
        let fetcher = Arc::new(vera_tools::HttpFetcher::from_config(config));
        let memory = MemoryStore::new(vera_memory::build_from_config(config));

        let mut pipeline = Self::new(generator, fetcher, memory)
            .with_mirror_base(&config.fetch.mirror_base_url)
            .with_agent_name(&config.agent_name);

        if let Some(service) = vera_tools::HttpExtractionService::from_config(config) {
            pipeline = pipeline.with_library(Arc::new(service));
        }

        Ok(pipeline)
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Run one message through the pipeline.
    ///
    /// Only generation failures are returned as errors; fetch, extraction
    /// and storage problems degrade the output instead.
    #[instrument(skip_all, fields(server = %request.server_id, user = %request.user_id))]
    pub async fn process(&self, request: &PipelineRequest) -> Result<PipelineResponse> {
        let previous = self
            .memory
            .get_profile(&request.server_id, &request.user_id)
            .await;
        self.memory
            .upsert_profile(
                &request.server_id,
                &request.user_id,
                &request.user_name,
                &request.message_text,
                previous.as_ref(),
            )
            .await;

        let urls = extract_urls(&request.message_text);
        let (tweet_urls, link_urls): (Vec<&String>, Vec<&String>) =
            urls.iter().partition(|url| is_tweet_url(url));
        debug!(links = link_urls.len(), posts = tweet_urls.len(), "Classified URLs");

        let mut link_summaries = Vec::with_capacity(link_urls.len());
        for url in link_urls {
            link_summaries.push(
                summarize_link(&self.generator, self.fetcher.as_ref(), url, &request.server_name).await?,
            );
        }

        let mut tweet_threads = Vec::with_capacity(tweet_urls.len());
        for url in tweet_urls {
            tweet_threads.push(
                build_thread(
                    &self.generator,
                    self.fetcher.as_ref(),
                    &self.mirror_base,
                    url,
                    &request.server_name,
                    &request.user_name,
                )
                .await?,
            );
        }

        let knowledge_triples = self.knowledge.extract(&request.message_text).await?;
        self.memory
            .append_record(MemoryRecord::now(
                &request.server_id,
                &request.user_id,
                &request.user_name,
                &request.message_text,
                knowledge_triples.clone(),
            ))
            .await;

        let knowledge_context = self.knowledge_context(request).await;

        let general_response = if urls.is_empty() || request.is_mentioned {
            let prompt = self.reply_prompt(request, previous.as_ref(), &knowledge_context);
            self.generator.generate(&prompt).await?
        } else {
            String::new()
        };

        let sections = render_sections(&link_summaries, &tweet_threads, &general_response);
        info!(
            sections = sections.len(),
            triples = knowledge_triples.len(),
            replied = !general_response.is_empty(),
            "Message processed"
        );

        Ok(PipelineResponse {
            sections,
            link_summaries,
            tweet_threads,
            general_response,
            knowledge_triples,
            knowledge_context,
        })
    }

    /// The last [`MAX_TRIPLES`] facts from the sender's recent records.
    async fn knowledge_context(&self, request: &PipelineRequest) -> Vec<KnowledgeTriple> {
        let recent = self
            .memory
            .recent(&request.server_id, Some(&request.user_id), DEFAULT_RECENT_LIMIT)
            .await;
        let mut facts: Vec<KnowledgeTriple> =
            recent.into_iter().flat_map(|r| r.knowledge).collect();
        let start = facts.len().saturating_sub(MAX_TRIPLES);
        facts.split_off(start)
    }

    fn reply_prompt(
        &self,
        request: &PipelineRequest,
        previous: Option<&PersonMemory>,
        knowledge_context: &[KnowledgeTriple],
    ) -> String {
        let conversation = previous
            .map(|p| p.last_message.as_str())
            .filter(|last| !last.is_empty() && *last != request.message_text)
            .map(|last| format!("Last time you said: \"{last}\". "))
            .unwrap_or_default();

        let facts = if knowledge_context.is_empty() {
            String::new()
        } else {
            format!(" Known recent facts: {}", format_knowledge(knowledge_context))
        };

        format!(
            "You are {agent}, a kind and fun multiuser assistant on a Discord server named \"{server}\". \
             User \"{user}\" sent: \"{message}\". {conversation}\
             Respond concisely with awareness of the server context and invite follow-ups if helpful.{facts}",
            agent = self.agent_name,
            server = server_or_default(&request.server_name),
            user = request.user_name,
            message = request.message_text,
        )
    }
}

/// Output sections in display order; never empty.
pub fn render_sections(
    link_summaries: &[String],
    tweet_threads: &[TweetThread],
    general_response: &str,
) -> Vec<String> {
    let mut sections = Vec::new();

    if !link_summaries.is_empty() {
        sections.push(format!("**Link summaries:**\n{}", link_summaries.join("\n")));
    }

    if !tweet_threads.is_empty() {
        let drafts = tweet_threads
            .iter()
            .map(|t| format!("From {} (via mirror):\n{}", t.url, t.thread))
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("**Thread drafts:**\n{drafts}"));
    }

    if !general_response.is_empty() {
        sections.push(general_response.to_string());
    }

    if sections.is_empty() {
        sections.push(FALLBACK_SECTION.to_string());
    }

    sections
}
