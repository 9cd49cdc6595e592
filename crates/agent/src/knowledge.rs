//! Two-tier knowledge extraction.
//!
//! Tier 1 asks an optional [`KnowledgeLibrary`]; any failure or an empty
//! result falls through to tier 2, which asks the generator for a JSON array
//! of triples.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use vera_core::error::ProviderError;
use vera_core::knowledge::{AnnotatedDocument, ExtractOptions, KnowledgeLibrary, KnowledgeTriple};
use vera_core::text::truncate_content;

use crate::generate::Generator;

/// Most triples returned per message (and rendered per context).
pub const MAX_TRIPLES: usize = 5;

/// Extracts subject-predicate-object triples from chat messages.
#[derive(Clone)]
pub struct KnowledgeExtractor {
    generator: Generator,
    library: Option<Arc<dyn KnowledgeLibrary>>,
    options: ExtractOptions,
}

impl KnowledgeExtractor {
    pub fn new(generator: Generator) -> Self {
        let options = ExtractOptions {
            model_id: Some(generator.model().to_string()),
            ..ExtractOptions::default()
        };
        Self {
            generator,
            library: None,
            options,
        }
    }

    pub fn with_library(mut self, library: Arc<dyn KnowledgeLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Up to [`MAX_TRIPLES`] triples from `text`. Blank text costs nothing.
    pub async fn extract(&self, text: &str) -> Result<Vec<KnowledgeTriple>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        if let Some(triples) = self.extract_with_library(text).await {
            return Ok(triples);
        }

        self.extract_with_generator(text).await
    }

    async fn extract_with_library(&self, text: &str) -> Option<Vec<KnowledgeTriple>> {
        let library = self.library.as_ref()?;
        match library.extract(text, &self.options).await {
            Ok(docs) => {
                let triples = triples_from_documents(&docs);
                if triples.is_empty() {
                    debug!(library = library.name(), "Library found no triples, using generation");
                    None
                } else {
                    Some(triples)
                }
            }
            Err(e) => {
                debug!(library = library.name(), error = %e, "Library unavailable, using generation");
                None
            }
        }
    }

    async fn extract_with_generator(&self, text: &str) -> Result<Vec<KnowledgeTriple>, ProviderError> {
        let prompt = format!(
            "Extract up to {MAX_TRIPLES} knowledge triples (subject, predicate, object) from the message below. \
             Return strict JSON array, e.g., [{{\"subject\":\"Alice\",\"predicate\":\"enjoys\",\"object\":\"Rust\"}}]. \
             Message:\n{}",
            truncate_content(text)
        );
        let raw = self.generator.generate(&prompt).await?;
        Ok(parse_triples(&raw))
    }
}

/// Map library extractions onto triples, keeping the first [`MAX_TRIPLES`].
pub fn triples_from_documents(docs: &[AnnotatedDocument]) -> Vec<KnowledgeTriple> {
    docs.iter()
        .flat_map(|doc| doc.extractions.iter())
        .filter_map(|extraction| {
            let attr = |name: &str| {
                extraction
                    .attributes
                    .get(name)
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_text())
            };

            let predicate = attr("predicate")
                .or_else(|| attr("relation"))
                .unwrap_or_else(|| "says".to_string());
            let object = attr("object")
                .or_else(|| attr("target"))
                .unwrap_or_else(|| extraction.extraction_text.clone());
            let subject = attr("subject")
                .or_else(|| extraction.extraction_class.clone())
                .unwrap_or_else(|| "someone".to_string());

            if predicate.is_empty() || object.is_empty() {
                return None;
            }

            Some(KnowledgeTriple {
                subject,
                predicate,
                object,
                source: Some(extraction.extraction_text.clone()),
            })
        })
        .take(MAX_TRIPLES)
        .collect()
}

/// Parse a generated JSON array of triples.
///
/// Markdown code fences are stripped. Malformed JSON yields an empty list;
/// entries with a missing or empty field are dropped.
pub fn parse_triples(raw: &str) -> Vec<KnowledgeTriple> {
    let json = strip_code_fence(raw);
    let items: Vec<Value> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, raw, "Failed to parse generated knowledge triples");
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(|item| {
            Some(KnowledgeTriple::new(
                scalar_text(item.get("subject")?)?,
                scalar_text(item.get("predicate")?)?,
                scalar_text(item.get("object")?)?,
            ))
        })
        .take(MAX_TRIPLES)
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// `• subject predicate object` lines for at most [`MAX_TRIPLES`] triples.
pub fn format_knowledge(triples: &[KnowledgeTriple]) -> String {
    triples
        .iter()
        .take(MAX_TRIPLES)
        .map(|t| format!("• {} {} {}", t.subject, t.predicate, t.object))
        .collect::<Vec<_>>()
        .join("\n")
}
