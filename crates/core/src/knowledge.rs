//! Knowledge triples and the optional structured-extraction capability.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ExtractionError;

/// A subject-predicate-object fact derived from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,

    /// The text span the triple was extracted from, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl KnowledgeTriple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            source: None,
        }
    }
}

/// An attribute value returned by an extraction library.
///
/// Libraries are loose about attribute types, so any JSON value is kept
/// and stringified on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeValue(pub serde_json::Value);

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Stringify: scalars as text, arrays joined with `", "`, null as empty.
    pub fn to_text(&self) -> String {
        match &self.0 {
            serde_json::Value::Array(items) => items
                .iter()
                .map(scalar_text)
                .collect::<Vec<_>>()
                .join(", "),
            other => scalar_text(other),
        }
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self(serde_json::Value::String(value.to_string()))
    }
}

/// A single extraction within an annotated document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_class: Option<String>,

    pub extraction_text: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, AttributeValue>,
}

/// A document annotated with extractions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub extractions: Vec<Extraction>,
}

/// Options passed to the extraction library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    pub prompt_description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    pub temperature: f32,

    pub max_tokens: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            prompt_description:
                "Extract subject, predicate, object triples that capture facts and opinions.".into(),
            model_id: None,
            temperature: 0.05,
            max_tokens: 256,
        }
    }
}

/// An external structured-extraction capability.
///
/// Optional: the knowledge extractor treats any error as "unavailable" and
/// falls back to generation-based extraction.
#[async_trait]
pub trait KnowledgeLibrary: Send + Sync {
    /// Library name, for logs.
    fn name(&self) -> &str;

    async fn extract(
        &self,
        text: &str,
        options: &ExtractOptions,
    ) -> std::result::Result<Vec<AnnotatedDocument>, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_accept_strings_and_lists() {
        let json = serde_json::json!({
            "extractionClass": "person",
            "extractionText": "Megan will bring coffee",
            "attributes": { "predicate": "brings", "object": ["coffee", "cake"] }
        });
        let extraction: Extraction = serde_json::from_value(json).unwrap();
        assert_eq!(extraction.attributes["predicate"].to_text(), "brings");
        assert_eq!(extraction.attributes["object"].to_text(), "coffee, cake");
    }

    #[test]
    fn non_string_attributes_are_stringified() {
        let docs: Vec<AnnotatedDocument> = serde_json::from_value(serde_json::json!([{
            "extractions": [
                {
                    "extractionText": "alice is 30",
                    "attributes": {"predicate": "is aged", "object": 30, "confidence": 0.92}
                },
                {
                    "extractionText": "bob likes tea",
                    "attributes": {"predicate": "likes", "object": "tea", "verified": true}
                },
                {
                    "extractionText": "scores",
                    "attributes": {"object": [1, "two", false], "subject": null}
                }
            ]
        }]))
        .unwrap();

        let attrs = &docs[0].extractions[0].attributes;
        assert_eq!(attrs["object"].to_text(), "30");
        assert_eq!(attrs["confidence"].to_text(), "0.92");
        assert_eq!(docs[0].extractions[1].attributes["verified"].to_text(), "true");

        let attrs = &docs[0].extractions[2].attributes;
        assert_eq!(attrs["object"].to_text(), "1, two, false");
        assert!(attrs["subject"].is_null());
        assert_eq!(attrs["subject"].to_text(), "");
    }

    #[test]
    fn triple_source_is_optional_in_json() {
        let triple: KnowledgeTriple = serde_json::from_str(
            r#"{"subject":"Alice","predicate":"enjoys","object":"Rust"}"#,
        )
        .unwrap();
        assert_eq!(triple, KnowledgeTriple::new("Alice", "enjoys", "Rust"));
    }
}
