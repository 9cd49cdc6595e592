//! Generation provider implementations for Vera.
//!
//! All providers implement the `vera_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
