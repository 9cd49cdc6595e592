//! Network capabilities for Vera.
//!
//! - [`HttpFetcher`] retrieves linked pages for summarization and thread
//!   reconstruction
//! - [`HttpExtractionService`] talks to an optional structured-extraction
//!   service

pub mod extraction_service;
pub mod http_fetch;

pub use extraction_service::HttpExtractionService;
pub use http_fetch::HttpFetcher;
