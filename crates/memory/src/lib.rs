//! Memory system implementations for Vera.
//!
//! Key-value backends plus the [`MemoryStore`] that keeps person profiles
//! and per-server rolling logs on top of them.

pub mod noop;
pub mod in_memory;
pub mod file_backend;
pub mod store;

pub use noop::NoopMemory;
pub use in_memory::InMemoryBackend;
pub use file_backend::FileBackend;
pub use store::MemoryStore;

use std::sync::Arc;
use vera_core::memory::KvStore;

/// Build the configured key-value backend.
pub fn build_from_config(config: &vera_config::AppConfig) -> Arc<dyn KvStore> {
    match config.memory.backend.as_str() {
        "file" => Arc::new(FileBackend::new(config.memory_path())),
        "none" => Arc::new(NoopMemory),
        _ => Arc::new(InMemoryBackend::new()),
    }
}
