//! Backend implementations for the [`Backend`](crate::traits::Backend) trait.

mod ollama;

pub use ollama::OllamaBackend;
