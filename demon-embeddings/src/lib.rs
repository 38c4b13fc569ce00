//! Embedding vectors, providers, and similarity.
//!
//! Providers implement [`EmbeddingProvider`]. [`HashingEmbedder`] runs fully
//! offline and is the default; [`OllamaEmbedder`] talks to a local daemon.
//! [`embed_with_timeout`] bounds any provider call so query analysis can degrade
//! instead of stalling.

#![warn(missing_docs, clippy::pedantic)]

pub mod embeddings;
pub mod error;
pub mod ollama;
pub mod provider;
pub mod similarity;

mod http_client;

pub use embeddings::EmbeddingVector;
pub use error::{EmbeddingError, EmbeddingResult};
pub use ollama::{OllamaConfig, OllamaEmbedder};
pub use provider::{EmbeddingProvider, HashingEmbedder, embed_with_timeout};
pub use similarity::cosine_similarity;
