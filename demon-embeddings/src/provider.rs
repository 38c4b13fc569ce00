//! Embedding provider interface and the built-in deterministic provider.

use std::time::Duration;

use async_trait::async_trait;
use demon_primitives::text::tokenize;
use tokio::time::timeout;

use crate::embeddings::EmbeddingVector;
use crate::{EmbeddingError, EmbeddingResult};

/// Interface for services that turn text into embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier; identical input and model must yield identical vectors.
    fn model(&self) -> &str;

    /// Dimensionality of the vectors this provider returns.
    fn dimensions(&self) -> usize;

    /// Embeds `text`.
    async fn embed(&self, text: &str) -> EmbeddingResult<EmbeddingVector>;
}

/// Embeds `text` with `provider`, failing if the call exceeds `limit`.
///
/// # Errors
///
/// Returns [`EmbeddingError::Timeout`] when the deadline elapses,
/// [`EmbeddingError::DimensionMismatch`] when the provider returns a vector of the
/// wrong size, and propagates any provider error.
pub async fn embed_with_timeout(
    provider: &dyn EmbeddingProvider,
    text: &str,
    limit: Duration,
) -> EmbeddingResult<EmbeddingVector> {
    let vector = timeout(limit, provider.embed(text))
        .await
        .map_err(|_| EmbeddingError::Timeout { after: limit })??;

    if vector.len() != provider.dimensions() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: provider.dimensions(),
            actual: vector.len(),
        });
    }
    Ok(vector)
}

/// Offline provider based on signed feature hashing of word unigrams and bigrams.
///
/// Quality is far below a learned model but it is deterministic, needs no network,
/// and places texts sharing vocabulary close together.
#[derive(Clone, Debug)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Model name reported by [`EmbeddingProvider::model`].
    pub const MODEL: &'static str = "feature-hashing-v1";

    /// Creates a provider producing vectors of `dimensions` components.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Configuration`] when `dimensions` is zero.
    pub fn new(dimensions: usize) -> EmbeddingResult<Self> {
        if dimensions == 0 {
            return Err(EmbeddingError::configuration(
                "hashing embedder needs at least one dimension",
            ));
        }
        Ok(Self { dimensions })
    }

    /// Synchronous embedding used by the async trait method.
    #[must_use]
    pub fn embed_now(&self, text: &str) -> EmbeddingVector {
        let tokens = tokenize(text);
        let mut values = vec![0.0_f32; self.dimensions];

        let unigrams = tokens.iter().map(|token| fnv1a(token.as_bytes()));
        let bigrams = tokens.windows(2).map(|pair| {
            let joined = format!("{} {}", pair[0], pair[1]);
            fnv1a(joined.as_bytes())
        });

        for (hash, weight) in unigrams
            .map(|h| (h, 1.0_f32))
            .chain(bigrams.map(|h| (h, 0.5_f32)))
        {
            #[allow(clippy::cast_possible_truncation)]
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            values[index] += sign * weight;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut values {
                *value /= norm;
            }
        }

        EmbeddingVector::new(values).unwrap_or_else(|_| EmbeddingVector::zeros(self.dimensions))
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model(&self) -> &str {
        Self::MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<EmbeddingVector> {
        Ok(self.embed_now(text))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}
