//! Embedding provider backed by a local `Ollama` daemon.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::embeddings::EmbeddingVector;
use crate::http_client::{HyperClient, build_https_client};
use crate::provider::EmbeddingProvider;
use crate::{EmbeddingError, EmbeddingResult};

/// Configuration for [`OllamaEmbedder`].
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OllamaConfig {
    /// Creates a configuration for `model`, which must produce `dimensions`-sized vectors.
    #[must_use]
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/".to_owned(),
            model: model.into(),
            dimensions,
            timeout: Duration::from_secs(5),
        }
    }

    /// Overrides the base URL of the daemon.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> EmbeddingResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the HTTP timeout for a single embedding call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Calls `POST {base}api/embeddings` on an `Ollama` daemon.
pub struct OllamaEmbedder {
    client: HyperClient,
    endpoint: Uri,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl fmt::Debug for OllamaEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaEmbedder")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OllamaEmbedder {
    /// Constructs a provider from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Configuration`] if the endpoint is invalid or the
    /// configured dimensionality is zero.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config: OllamaConfig) -> EmbeddingResult<Self> {
        if config.dimensions == 0 {
            return Err(EmbeddingError::configuration(
                "Ollama embedder needs at least one dimension",
            ));
        }
        let endpoint = format!("{}api/embeddings", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                EmbeddingError::configuration(format!("invalid Ollama endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            model: config.model.clone(),
            dimensions: config.dimensions,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<EmbeddingVector> {
        let payload = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let body = serde_json::to_vec(&payload).map_err(|err| {
            EmbeddingError::provider(format!("failed to encode Ollama request: {err}"))
        })?;

        let req = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| {
                EmbeddingError::transport(format!("failed to build Ollama request: {err}"))
            })?;

        let response = timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| EmbeddingError::Timeout {
                after: self.timeout,
            })?
            .map_err(|err| EmbeddingError::transport(format!("Ollama request failed: {err}")))?;

        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            EmbeddingError::transport(format!("failed to read Ollama response: {err}"))
        })?;

        if !status.is_success() {
            let reason = String::from_utf8_lossy(&bytes).to_string();
            return Err(EmbeddingError::provider(format!(
                "Ollama returned {status}: {reason}"
            )));
        }

        let vector = decode_response(&bytes)?;
        debug!(model = %self.model, dimensions = vector.len(), "received embedding");
        Ok(vector)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    error: Option<String>,
}

fn decode_response(bytes: &[u8]) -> EmbeddingResult<EmbeddingVector> {
    let response: EmbeddingResponse = serde_json::from_slice(bytes).map_err(|err| {
        EmbeddingError::provider(format!("failed to decode Ollama response: {err}"))
    })?;

    if let Some(error) = response.error {
        return Err(EmbeddingError::provider(error));
    }
    let values = response
        .embedding
        .ok_or_else(|| EmbeddingError::provider("Ollama response has no embedding"))?;
    EmbeddingVector::new(values)
}

fn sanitize_base_url(input: &str) -> EmbeddingResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(EmbeddingError::configuration(
            "Ollama base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>().map_err(|err| {
        EmbeddingError::configuration(format!("invalid Ollama base URL: {err}"))
    })?;
    Ok(base)
}
