use async_trait::async_trait;
use localai_core::{Embeddings, HttpClients, HttpTransport, ProviderError};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::EmbeddingConfig;

/// Embeddings adapter for a LocalAI (OpenAI-compatible) `/v1/embeddings`
/// endpoint.
///
/// Each call sends the whole batch in one request; `chunk_size` does not
/// split it.
#[derive(Debug)]
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    transport: HttpTransport,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, ProviderError> {
        Self::with_http_clients(config, HttpClients::default())
    }

    /// Uses the supplied reqwest clients instead of building new ones.
    /// Combining them with a proxy is a configuration error.
    pub fn with_http_clients(
        config: EmbeddingConfig,
        clients: HttpClients,
    ) -> Result<Self, ProviderError> {
        config.validate()?;
        let transport =
            HttpTransport::new(config.http_settings(), config.credentials(), clients)?;
        Ok(Self { config, transport })
    }

    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(EmbeddingConfig::builder().build()?)
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    fn payload(&self, texts: &[String]) -> Map<String, Value> {
        if texts.len() > self.config.chunk_size {
            debug!(
                texts = texts.len(),
                chunk_size = self.config.chunk_size,
                "batch exceeds chunk_size; sending as a single request"
            );
        }

        let mut payload = Map::new();
        payload.insert(
            "model".to_string(),
            Value::String(self.config.model.clone()),
        );
        payload.insert(
            "input".to_string(),
            Value::Array(texts.iter().cloned().map(Value::String).collect()),
        );
        for (key, value) in &self.config.model_kwargs {
            payload.insert(key.clone(), value.clone());
        }
        payload
    }

    fn vectors(
        parsed: EmbeddingApiResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        if parsed.data.len() != expected {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {expected} embeddings, server returned {}",
                parsed.data.len()
            )));
        }

        let mut data = parsed.data;
        if data.iter().all(|it| it.index.is_some()) {
            data.sort_by_key(|it| it.index);
            if !data
                .iter()
                .enumerate()
                .all(|(pos, it)| it.index == Some(pos))
            {
                let indices: Vec<_> = data.iter().filter_map(|it| it.index).collect();
                return Err(ProviderError::InvalidResponse(format!(
                    "embedding indices {indices:?} do not cover 0..{expected}"
                )));
            }
        }
        Ok(data.into_iter().map(|it| it.embedding).collect())
    }

    /// Releases the blocking HTTP client. Safe to call repeatedly.
    pub fn close_blocking(&self) {
        self.transport.close_blocking();
    }

    /// Releases the async HTTP client. Safe to call repeatedly.
    pub async fn close(&self) {
        self.transport.close().await;
    }
}

#[async_trait]
impl Embeddings for EmbeddingClient {
    type Error = ProviderError;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.config.model, texts = texts.len(), "embedding documents");
        let payload = self.payload(texts);
        let parsed: EmbeddingApiResponse = self
            .transport
            .post_json(&self.config.endpoint(), &payload)
            .await?;
        Self::vectors(parsed, texts.len())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let vectors = self.embed_documents(&[text.to_string()]).await?;
        first_vector(vectors)
    }

    fn embed_documents_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.config.model, texts = texts.len(), "embedding documents");
        let payload = self.payload(texts);
        let parsed: EmbeddingApiResponse = self
            .transport
            .post_json_blocking(&self.config.endpoint(), &payload)?;
        Self::vectors(parsed, texts.len())
    }

    fn embed_query_blocking(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let vectors = self.embed_documents_blocking(&[text.to_string()])?;
        first_vector(vectors)
    }
}

fn first_vector(vectors: Vec<Vec<f32>>) -> Result<Vec<f32>, ProviderError> {
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("no embeddings in response".to_string()))
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}
