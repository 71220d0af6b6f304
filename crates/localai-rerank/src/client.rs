use async_trait::async_trait;
use localai_core::{
    Document, DocumentCompressor, HttpClients, HttpTransport, ProviderError, RELEVANCE_SCORE_KEY,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::RerankConfig;
use crate::types::{RerankOptions, RerankResult, RerankSource};

const UNKNOWN_RERANK_ERROR: &str = "Unknown error from rerank API";

/// Rerank adapter for a LocalAI `/v1/rerank` endpoint.
///
/// Server ordering is kept as-is and `top_n` is forwarded, not enforced.
/// HTTP clients are created lazily and released with
/// [`RerankClient::close_blocking`] / [`RerankClient::close`].
#[derive(Debug)]
pub struct RerankClient {
    config: RerankConfig,
    transport: HttpTransport,
}

impl RerankClient {
    pub fn new(config: RerankConfig) -> Result<Self, ProviderError> {
        Self::with_http_clients(config, HttpClients::default())
    }

    pub fn with_http_clients(
        config: RerankConfig,
        clients: HttpClients,
    ) -> Result<Self, ProviderError> {
        config.validate()?;
        let transport =
            HttpTransport::new(config.http_settings(), config.credentials(), clients)?;
        Ok(Self { config, transport })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(RerankConfig::builder().build()?)
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    fn payload<'a, D: RerankSource>(
        &'a self,
        documents: &'a [D],
        query: &'a str,
        options: &'a RerankOptions,
    ) -> RerankPayload<'a> {
        RerankPayload {
            query,
            documents: documents.iter().map(RerankSource::rerank_text).collect(),
            model: options.model.as_deref().unwrap_or(&self.config.model),
            top_n: options.top_n.resolve(self.config.top_n),
        }
    }

    /// Scores `documents` against `query`.
    ///
    /// An empty `documents` slice returns an empty list without touching the
    /// network.
    pub async fn rerank<D: RerankSource + Sync>(
        &self,
        documents: &[D],
        query: &str,
        options: &RerankOptions,
    ) -> Result<Vec<RerankResult>, ProviderError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let payload = self.payload(documents, query, options);
        debug!(
            model = payload.model,
            documents = documents.len(),
            top_n = ?payload.top_n,
            "reranking documents"
        );
        let parsed: RerankApiResponse = self
            .transport
            .post_json(&self.config.endpoint(), &payload)
            .await?;
        parsed.into_results()
    }

    /// Blocking form of [`RerankClient::rerank`]. Must not be called from
    /// inside an async runtime.
    pub fn rerank_blocking<D: RerankSource>(
        &self,
        documents: &[D],
        query: &str,
        options: &RerankOptions,
    ) -> Result<Vec<RerankResult>, ProviderError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let payload = self.payload(documents, query, options);
        debug!(
            model = payload.model,
            documents = documents.len(),
            top_n = ?payload.top_n,
            "reranking documents"
        );
        let parsed: RerankApiResponse = self
            .transport
            .post_json_blocking(&self.config.endpoint(), &payload)?;
        parsed.into_results()
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

/// Picks each scored entry out of `documents` (the original, un-normalised
/// input) and returns copies annotated with `relevance_score`.
///
/// The input documents are never modified.
pub fn build_compressed_documents(
    documents: &[Document],
    results: &[RerankResult],
) -> Result<Vec<Document>, ProviderError> {
    results
        .iter()
        .map(|res| {
            let original = documents.get(res.index).ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "rerank index {} out of range for {} documents",
                    res.index,
                    documents.len()
                ))
            })?;
            let mut doc = original.clone();
            doc.metadata
                .insert(RELEVANCE_SCORE_KEY.to_string(), Value::from(res.relevance_score));
            Ok(doc)
        })
        .collect()
}

#[async_trait]
impl DocumentCompressor for RerankClient {
    type Error = ProviderError;

    async fn compress_documents(
        &self,
        documents: &[Document],
        query: &str,
    ) -> Result<Vec<Document>, ProviderError> {
        let results = self
            .rerank(documents, query, &RerankOptions::default())
            .await?;
        build_compressed_documents(documents, &results)
    }

    fn compress_documents_blocking(
        &self,
        documents: &[Document],
        query: &str,
    ) -> Result<Vec<Document>, ProviderError> {
        let results = self.rerank_blocking(documents, query, &RerankOptions::default())?;
        build_compressed_documents(documents, &results)
    }
}

#[derive(Debug, Serialize)]
struct RerankPayload<'a> {
    query: &'a str,
    documents: Vec<&'a str>,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RerankApiResponse {
    #[serde(default)]
    results: Option<Vec<RerankResult>>,
    #[serde(default)]
    detail: Option<Value>,
}

impl RerankApiResponse {
    fn into_results(self) -> Result<Vec<RerankResult>, ProviderError> {
        match self.results {
            Some(results) => Ok(results),
            None => {
                let detail = match self.detail {
                    Some(Value::String(msg)) => msg,
                    Some(Value::Null) | None => UNKNOWN_RERANK_ERROR.to_string(),
                    Some(other) => other.to_string(),
                };
                Err(ProviderError::InvalidResponse(detail))
            }
        }
    }
}
