//! Embedding and rerank adapters for LocalAI-compatible inference servers.
//!
//! [`EmbeddingClient`] implements [`Embeddings`] and [`RerankClient`]
//! implements [`DocumentCompressor`]. Both resolve their settings once at
//! construction (explicit value, then `OPENAI_*` environment variables, then
//! defaults) and expose blocking and async entry points.

pub use localai_core::{
    Document, DocumentCompressor, Embeddings, HttpClients, Metadata, ProcessEnv, ProviderError,
    RELEVANCE_SCORE_KEY, SettingsSource, reqwest,
};
pub use localai_embed::{EmbeddingClient, EmbeddingConfig, EmbeddingConfigBuilder};
pub use localai_rerank::{
    RerankClient, RerankConfig, RerankConfigBuilder, RerankOptions, RerankResult, RerankSource,
    TopN, build_compressed_documents,
};
