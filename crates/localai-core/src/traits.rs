use async_trait::async_trait;

use crate::document::Document;

/// Produces one embedding vector per input text, preserving input order.
///
/// The `*_blocking` methods must not be called from inside an async runtime.
#[async_trait]
pub trait Embeddings: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, Self::Error>;

    fn embed_documents_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error>;

    fn embed_query_blocking(&self, text: &str) -> Result<Vec<f32>, Self::Error>;
}

/// Reduces and/or reorders a document list with respect to a query.
///
/// The `*_blocking` method must not be called from inside an async runtime.
#[async_trait]
pub trait DocumentCompressor: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn compress_documents(
        &self,
        documents: &[Document],
        query: &str,
    ) -> Result<Vec<Document>, Self::Error>;

    fn compress_documents_blocking(
        &self,
        documents: &[Document],
        query: &str,
    ) -> Result<Vec<Document>, Self::Error>;
}
