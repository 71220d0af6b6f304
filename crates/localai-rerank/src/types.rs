use localai_core::Document;
use serde::{Deserialize, Serialize};

/// One scored entry returned by the rerank endpoint.
///
/// `index` points into the caller's original input list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub index: usize,
    #[serde(alias = "score")]
    pub relevance_score: f64,
}

/// Result limit requested for a single rerank call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TopN {
    /// Use the client's configured `top_n`.
    #[default]
    Configured,
    /// At most this many results. Zero falls back to the configured value.
    Limit(usize),
    /// Send no limit, even if the client has one configured.
    Unbounded,
}

impl TopN {
    /// The `top_n` to put on the wire given the client's configured value.
    pub fn resolve(self, configured: Option<usize>) -> Option<usize> {
        match self {
            Self::Limit(n) if n > 0 => Some(n),
            Self::Unbounded => None,
            Self::Limit(_) | Self::Configured => configured,
        }
    }
}

/// Per-call overrides. Unset fields fall back to the client's configuration.
#[derive(Debug, Clone, Default)]
pub struct RerankOptions {
    pub model: Option<String>,
    pub top_n: TopN,
}

impl RerankOptions {
    pub fn top_n(top_n: usize) -> Self {
        Self {
            model: None,
            top_n: TopN::Limit(top_n),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            model: None,
            top_n: TopN::Unbounded,
        }
    }
}

/// Anything that can be sent to the reranker as text: plain strings or
/// documents.
pub trait RerankSource {
    fn rerank_text(&self) -> &str;
}

impl RerankSource for str {
    fn rerank_text(&self) -> &str {
        self
    }
}

impl RerankSource for String {
    fn rerank_text(&self) -> &str {
        self
    }
}

impl RerankSource for Document {
    fn rerank_text(&self) -> &str {
        &self.content
    }
}

impl<T: RerankSource + ?Sized> RerankSource for &T {
    fn rerank_text(&self) -> &str {
        (**self).rerank_text()
    }
}
