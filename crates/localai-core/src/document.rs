use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form document metadata.
pub type Metadata = Map<String, Value>;

/// Metadata key written by rerankers.
pub const RELEVANCE_SCORE_KEY: &str = "relevance_score";

/// A unit of retrievable text plus arbitrary metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(alias = "page_content")]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Adds one metadata entry, replacing any previous value for `key`.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Score attached by a reranker, if any.
    pub fn relevance_score(&self) -> Option<f64> {
        self.metadata
            .get(RELEVANCE_SCORE_KEY)
            .and_then(Value::as_f64)
    }
}

impl From<&str> for Document {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for Document {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}
