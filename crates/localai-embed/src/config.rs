use std::time::Duration;

use localai_core::{
    API_BASE_ENV, API_KEY_ENV, Credentials, HttpSettings, ORGANIZATION_ENV, PROXY_ENV,
    ProcessEnv, ProviderError, SettingsSource, require_setting, resolve_setting,
};
use serde_json::{Map, Value};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_EMBEDDING_MAX_RETRIES: u32 = 6;
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(15);

/// Names `model_kwargs` may not use: the request's own fields plus every
/// named configuration field.
const RESERVED_KWARGS: &[&str] = &[
    "model",
    "input",
    "api_key",
    "api_base",
    "organization",
    "chunk_size",
    "max_retries",
    "timeout",
    "proxy",
    "model_kwargs",
];

#[derive(Clone)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub organization: Option<String>,
    /// Advisory batch size. Every call is still sent as a single request.
    pub chunk_size: usize,
    pub max_retries: u32,
    pub timeout: Duration,
    pub proxy: Option<String>,
    /// Extra parameters merged verbatim into the request body.
    pub model_kwargs: Map<String, Value>,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("organization", &self.organization)
            .field("chunk_size", &self.chunk_size)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .field("model_kwargs", &self.model_kwargs)
            .finish()
    }
}

impl EmbeddingConfig {
    /// Config with every optional field at its default and no API key.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_key: None,
            api_base: api_base.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            organization: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_EMBEDDING_MAX_RETRIES,
            timeout: DEFAULT_EMBEDDING_TIMEOUT,
            proxy: None,
            model_kwargs: Map::new(),
        }
    }

    pub fn builder() -> EmbeddingConfigBuilder {
        EmbeddingConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.api_base.trim().is_empty() {
            return Err(ProviderError::Config(
                "api_base must not be empty".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ProviderError::Validation(
                "model must not be empty".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ProviderError::Validation(
                "chunk_size must be at least 1".to_string(),
            ));
        }

        let mut collisions = self
            .model_kwargs
            .keys()
            .filter(|k| RESERVED_KWARGS.contains(&k.as_str()))
            .map(String::as_str)
            .collect::<Vec<_>>();
        if !collisions.is_empty() {
            collisions.sort_unstable();
            return Err(ProviderError::Validation(format!(
                "parameters {collisions:?} should be specified explicitly, not through model_kwargs"
            )));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.api_base.trim_end_matches('/'))
    }

    pub(crate) fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: self.timeout,
            max_retries: self.max_retries,
            proxy: self.proxy.clone(),
        }
    }

    pub(crate) fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            organization: self.organization.clone(),
        }
    }
}

/// Collects explicit settings; [`EmbeddingConfigBuilder::build`] fills the
/// rest from the environment and documented defaults.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingConfigBuilder {
    api_key: Option<String>,
    api_base: Option<String>,
    model: Option<String>,
    organization: Option<String>,
    chunk_size: Option<usize>,
    max_retries: Option<u32>,
    timeout: Option<Duration>,
    proxy: Option<String>,
    model_kwargs: Map<String, Value>,
}

impl EmbeddingConfigBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn model_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.model_kwargs.insert(key.into(), value.into());
        self
    }

    pub fn model_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.model_kwargs.extend(kwargs);
        self
    }

    /// Resolves against the process environment.
    pub fn build(self) -> Result<EmbeddingConfig, ProviderError> {
        self.build_from(&ProcessEnv)
    }

    /// Resolves against `source`: explicit value, then `source`, then default.
    pub fn build_from(self, source: &dyn SettingsSource) -> Result<EmbeddingConfig, ProviderError> {
        let config = EmbeddingConfig {
            api_key: resolve_setting(self.api_key, API_KEY_ENV, source),
            api_base: require_setting(self.api_base, "api_base", API_BASE_ENV, source)?,
            model: self
                .model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            organization: resolve_setting(self.organization, ORGANIZATION_ENV, source),
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            max_retries: self.max_retries.unwrap_or(DEFAULT_EMBEDDING_MAX_RETRIES),
            timeout: self.timeout.unwrap_or(DEFAULT_EMBEDDING_TIMEOUT),
            proxy: resolve_setting(self.proxy, PROXY_ENV, source),
            model_kwargs: self.model_kwargs,
        };
        config.validate()?;
        Ok(config)
    }
}
