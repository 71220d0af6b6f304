use std::time::Duration;

use localai_core::{
    API_BASE_ENV, API_KEY_ENV, Credentials, HttpSettings, PROXY_ENV, ProcessEnv, ProviderError,
    SettingsSource, require_setting, resolve_setting,
};

pub const DEFAULT_RERANK_MODEL: &str = "jina-reranker-v1-base-en";
pub const DEFAULT_TOP_N: usize = 3;
pub const DEFAULT_RERANK_MAX_RETRIES: u32 = 0;
pub const DEFAULT_RERANK_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Clone)]
pub struct RerankConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    /// Default result limit. `None` lets the server decide.
    pub top_n: Option<usize>,
    pub max_retries: u32,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl std::fmt::Debug for RerankConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("top_n", &self.top_n)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl RerankConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_key: None,
            api_base: api_base.into(),
            model: DEFAULT_RERANK_MODEL.to_string(),
            top_n: Some(DEFAULT_TOP_N),
            max_retries: DEFAULT_RERANK_MAX_RETRIES,
            timeout: DEFAULT_RERANK_TIMEOUT,
            proxy: None,
        }
    }

    pub fn builder() -> RerankConfigBuilder {
        RerankConfigBuilder::default()
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
        if self.top_n == Some(0) {
            return Err(ProviderError::Validation(
                "top_n must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/rerank", self.api_base.trim_end_matches('/'))
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
            organization: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RerankConfigBuilder {
    api_key: Option<String>,
    api_base: Option<String>,
    model: Option<String>,
    top_n: Option<Option<usize>>,
    max_retries: Option<u32>,
    timeout: Option<Duration>,
    proxy: Option<String>,
}

impl RerankConfigBuilder {
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

    /// `None` omits `top_n` from requests entirely.
    pub fn top_n(mut self, top_n: Option<usize>) -> Self {
        self.top_n = Some(top_n);
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

    pub fn build(self) -> Result<RerankConfig, ProviderError> {
        self.build_from(&ProcessEnv)
    }

    pub fn build_from(self, source: &dyn SettingsSource) -> Result<RerankConfig, ProviderError> {
        let config = RerankConfig {
            api_key: resolve_setting(self.api_key, API_KEY_ENV, source),
            api_base: require_setting(self.api_base, "api_base", API_BASE_ENV, source)?,
            model: self.model.unwrap_or_else(|| DEFAULT_RERANK_MODEL.to_string()),
            top_n: self.top_n.unwrap_or(Some(DEFAULT_TOP_N)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_RERANK_MAX_RETRIES),
            timeout: self.timeout.unwrap_or(DEFAULT_RERANK_TIMEOUT),
            proxy: resolve_setting(self.proxy, PROXY_ENV, source),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn base_url_is_kept_as_given() {
        let cfg = RerankConfig::builder()
            .api_key("random-string")
            .api_base("http://localhost:8080")
            .build_from(&HashMap::<&str, &str>::new())
            .expect("config");
        assert_eq!(cfg.api_base, "http://localhost:8080");
        assert_eq!(cfg.endpoint(), "http://localhost:8080/v1/rerank");
    }

    #[test]
    fn trailing_slash_is_trimmed_from_endpoint() {
        let cfg = RerankConfig::new("https://foo.bar/");
        assert_eq!(cfg.endpoint(), "https://foo.bar/v1/rerank");
    }

    #[test]
    fn defaults_and_environment() {
        let env = HashMap::from([(API_KEY_ENV, "k"), (API_BASE_ENV, "http://env")]);
        let cfg = RerankConfig::builder().build_from(&env).expect("config");
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.api_base, "http://env");
        assert_eq!(cfg.model, DEFAULT_RERANK_MODEL);
        assert_eq!(cfg.top_n, Some(DEFAULT_TOP_N));
        assert_eq!(cfg.max_retries, 0);
    }

    #[test]
    fn zero_top_n_fails_validation() {
        let err = RerankConfig::builder()
            .api_base("http://x")
            .top_n(Some(0))
            .build_from(&HashMap::<&str, &str>::new())
            .expect_err("top_n 0");
        assert!(matches!(err, ProviderError::Validation(_)));

        let mut cfg = RerankConfig::new("http://x");
        cfg.top_n = Some(0);
        assert!(matches!(cfg.validate(), Err(ProviderError::Validation(_))));
    }

    #[test]
    fn unset_top_n_is_allowed() {
        let cfg = RerankConfig::builder()
            .api_base("http://x")
            .top_n(None)
            .build_from(&HashMap::<&str, &str>::new())
            .expect("config");
        assert_eq!(cfg.top_n, None);
    }

    #[test]
    fn missing_base_url_is_a_configuration_error() {
        let err = RerankConfig::builder()
            .build_from(&HashMap::<&str, &str>::new())
            .expect_err("api_base required");
        assert!(matches!(err, ProviderError::Config(_)));
    }
}
