use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Connection-level settings shared by the blocking and async clients.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub proxy: Option<String>,
}

/// Credentials attached to every outbound request.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub organization: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("organization", &self.organization)
            .finish()
    }
}

/// Caller-supplied HTTP clients used instead of building new ones.
#[derive(Debug, Clone, Default)]
pub struct HttpClients {
    pub client: Option<reqwest::Client>,
    pub blocking_client: Option<reqwest::blocking::Client>,
}

impl HttpClients {
    fn is_empty(&self) -> bool {
        self.client.is_none() && self.blocking_client.is_none()
    }
}

/// Lazily initialised blocking and async HTTP clients plus the retrying
/// JSON `POST` both adapters are built on.
///
/// Each client is created on first use under a lock and released by
/// [`HttpTransport::close_blocking`] / [`HttpTransport::close`]. A closed
/// transport builds a fresh client the next time it is used.
pub struct HttpTransport {
    settings: HttpSettings,
    credentials: Credentials,
    injected: HttpClients,
    client: Mutex<Option<reqwest::Client>>,
    blocking_client: Mutex<Option<reqwest::blocking::Client>>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("settings", &self.settings)
            .field("credentials", &self.credentials)
            .field("client_open", &self.client.lock().is_some())
            .field("blocking_client_open", &self.blocking_client.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(
        settings: HttpSettings,
        credentials: Credentials,
        injected: HttpClients,
    ) -> Result<Self, ProviderError> {
        if let Some(proxy) = &settings.proxy {
            if !injected.is_empty() {
                return Err(ProviderError::Config(format!(
                    "cannot set proxy {proxy:?} when an HTTP client is supplied"
                )));
            }
            reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| ProviderError::Config(format!("invalid proxy url {proxy:?}: {e}")))?;
        }

        Ok(Self {
            settings,
            credentials,
            injected,
            client: Mutex::new(None),
            blocking_client: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    pub fn is_open(&self) -> bool {
        self.client.lock().is_some()
    }

    pub fn is_blocking_open(&self) -> bool {
        self.blocking_client.lock().is_some()
    }

    fn proxy(&self) -> Result<Option<reqwest::Proxy>, ProviderError> {
        self.settings
            .proxy
            .as_deref()
            .map(reqwest::Proxy::all)
            .transpose()
            .map_err(|e| ProviderError::Config(format!("invalid proxy url: {e}")))
    }

    fn client(&self) -> Result<reqwest::Client, ProviderError> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = match &self.injected.client {
            Some(client) => client.clone(),
            None => {
                let mut builder = reqwest::Client::builder().timeout(self.settings.timeout);
                if let Some(proxy) = self.proxy()? {
                    builder = builder.proxy(proxy);
                }
                builder.build()?
            }
        };
        debug!(
            injected = self.injected.client.is_some(),
            "initialised async http client"
        );
        *slot = Some(client.clone());
        Ok(client)
    }

    fn blocking_client(&self) -> Result<reqwest::blocking::Client, ProviderError> {
        let mut slot = self.blocking_client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = match &self.injected.blocking_client {
            Some(client) => client.clone(),
            None => {
                let mut builder =
                    reqwest::blocking::Client::builder().timeout(self.settings.timeout);
                if let Some(proxy) = self.proxy()? {
                    builder = builder.proxy(proxy);
                }
                builder.build()?
            }
        };
        debug!(
            injected = self.injected.blocking_client.is_some(),
            "initialised blocking http client"
        );
        *slot = Some(client.clone());
        Ok(client)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(8))
            .with_max_elapsed_time(None)
            .build()
    }

    fn classify<T>(
        &self,
        outcome: Result<T, ProviderError>,
        attempt: u32,
        url: &str,
    ) -> Result<T, backoff::Error<ProviderError>> {
        match outcome {
            Ok(value) => Ok(value),
            Err(err) if err.is_retryable() && attempt <= self.settings.max_retries => {
                warn!(
                    url,
                    attempt,
                    max_retries = self.settings.max_retries,
                    error = %err,
                    "request failed, retrying"
                );
                Err(backoff::Error::transient(err))
            }
            Err(err) => Err(backoff::Error::permanent(err)),
        }
    }

    /// Sends `body` as JSON and decodes a successful response as `T`.
    ///
    /// Must not be called from inside an async runtime.
    pub fn post_json_blocking<B, T>(&self, url: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let client = self.blocking_client()?;
        let mut attempt = 0_u32;
        let text = backoff::retry(self.backoff(), || {
            attempt += 1;
            let mut request = client.post(url).json(body);
            if let Some(key) = &self.credentials.api_key {
                request = request.bearer_auth(key);
            }
            if let Some(org) = &self.credentials.organization {
                request = request.header("OpenAI-Organization", org);
            }
            debug!(url, attempt, "sending blocking request");
            let outcome = request
                .send()
                .map_err(ProviderError::from)
                .and_then(read_blocking);
            self.classify(outcome, attempt, url)
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })?;

        Ok(serde_json::from_str(&text)?)
    }

    /// Sends `body` as JSON and decodes a successful response as `T`.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let client = self.client()?;
        let mut attempt = 0_u32;
        let text = backoff::future::retry(self.backoff(), || {
            attempt += 1;
            let current = attempt;
            let mut request = client.post(url).json(body);
            if let Some(key) = &self.credentials.api_key {
                request = request.bearer_auth(key);
            }
            if let Some(org) = &self.credentials.organization {
                request = request.header("OpenAI-Organization", org);
            }
            debug!(url, attempt = current, "sending request");
            async move {
                let outcome = match request.send().await {
                    Ok(res) => read_async(res).await,
                    Err(err) => Err(ProviderError::from(err)),
                };
                self.classify(outcome, current, url)
            }
        })
        .await?;

        Ok(serde_json::from_str(&text)?)
    }

    /// Releases the blocking client. Safe to call repeatedly.
    ///
    /// Must not be called from inside an async runtime while a blocking
    /// client is open.
    pub fn close_blocking(&self) {
        let released = self.blocking_client.lock().take();
        if released.is_some() {
            debug!("closed blocking http client");
        }
    }

    /// Releases the async client. Safe to call repeatedly.
    #[allow(clippy::unused_async)]
    pub async fn close(&self) {
        let released = self.client.lock().take();
        if released.is_some() {
            debug!("closed async http client");
        }
    }
}

fn read_blocking(res: reqwest::blocking::Response) -> Result<String, ProviderError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(res.text()?)
}

async fn read_async(res: reqwest::Response) -> Result<String, ProviderError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(res.text().await?)
}
