use std::collections::HashMap;

use crate::error::ProviderError;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const API_BASE_ENV: &str = "OPENAI_API_BASE";
pub const PROXY_ENV: &str = "OPENAI_PROXY";
pub const ORGANIZATION_ENV: &str = "OPENAI_ORGANIZATION";

/// Environment-style key/value lookup used when a setting is not passed explicitly.
pub trait SettingsSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads settings from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl SettingsSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl SettingsSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl SettingsSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|v| (*v).to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Explicit value first, then `source[key]`. Empty strings count as unset.
pub fn resolve_setting(
    explicit: Option<String>,
    key: &str,
    source: &dyn SettingsSource,
) -> Option<String> {
    non_empty(explicit).or_else(|| non_empty(source.get(key)))
}

/// Like [`resolve_setting`], but a missing value is a configuration error.
pub fn require_setting(
    explicit: Option<String>,
    field: &str,
    key: &str,
    source: &dyn SettingsSource,
) -> Result<String, ProviderError> {
    resolve_setting(explicit, key, source).ok_or_else(|| {
        ProviderError::Config(format!(
            "{field} is not configured; pass it explicitly or set {key}"
        ))
    })
}
