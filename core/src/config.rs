//! Client configuration resolved once at startup.

use std::env;

use crate::error::ApiError;

/// Environment variable selecting the backend base URL.
pub const BASE_URL_VAR: &str = "TASK_API_URL";

/// Base URL used when `TASK_API_URL` is unset or blank.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Build a config for an explicit base URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base URL must start with http:// or https://, got {base_url:?}"
            )));
        }
        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve the config through `lookup`, falling back to the default URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(BASE_URL_VAR) {
            Some(url) if !url.trim().is_empty() => {
                log::debug!("using {BASE_URL_VAR}={url}");
                Self::new(&url)
            }
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_uses_default() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn blank_variable_uses_default() {
        let config = ClientConfig::from_lookup(|_| Some("  ".to_string())).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn override_is_used_and_trailing_slash_stripped() {
        let config = ClientConfig::from_lookup(|key| {
            assert_eq!(key, BASE_URL_VAR);
            Some("https://tasks.example.com/".to_string())
        })
        .unwrap();
        assert_eq!(config.base_url, "https://tasks.example.com");
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = ClientConfig::from_lookup(|_| Some("localhost:8000".to_string())).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
