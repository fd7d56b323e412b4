//! Configuration types for the remote background removal client

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Image edit endpoint used when no override is configured
pub const DEFAULT_ENDPOINT: &str = "https://api.claid.ai/v1-beta1/image/edit";

/// Environment variable holding the service credential
pub const API_KEY_ENV: &str = "CLAID_API_KEY";

/// Environment variable overriding the edit endpoint
pub const API_URL_ENV: &str = "CLAID_API_URL";

/// Environment variable setting a request timeout in seconds
pub const TIMEOUT_ENV: &str = "CLAID_TIMEOUT_SECS";

/// Bearer credential for the image edit service
///
/// The secret never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a credential, returning `None` for blank input
    #[must_use]
    pub fn new<S: Into<String>>(key: S) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Raw secret, for building the authorization header
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Configuration for the remote background removal client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service credential; a missing key is reported when a removal is attempted
    #[serde(skip)]
    pub api_key: Option<ApiKey>,

    /// Image edit endpoint
    pub endpoint: String,

    /// Per-request timeout (None = HTTP client default)
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgremove_client::ClientConfig;
    ///
    /// let config = ClientConfig::builder()
    ///     .api_key("secret")
    ///     .endpoint("http://localhost:8080/image/edit")
    ///     .build()
    ///     .unwrap();
    /// assert!(config.api_key.is_some());
    /// ```
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Read configuration from the process environment
    ///
    /// An unset `CLAID_API_KEY` is not an error here; the client reports it
    /// as a configuration error on first use.
    ///
    /// # Errors
    /// - `CLAID_TIMEOUT_SECS` is not a positive integer
    /// - `CLAID_API_URL` is not an http(s) URL
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// # Errors
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(key) = lookup(API_KEY_ENV) {
            builder = builder.api_key(key);
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            builder = builder.endpoint(url.trim());
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                BgRemovalError::invalid_config(format!(
                    "{TIMEOUT_ENV} must be a whole number of seconds, got '{raw}'"
                ))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Endpoint is not an http:// or https:// URL
    /// - Timeout is zero
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(BgRemovalError::invalid_config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(BgRemovalError::invalid_config(
                "timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Credential, or the configuration error raised when it is absent
    ///
    /// # Errors
    /// `MissingCredential` when no key was configured
    pub fn require_api_key(&self) -> Result<&ApiKey> {
        self.api_key
            .as_ref()
            .ok_or_else(|| BgRemovalError::missing_credential(API_KEY_ENV))
    }
}

/// Builder for `ClientConfig`
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the service credential (blank keys count as unset)
    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.api_key = ApiKey::new(key);
        self
    }

    /// Set the image edit endpoint
    #[must_use]
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set a per-request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// See [`ClientConfig::validate`].
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.api_key.is_none());
        assert!(config.timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV, " secret "),
            (API_URL_ENV, "http://127.0.0.1:9000/edit"),
            (TIMEOUT_ENV, "30"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_ref().unwrap().expose(), "secret");
        assert_eq!(config.endpoint, "http://127.0.0.1:9000/edit");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_key_is_reported_on_use() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        let err = config.require_api_key().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "CLAID_API_KEY is not configured.");

        let blank = ClientConfig::builder().api_key("   ").build().unwrap();
        assert!(blank.require_api_key().is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ClientConfig::from_lookup(lookup_from(&[(TIMEOUT_ENV, "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(TIMEOUT_ENV, "0")])).is_err());
        assert!(ClientConfig::builder().endpoint("ftp://x/edit").build().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ClientConfig::builder().api_key("top-secret").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("ApiKey(***)"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("top-secret"));
    }
}
