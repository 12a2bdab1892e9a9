//! Session configuration module
//! Handles identity provider and token refresh parameters

use crate::constants::{
    DEFAULT_AUDIT_CAPACITY, DEFAULT_CLIENT_ID, DEFAULT_MIN_VALIDITY_SECS,
    DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_REALM,
};
use crate::error::{Result, SessionError};
use std::env;
use std::time::Duration;
use url::Url;

/// Session configuration parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the identity provider (e.g. https://auth.example.com)
    pub auth_url: Url,
    /// Realm the client is registered in
    pub realm: String,
    /// Client ID, also the resource whose roles are treated as permissions
    pub client_id: String,
    /// Period of the background token refresh
    pub refresh_interval: Duration,
    /// Minimum remaining validity requested from the provider on refresh
    pub min_validity: Duration,
    /// Number of session events kept in the audit trail
    pub audit_capacity: usize,
    /// Development mode (allows plain http provider URLs)
    pub development_mode: bool,
}

impl SessionConfig {
    /// Create a configuration with defaults for everything but the provider URL
    pub fn new(auth_url: &str) -> Result<Self> {
        let auth_url = Self::parse_auth_url(auth_url)?;
        Ok(Self {
            auth_url,
            realm: DEFAULT_REALM.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            min_validity: Duration::from_secs(DEFAULT_MIN_VALIDITY_SECS),
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            development_mode: false,
        })
    }

    /// Create a test configuration pointing at a local provider
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            auth_url: Url::parse("http://localhost:8081").expect("static test URL"),
            realm: DEFAULT_REALM.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            refresh_interval: Duration::from_millis(20),
            min_validity: Duration::from_secs(DEFAULT_MIN_VALIDITY_SECS),
            audit_capacity: 16,
            development_mode: true,
        }
    }

    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.client_id = client_id.to_string();
        self
    }

    pub fn with_realm(mut self, realm: &str) -> Self {
        self.realm = realm.to_string();
        self
    }

    fn parse_auth_url(raw: &str) -> Result<Url> {
        let url = Url::parse(raw)
            .map_err(|e| SessionError::Config(format!("Invalid identity provider URL '{}': {}", raw, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SessionError::Config(format!(
                "Identity provider URL must use http or https, got '{}'",
                other
            ))),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let raw_url = env::var("BSS_AUTH_URL").map_err(|_| {
            SessionError::Config(
                "BSS_AUTH_URL environment variable is required (identity provider base URL)"
                    .to_string(),
            )
        })?;
        let auth_url = Self::parse_auth_url(&raw_url)?;

        let realm = env::var("BSS_AUTH_REALM").unwrap_or(DEFAULT_REALM.to_string());
        let client_id = env::var("BSS_AUTH_CLIENT_ID").unwrap_or(DEFAULT_CLIENT_ID.to_string());

        let refresh_secs = env::var("BSS_AUTH_REFRESH_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);

        let min_validity_secs = env::var("BSS_AUTH_MIN_VALIDITY_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MIN_VALIDITY_SECS);

        let audit_capacity = env::var("BSS_AUTH_AUDIT_CAPACITY")
            .ok()
            .and_then(|c| c.parse().ok())
            .unwrap_or(DEFAULT_AUDIT_CAPACITY);

        let development_mode = env::var("BSS_AUTH_DEVELOPMENT_MODE")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let config = Self {
            auth_url,
            realm,
            client_id,
            refresh_interval: Duration::from_secs(refresh_secs),
            min_validity: Duration::from_secs(min_validity_secs),
            audit_capacity,
            development_mode,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.realm.trim().is_empty() {
            return Err(SessionError::Config("Realm must not be empty".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(SessionError::Config("Client ID must not be empty".to_string()));
        }
        if self.refresh_interval.is_zero() {
            return Err(SessionError::Config(
                "Refresh interval must be greater than zero".to_string(),
            ));
        }
        if self.audit_capacity == 0 {
            return Err(SessionError::Config(
                "Audit capacity must be greater than zero".to_string(),
            ));
        }
        if !self.development_mode && self.auth_url.scheme() != "https" {
            return Err(SessionError::Config(format!(
                "Identity provider URL must use https outside development mode: {}",
                self.auth_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_testing_is_valid() {
        let config = SessionConfig::for_testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.client_id, "bss-frontend");
    }

    #[test]
    fn test_new_rejects_non_http_scheme() {
        let result = SessionConfig::new("ftp://auth.example.com");
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_plain_http_requires_development_mode() {
        let config = SessionConfig::new("http://auth.example.com").unwrap();
        assert!(config.validate().is_err());

        let mut config = config;
        config.development_mode = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let mut config = SessionConfig::new("https://auth.example.com").unwrap();
        config.refresh_interval = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Refresh interval"));
    }

    #[test]
    fn test_builder_overrides_realm_and_client() {
        let config = SessionConfig::new("https://auth.example.com")
            .unwrap()
            .with_realm("billing")
            .with_client_id("bss-backoffice");

        assert_eq!(config.realm, "billing");
        assert_eq!(config.client_id, "bss-backoffice");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_requires_auth_url() {
        env::remove_var("BSS_AUTH_URL");

        let result = SessionConfig::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("BSS_AUTH_URL"));
    }
}
