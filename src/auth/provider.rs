//! Identity provider abstraction
//!
//! The session layer never speaks the provider protocol itself. It drives an
//! `IdentityProvider` implementation (a Keycloak adapter in production, the
//! in-memory provider in development and tests) and mirrors what it reports.

use async_trait::async_trait;
use url::Url;

use crate::auth::claims::ParsedToken;
use crate::auth::user::User;
use crate::config::SessionConfig;
use crate::constants::DEFAULT_SCOPE;
use crate::error::{Result, SessionError};

/// Options forwarded to the provider's login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginOptions {
    pub redirect_uri: Option<String>,
}

/// Options forwarded to the provider's logout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutOptions {
    pub redirect_uri: Option<String>,
}

/// Trait for identity providers
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Initialize the adapter (check-sso, restore tokens, ...)
    async fn init(&self) -> Result<()>;

    /// Start a login; returns the login URL when the provider builds one
    async fn login(&self, options: LoginOptions) -> Result<Option<String>>;

    async fn logout(&self, options: LogoutOptions) -> Result<()>;

    /// Refresh the token if it expires within `min_validity_secs`.
    /// `Ok(false)` means the provider could not refresh.
    async fn update_token(&self, min_validity_secs: u64) -> Result<bool>;

    async fn load_user_profile(&self) -> Result<User>;

    async fn has_realm_role(&self, role: &str) -> Result<bool>;

    async fn has_resource_role(&self, role: &str, resource: &str) -> Result<bool>;

    /// Current raw access token, empty when none is held
    fn token(&self) -> String;

    /// Claims of the current access token
    fn token_parsed(&self) -> Option<ParsedToken>;

    fn authenticated(&self) -> bool;

    /// Get the provider name for logging/debugging
    fn provider_name(&self) -> &'static str;
}

/// Builds the provider's browser-facing URLs for a realm and client
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    base: Url,
    realm: String,
    client_id: String,
}

impl ProviderEndpoints {
    pub fn new(base: Url, realm: &str, client_id: &str) -> Self {
        Self {
            base,
            realm: realm.to_string(),
            client_id: client_id.to_string(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.auth_url.clone(), &config.realm, &config.client_id)
    }

    fn realm_url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                SessionError::Config(format!("Provider URL cannot be a base: {}", self.base))
            })?;
            segments.pop_if_empty();
            segments.extend(["realms", self.realm.as_str()]);
            segments.extend(tail);
        }
        Ok(url)
    }

    /// Authorization endpoint URL with a fresh `state` and `nonce`
    pub fn login_url(&self, options: &LoginOptions) -> Result<String> {
        let mut url = self.realm_url(&["protocol", "openid-connect", "auth"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            if let Some(ref redirect_uri) = options.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            query
                .append_pair("state", &uuid::Uuid::new_v4().to_string())
                .append_pair("response_mode", "fragment")
                .append_pair("response_type", "code")
                .append_pair("scope", DEFAULT_SCOPE)
                .append_pair("nonce", &uuid::Uuid::new_v4().to_string());
        }
        Ok(url.into())
    }

    pub fn logout_url(&self, options: &LogoutOptions) -> Result<String> {
        let mut url = self.realm_url(&["protocol", "openid-connect", "logout"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            if let Some(ref redirect_uri) = options.redirect_uri {
                query.append_pair("post_logout_redirect_uri", redirect_uri);
            }
        }
        Ok(url.into())
    }

    /// Account management console URL
    pub fn account_url(&self, referrer_uri: Option<&str>) -> Result<String> {
        let mut url = self.realm_url(&["account"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("referrer", &self.client_id);
            if let Some(referrer_uri) = referrer_uri {
                query.append_pair("referrer_uri", referrer_uri);
            }
        }
        Ok(url.into())
    }
}
