//! In-process identity provider for development mode and tests
//!
//! Behaves like a browser adapter whose redirects already happened: tests
//! script what the provider reports and which calls fail.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::auth::claims::ParsedToken;
use crate::auth::provider::{IdentityProvider, LoginOptions, LogoutOptions, ProviderEndpoints};
use crate::auth::user::User;
use crate::error::{Result, SessionError};

/// How the next `update_token` calls settle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshBehavior {
    /// Succeed, keeping the current token
    KeepToken,
    /// Succeed and rotate to this token
    Rotate(String),
    /// Resolve `false` (refresh impossible)
    Deny,
    /// Reject with this message
    Fail(String),
}

/// Number of calls each provider operation received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCalls {
    pub init: usize,
    pub login: usize,
    pub logout: usize,
    pub update_token: usize,
    pub load_user_profile: usize,
    pub role_checks: usize,
}

#[derive(Debug)]
struct ProviderState {
    authenticated: bool,
    token: String,
    token_parsed: Option<ParsedToken>,
    init_error: Option<String>,
    login_error: Option<String>,
    logout_error: Option<String>,
    role_check_error: Option<String>,
    refresh: RefreshBehavior,
    update_delay: Duration,
    profile: std::result::Result<User, String>,
    calls: ProviderCalls,
    last_login: Option<LoginOptions>,
    last_logout: Option<LogoutOptions>,
    last_min_validity: Option<u64>,
}

pub struct MemoryIdentityProvider {
    state: Mutex<ProviderState>,
    endpoints: Option<ProviderEndpoints>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                authenticated: false,
                token: String::new(),
                token_parsed: None,
                init_error: None,
                login_error: None,
                logout_error: None,
                role_check_error: None,
                refresh: RefreshBehavior::KeepToken,
                update_delay: Duration::ZERO,
                profile: Err("No profile available".to_string()),
                calls: ProviderCalls::default(),
                last_login: None,
                last_logout: None,
                last_min_validity: None,
            }),
            endpoints: None,
        }
    }

    /// Build login URLs with these endpoints instead of returning `None`
    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        // A panicking test must not cascade into unrelated assertions
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Report an authenticated session holding `token` with `claims`
    pub fn sign_in(&self, token: &str, claims: ParsedToken) {
        let mut state = self.lock();
        state.authenticated = true;
        state.token = token.to_string();
        state.token_parsed = Some(claims);
    }

    /// Report no session
    pub fn sign_out(&self) {
        let mut state = self.lock();
        state.authenticated = false;
        state.token.clear();
        state.token_parsed = None;
    }

    pub fn fail_init(&self, message: &str) {
        self.lock().init_error = Some(message.to_string());
    }

    pub fn fail_login(&self, message: &str) {
        self.lock().login_error = Some(message.to_string());
    }

    pub fn fail_logout(&self, message: &str) {
        self.lock().logout_error = Some(message.to_string());
    }

    pub fn fail_role_checks(&self, message: &str) {
        self.lock().role_check_error = Some(message.to_string());
    }

    pub fn set_refresh(&self, behavior: RefreshBehavior) {
        self.lock().refresh = behavior;
    }

    /// Delay before `update_token` settles
    pub fn set_update_delay(&self, delay: Duration) {
        self.lock().update_delay = delay;
    }

    pub fn set_profile(&self, profile: User) {
        self.lock().profile = Ok(profile);
    }

    pub fn fail_profile(&self, message: &str) {
        self.lock().profile = Err(message.to_string());
    }

    pub fn calls(&self) -> ProviderCalls {
        self.lock().calls
    }

    pub fn last_login_options(&self) -> Option<LoginOptions> {
        self.lock().last_login.clone()
    }

    pub fn last_logout_options(&self) -> Option<LogoutOptions> {
        self.lock().last_logout.clone()
    }

    pub fn last_min_validity(&self) -> Option<u64> {
        self.lock().last_min_validity
    }

    fn check_role(&self, check: impl FnOnce(&ParsedToken) -> bool) -> Result<bool> {
        let mut state = self.lock();
        state.calls.role_checks += 1;
        if let Some(ref message) = state.role_check_error {
            return Err(SessionError::Provider(message.clone()));
        }
        if !state.authenticated {
            return Ok(false);
        }
        Ok(state.token_parsed.as_ref().map(check).unwrap_or(false))
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn init(&self) -> Result<()> {
        let mut state = self.lock();
        state.calls.init += 1;
        match state.init_error {
            Some(ref message) => Err(SessionError::Provider(message.clone())),
            None => Ok(()),
        }
    }

    async fn login(&self, options: LoginOptions) -> Result<Option<String>> {
        {
            let mut state = self.lock();
            state.calls.login += 1;
            state.last_login = Some(options.clone());
            if let Some(ref message) = state.login_error {
                return Err(SessionError::Provider(message.clone()));
            }
        }

        match self.endpoints {
            Some(ref endpoints) => endpoints.login_url(&options).map(Some),
            None => Ok(None),
        }
    }

    async fn logout(&self, options: LogoutOptions) -> Result<()> {
        let mut state = self.lock();
        state.calls.logout += 1;
        state.last_logout = Some(options);
        if let Some(ref message) = state.logout_error {
            return Err(SessionError::Provider(message.clone()));
        }
        state.authenticated = false;
        state.token.clear();
        state.token_parsed = None;
        Ok(())
    }

    async fn update_token(&self, min_validity_secs: u64) -> Result<bool> {
        let delay = {
            let mut state = self.lock();
            state.calls.update_token += 1;
            state.last_min_validity = Some(min_validity_secs);
            state.update_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        match state.refresh.clone() {
            RefreshBehavior::KeepToken => Ok(true),
            RefreshBehavior::Rotate(token) => {
                state.token = token;
                Ok(true)
            }
            RefreshBehavior::Deny => Ok(false),
            RefreshBehavior::Fail(message) => Err(SessionError::Provider(message)),
        }
    }

    async fn load_user_profile(&self) -> Result<User> {
        let mut state = self.lock();
        state.calls.load_user_profile += 1;
        state.profile.clone().map_err(SessionError::Provider)
    }

    async fn has_realm_role(&self, role: &str) -> Result<bool> {
        self.check_role(|claims| claims.realm_access.roles.iter().any(|r| r == role))
    }

    async fn has_resource_role(&self, role: &str, resource: &str) -> Result<bool> {
        self.check_role(|claims| claims.resource_roles(resource).contains(role))
    }

    fn token(&self) -> String {
        self.lock().token.clone()
    }

    fn token_parsed(&self) -> Option<ParsedToken> {
        self.lock().token_parsed.clone()
    }

    fn authenticated(&self) -> bool {
        self.lock().authenticated
    }

    fn provider_name(&self) -> &'static str {
        "MEMORY"
    }
}
