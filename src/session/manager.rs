//! Session lifecycle state machine
//!
//! The manager is the only writer of [`SessionState`]. Each operation applies
//! its transition in one step once the provider call has settled, and
//! publishes it through a watch channel so readers always see a whole record.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

use crate::audit::{SessionAuditLog, SessionEvent};
use crate::auth::claims::ParsedToken;
use crate::auth::provider::{IdentityProvider, LoginOptions, LogoutOptions};
use crate::auth::user::User;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::session::guard::AccessGuard;
use crate::session::refresh::AutoRefreshHandle;
use crate::session::state::{SessionState, SessionStatus};

/// Outcome of the last completed refresh, shared with callers that waited on it
#[derive(Debug, Default)]
struct RefreshLedger {
    epoch: u64,
    last_result: bool,
}

/// Rolls an in-progress transition back to a settled status if the operation
/// future is dropped before the provider call returns
struct PendingTransition<'a> {
    manager: &'a SessionManager,
    settled: bool,
}

impl PendingTransition<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        log::debug!("Session operation cancelled before settling, restoring status");
        self.manager.update(|s| {
            s.is_loading = false;
            s.status = if s.is_authenticated {
                SessionStatus::Authenticated
            } else {
                SessionStatus::Unauthenticated
            };
        });
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    /// Serializes provider-facing operations
    operations: tokio::sync::Mutex<RefreshLedger>,
    refresh_epoch: AtomicU64,
    auto_refresh: Mutex<Option<AutoRefreshHandle>>,
    audit: SessionAuditLog,
}

impl SessionManager {
    pub fn new(config: SessionConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        log::info!(
            "Session manager created for realm '{}' (client '{}', provider {})",
            config.realm,
            config.client_id,
            provider.provider_name()
        );

        let (state, _) = watch::channel(SessionState::default());
        let audit = SessionAuditLog::new(config.audit_capacity);

        Self {
            provider,
            config,
            state,
            operations: tokio::sync::Mutex::new(RefreshLedger::default()),
            refresh_epoch: AtomicU64::new(0),
            auto_refresh: Mutex::new(None),
            audit,
        }
    }

    fn update(&self, transition: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(transition);
    }

    /// Apply the in-progress part of a transition; the returned guard must be
    /// settled once the provider call has returned
    fn begin(&self, transition: impl FnOnce(&mut SessionState)) -> PendingTransition<'_> {
        self.update(transition);
        PendingTransition {
            manager: self,
            settled: false,
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.borrow())
    }

    fn current_user_id(&self) -> Option<String> {
        self.read(|s| s.user.as_ref().map(|u| u.id.clone()))
    }

    fn auto_refresh_slot(&self) -> MutexGuard<'_, Option<AutoRefreshHandle>> {
        self.auto_refresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Session built from what the provider currently reports, if it can back one
    fn read_provider_session(&self) -> Option<SessionState> {
        if !self.provider.authenticated() {
            return None;
        }

        let Some(claims) = self.provider.token_parsed() else {
            log::warn!("Provider reports a session but no token claims");
            return None;
        };

        let session =
            SessionState::from_provider(self.provider.token(), &claims, &self.config.client_id);
        if session.is_none() {
            log::warn!("Provider session is missing a token or subject, ignoring it");
        }
        session
    }

    /// Initialize the provider and adopt any session it already holds
    pub async fn initialize(&self) {
        let mut ledger = self.operations.lock().await;
        ledger.last_result = false;
        let pending = self.begin(|s| s.is_loading = true);

        let initialized = self.provider.init().await;
        pending.settle();

        if let Err(e) = initialized {
            self.audit.record(SessionEvent::InitializationFailed {
                reason: e.to_string(),
            });
            self.update(|s| {
                s.clear_session();
                s.is_loading = false;
                s.error = Some(SessionError::Initialization.to_string());
            });
            return;
        }

        match self.read_provider_session() {
            Some(session) => {
                let user_id = session.user.as_ref().map(|u| u.id.clone());
                self.state.send_replace(session);
                self.audit.record(SessionEvent::Initialized { user_id });
            }
            None => {
                self.update(|s| {
                    s.clear_session();
                    s.is_loading = false;
                    s.error = None;
                });
                self.audit.record(SessionEvent::Initialized { user_id: None });
            }
        }
    }

    /// Start a provider login and return its login URL when it builds one.
    ///
    /// The session is only populated once the provider redirects back and
    /// [`handle_callback`](Self::handle_callback) runs.
    pub async fn login(&self, redirect_uri: Option<&str>) -> Option<String> {
        let _operation = self.operations.lock().await;

        if self.is_authenticated() {
            log::debug!("Login requested while a session is active, ignoring");
            return None;
        }

        let options = LoginOptions {
            redirect_uri: redirect_uri.map(str::to_string),
        };
        self.audit.record(SessionEvent::LoginStarted {
            redirect_uri: options.redirect_uri.clone(),
        });
        let pending = self.begin(|s| {
            s.status = SessionStatus::Authenticating;
            s.is_loading = true;
        });

        let outcome = self.provider.login(options).await;
        pending.settle();

        match outcome {
            Ok(login_url) => {
                self.update(|s| {
                    s.is_loading = false;
                    s.error = None;
                });
                login_url
            }
            Err(e) => {
                let err = SessionError::Login(e.to_string());
                self.audit.record(SessionEvent::LoginFailed {
                    reason: e.to_string(),
                });
                self.update(|s| {
                    s.clear_session();
                    s.is_loading = false;
                    s.error = Some(err.to_string());
                });
                None
            }
        }
    }

    /// Adopt the session the provider established after redirecting back
    pub async fn handle_callback(&self) {
        let mut ledger = self.operations.lock().await;
        ledger.last_result = false;

        match self.read_provider_session() {
            Some(session) => {
                let user_id = session
                    .user
                    .as_ref()
                    .map(|u| u.id.clone())
                    .unwrap_or_default();
                self.state.send_replace(session);
                self.audit.record(SessionEvent::CallbackCompleted { user_id });
            }
            None => {
                self.audit.record(SessionEvent::CallbackFailed {
                    reason: "provider reports no usable session".to_string(),
                });
                self.update(|s| {
                    s.clear_session();
                    s.is_loading = false;
                    s.error = Some(SessionError::Callback.to_string());
                });
            }
        }
    }

    /// End the session. The local record is cleared even when the provider
    /// logout fails.
    pub async fn logout(&self, redirect_uri: Option<&str>) {
        let mut ledger = self.operations.lock().await;
        ledger.last_result = false;

        let user_id = self.current_user_id();
        let options = LogoutOptions {
            redirect_uri: redirect_uri.map(str::to_string),
        };
        let pending = self.begin(|s| {
            s.status = SessionStatus::LoggingOut;
            s.is_loading = true;
        });

        let provider_error = self.provider.logout(options).await.err().map(|e| e.to_string());
        pending.settle();

        self.update(|s| {
            s.clear_session();
            s.is_loading = false;
            s.error = None;
        });
        self.audit.record(SessionEvent::LoggedOut {
            user_id,
            provider_error,
        });
    }

    /// Renew the token through the provider.
    ///
    /// Returns `false` without calling the provider when no session is held.
    /// A failed refresh drops the session. Callers that queue behind an
    /// in-flight refresh get its result instead of issuing another one.
    pub async fn refresh_token(&self) -> bool {
        let observed = self.refresh_epoch.load(Ordering::Acquire);
        let mut ledger = self.operations.lock().await;

        // A session that ended after the shared refresh no longer counts as refreshed
        if ledger.epoch != observed {
            return ledger.last_result && self.is_authenticated();
        }

        if !self.is_authenticated() {
            return false;
        }

        let user_id = self.current_user_id();
        let pending = self.begin(|s| {
            s.status = SessionStatus::Refreshing;
            s.is_loading = true;
        });

        let updated = self
            .provider
            .update_token(self.config.min_validity.as_secs())
            .await;
        pending.settle();

        let outcome = match updated {
            Ok(true) => {
                let token = self.provider.token();
                if token.is_empty() {
                    Err("provider returned an empty token".to_string())
                } else {
                    Ok((token, self.provider.token_parsed().and_then(|c| c.exp)))
                }
            }
            Ok(false) => Err("session could not be refreshed".to_string()),
            Err(e) => Err(e.to_string()),
        };

        let refreshed = match outcome {
            Ok((token, expires_at)) => {
                let mut applied = false;
                self.update(|s| {
                    s.is_loading = false;
                    // reset() may have run while the provider call was pending
                    if s.is_authenticated {
                        s.token = token;
                        s.expires_at = expires_at.or(s.expires_at);
                        s.status = SessionStatus::Authenticated;
                        s.error = None;
                        applied = true;
                    }
                });
                if applied {
                    self.audit.record(SessionEvent::TokenRefreshed { user_id });
                } else {
                    log::debug!("Session ended while refreshing, discarding new token");
                }
                applied
            }
            Err(reason) => {
                let err = SessionError::Refresh(reason.clone());
                self.update(|s| {
                    s.clear_session();
                    s.is_loading = false;
                    s.error = Some(err.to_string());
                });
                self.audit
                    .record(SessionEvent::RefreshFailed { user_id, reason });
                false
            }
        };

        ledger.epoch += 1;
        ledger.last_result = refreshed;
        self.refresh_epoch.store(ledger.epoch, Ordering::Release);
        refreshed
    }

    /// Current bearer token, empty when no session is held
    pub fn access_token(&self) -> String {
        self.read(|s| {
            if s.is_authenticated {
                s.token.clone()
            } else {
                String::new()
            }
        })
    }

    /// Bearer token for outgoing API calls, refreshed first when `force_refresh`
    pub async fn get_access_token(&self, force_refresh: bool) -> String {
        if force_refresh && !self.refresh_token().await {
            return String::new();
        }
        self.access_token()
    }

    /// Load the profile from the provider and store it on the session.
    ///
    /// Errors are returned to the caller, not absorbed into `error`.
    pub async fn load_user_profile(&self) -> Result<User> {
        let _operation = self.operations.lock().await;
        let pending = self.begin(|s| s.is_loading = true);

        let loaded = self.provider.load_user_profile().await;
        pending.settle();

        match loaded {
            Ok(profile) => {
                self.update(|s| {
                    s.is_loading = false;
                    s.error = None;
                    if s.is_authenticated {
                        s.user = Some(profile.clone());
                    }
                });
                Ok(profile)
            }
            Err(e) => {
                self.update(|s| s.is_loading = false);
                Err(SessionError::ProfileLoad(e.to_string()))
            }
        }
    }

    /// Refresh every `interval` while a session is held, replacing any
    /// previous timer. Requires a tokio runtime.
    pub fn auto_refresh(self: &Arc<Self>, interval: Duration) -> Result<()> {
        let handle = AutoRefreshHandle::spawn(Arc::downgrade(self), interval)?;
        if let Some(previous) = self.auto_refresh_slot().replace(handle) {
            log::debug!("Replacing auto-refresh timer ({:?})", previous.interval());
            previous.cancel();
        }
        Ok(())
    }

    /// Auto-refresh with the configured interval
    pub fn start_auto_refresh(self: &Arc<Self>) -> Result<()> {
        self.auto_refresh(self.config.refresh_interval)
    }

    /// Cancel the auto-refresh timer; returns whether one was running
    pub fn stop_auto_refresh(&self) -> bool {
        match self.auto_refresh_slot().take() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_auto_refresh_active(&self) -> bool {
        self.auto_refresh_slot()
            .as_ref()
            .map(AutoRefreshHandle::is_running)
            .unwrap_or(false)
    }

    /// Return to the empty record and stop the timer, without calling the provider
    pub fn reset(&self) {
        self.stop_auto_refresh();
        self.state.send_replace(SessionState::default());
        self.audit.record(SessionEvent::Reset);
    }

    pub fn set_error(&self, err: impl fmt::Display) {
        let message = err.to_string();
        self.update(|s| s.error = Some(message));
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    /// Consistent copy of the current record
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.read(|s| s.status)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.is_authenticated)
    }

    pub fn is_loading(&self) -> bool {
        self.read(|s| s.is_loading)
    }

    pub fn user(&self) -> Option<User> {
        self.read(|s| s.user.clone())
    }

    pub fn error(&self) -> Option<String> {
        self.read(|s| s.error.clone())
    }

    pub fn is_session_valid(&self) -> bool {
        self.read(SessionState::is_session_valid)
    }

    pub fn is_admin(&self) -> bool {
        self.read(SessionState::is_admin)
    }

    pub fn full_name(&self) -> String {
        self.read(SessionState::full_name)
    }

    /// Seconds until `claims` expire; does not touch the session
    pub fn get_time_until_expiration(&self, claims: &ParsedToken) -> i64 {
        claims.seconds_until_expiration()
    }

    /// Seconds until the held token expires, when its expiry is known
    pub fn time_until_expiration(&self) -> Option<i64> {
        self.read(|s| s.expires_at)
            .map(|exp| exp - chrono::Utc::now().timestamp())
    }

    pub fn guard(&self) -> AccessGuard<'_> {
        AccessGuard::new(self)
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn audit(&self) -> &SessionAuditLog {
        &self.audit
    }
}
