use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::auth::claims::ParsedToken;
use crate::auth::user::User;
use crate::constants::ADMIN_ROLE;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
    LoggingOut,
}

/// Authoritative record of the current session.
///
/// Only the session manager writes it; everyone else reads snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub is_authenticated: bool,
    pub user: Option<User>,
    /// Bearer credential, empty when unauthenticated
    pub token: String,
    /// Realm roles
    pub roles: BTreeSet<String>,
    /// Roles on the client resource
    pub permissions: BTreeSet<String>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// `exp` of the held token (seconds since epoch)
    pub expires_at: Option<i64>,
}

impl SessionState {
    /// Builds an authenticated record from provider state.
    /// `None` when the provider data cannot back a session.
    pub fn from_provider(token: String, claims: &ParsedToken, resource: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        let user = User::from_claims(claims)?;

        Some(Self {
            status: SessionStatus::Authenticated,
            is_authenticated: true,
            user: Some(user),
            token,
            roles: claims.realm_roles(),
            permissions: claims.resource_roles(resource),
            is_loading: false,
            error: None,
            expires_at: claims.exp,
        })
    }

    /// Drop every credential-bearing field, keeping `error` and `is_loading`
    pub fn clear_session(&mut self) {
        self.status = SessionStatus::Unauthenticated;
        self.is_authenticated = false;
        self.user = None;
        self.token.clear();
        self.roles.clear();
        self.permissions.clear();
        self.expires_at = None;
    }

    pub fn is_session_valid(&self) -> bool {
        self.is_authenticated && !self.token.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMIN_ROLE)
    }

    /// Display name, empty without a user
    pub fn full_name(&self) -> String {
        self.user.as_ref().map(User::full_name).unwrap_or_default()
    }

    /// Whether the unauthenticated record carries no leftover credentials
    pub fn is_consistent(&self) -> bool {
        if self.is_authenticated {
            !self.token.is_empty() && self.user.is_some()
        } else {
            self.user.is_none()
                && self.token.is_empty()
                && self.roles.is_empty()
                && self.permissions.is_empty()
        }
    }
}
