//! Role and permission checks over the current session
//!
//! `has_role` and `has_permission` ask the provider, since assignments can
//! change server-side between refreshes. `has_any_role` and `has_all_roles`
//! only read the cached role set. Provider failures count as "no".

use crate::audit::SessionEvent;
use crate::error::{Result, SessionError};
use crate::session::manager::SessionManager;

pub struct AccessGuard<'a> {
    session: &'a SessionManager,
}

impl<'a> AccessGuard<'a> {
    pub fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// Whether the current session holds the realm role `role`
    pub async fn has_role(&self, role: &str) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }

        match self.session.provider().has_realm_role(role).await {
            Ok(granted) => granted,
            Err(e) => {
                log::warn!("Realm role check for '{}' failed, denying: {}", role, e);
                false
            }
        }
    }

    /// True if any of `roles` is in the cached role set
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.session
            .read(|s| roles.iter().any(|role| s.roles.contains(role.as_ref())))
    }

    /// True if every one of `roles` is in the cached role set
    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.session
            .read(|s| roles.iter().all(|role| s.roles.contains(role.as_ref())))
    }

    /// Whether the session holds `permission` on the configured client resource
    pub async fn has_permission(&self, permission: &str) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }

        let resource = &self.session.config().client_id;
        match self
            .session
            .provider()
            .has_resource_role(permission, resource)
            .await
        {
            Ok(granted) => granted,
            Err(e) => {
                log::warn!(
                    "Permission check for '{}' on '{}' failed, denying: {}",
                    permission,
                    resource,
                    e
                );
                false
            }
        }
    }

    /// Assertion form of [`has_permission`](Self::has_permission)
    pub async fn check_permission(&self, permission: &str) -> Result<bool> {
        if self.has_permission(permission).await {
            return Ok(true);
        }

        let user_id = self.session.read(|s| s.user.as_ref().map(|u| u.id.clone()));
        self.session.audit().record(SessionEvent::PermissionDenied {
            user_id,
            permission: permission.to_string(),
        });
        Err(SessionError::InsufficientPermissions(permission.to_string()))
    }
}
