//! Session audit trail
//!
//! Every lifecycle event the manager goes through is logged with a `SESSION:`
//! prefix and kept in a bounded in-memory history for diagnostics.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Types of session events to track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    // Lifecycle
    Initialized { user_id: Option<String> },
    InitializationFailed { reason: String },
    LoginStarted { redirect_uri: Option<String> },
    LoginFailed { reason: String },
    CallbackCompleted { user_id: String },
    CallbackFailed { reason: String },
    LoggedOut { user_id: Option<String>, provider_error: Option<String> },

    // Token refresh
    TokenRefreshed { user_id: Option<String> },
    RefreshFailed { user_id: Option<String>, reason: String },

    // Authorization
    PermissionDenied { user_id: Option<String>, permission: String },

    // Teardown
    Reset,
}

impl SessionEvent {
    /// Event key for counters
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Initialized { .. } => "initialized",
            SessionEvent::InitializationFailed { .. } => "initialization_failed",
            SessionEvent::LoginStarted { .. } => "login_started",
            SessionEvent::LoginFailed { .. } => "login_failed",
            SessionEvent::CallbackCompleted { .. } => "callback_completed",
            SessionEvent::CallbackFailed { .. } => "callback_failed",
            SessionEvent::LoggedOut { .. } => "logged_out",
            SessionEvent::TokenRefreshed { .. } => "token_refreshed",
            SessionEvent::RefreshFailed { .. } => "refresh_failed",
            SessionEvent::PermissionDenied { .. } => "permission_denied",
            SessionEvent::Reset => "reset",
        }
    }
}

/// Session event with timestamp
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub event: SessionEvent,
    pub at: DateTime<Utc>,
}

struct AuditInner {
    records: VecDeque<AuditRecord>,
    counts: HashMap<&'static str, usize>,
}

/// Bounded audit trail owned by a session manager
pub struct SessionAuditLog {
    inner: Mutex<AuditInner>,
    capacity: usize,
}

impl SessionAuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(AuditInner {
                records: VecDeque::with_capacity(capacity.min(1024)),
                counts: HashMap::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuditInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Log a session event
    pub fn record(&self, event: SessionEvent) {
        match &event {
            SessionEvent::Initialized { user_id } => {
                log::info!("SESSION: Initialized - User: {:?}", user_id);
            }
            SessionEvent::InitializationFailed { reason } => {
                log::error!("SESSION: Initialization failed - Reason: {}", reason);
            }
            SessionEvent::LoginStarted { redirect_uri } => {
                log::info!("SESSION: Login started - Redirect: {:?}", redirect_uri);
            }
            SessionEvent::LoginFailed { reason } => {
                log::warn!("SESSION: Login failed - Reason: {}", reason);
            }
            SessionEvent::CallbackCompleted { user_id } => {
                log::info!("SESSION: Callback completed - User: {}", user_id);
            }
            SessionEvent::CallbackFailed { reason } => {
                log::warn!("SESSION: Callback failed - Reason: {}", reason);
            }
            SessionEvent::LoggedOut { user_id, provider_error } => match provider_error {
                Some(err) => log::warn!(
                    "SESSION: Logged out locally, provider logout failed - User: {:?}, Error: {}",
                    user_id,
                    err
                ),
                None => log::info!("SESSION: Logged out - User: {:?}", user_id),
            },
            SessionEvent::TokenRefreshed { user_id } => {
                log::debug!("SESSION: Token refreshed - User: {:?}", user_id);
            }
            SessionEvent::RefreshFailed { user_id, reason } => {
                log::warn!("SESSION: Token refresh failed, session dropped - User: {:?}, Reason: {}", user_id, reason);
            }
            SessionEvent::PermissionDenied { user_id, permission } => {
                log::warn!("SESSION: Permission denied - User: {:?}, Permission: {}", user_id, permission);
            }
            SessionEvent::Reset => {
                log::debug!("SESSION: Reset");
            }
        }

        let mut inner = self.lock();
        *inner.counts.entry(event.kind()).or_insert(0) += 1;
        inner.records.push_back(AuditRecord {
            event,
            at: Utc::now(),
        });
        // Limit memory usage
        while inner.records.len() > self.capacity {
            inner.records.pop_front();
        }
    }

    /// Most recent events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<SessionEvent> {
        let inner = self.lock();
        let skip = inner.records.len().saturating_sub(limit);
        inner
            .records
            .iter()
            .skip(skip)
            .map(|record| record.event.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().records.iter().cloned().collect()
    }

    /// Total events of a kind since creation, including evicted ones
    pub fn count(&self, kind: &str) -> usize {
        self.lock().counts.get(kind).copied().unwrap_or(0)
    }

    pub fn stats(&self) -> HashMap<String, usize> {
        self.lock()
            .counts
            .iter()
            .map(|(kind, count)| (kind.to_string(), *count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let audit = SessionAuditLog::new(2);
        audit.record(SessionEvent::Reset);
        audit.record(SessionEvent::LoginStarted { redirect_uri: None });
        audit.record(SessionEvent::LoginFailed { reason: "Network error".to_string() });

        let recent = audit.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind(), "login_started");
        assert_eq!(audit.count("reset"), 1);
    }

    #[test]
    fn test_recent_limit() {
        let audit = SessionAuditLog::new(10);
        for _ in 0..3 {
            audit.record(SessionEvent::Reset);
        }
        audit.record(SessionEvent::TokenRefreshed { user_id: None });

        let records = audit.records();
        assert_eq!(records.len(), 4);
        assert!(records.windows(2).all(|pair| pair[0].at <= pair[1].at));
        assert_eq!(records[3].event.kind(), "token_refreshed");

        let recent = audit.recent(1);
        assert_eq!(recent, vec![SessionEvent::TokenRefreshed { user_id: None }]);
        assert_eq!(audit.stats().get("reset"), Some(&3));
    }
}
