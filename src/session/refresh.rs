//! Background token refresh
//!
//! One task per manager, ticking on a fixed period. The task holds only a weak
//! reference so it never keeps a dropped manager alive, and its handle aborts
//! the task when cancelled or dropped.

use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{Result, SessionError};
use crate::session::manager::SessionManager;

/// Handle to a running auto-refresh task
#[derive(Debug)]
pub struct AutoRefreshHandle {
    task: JoinHandle<()>,
    interval: Duration,
}

impl AutoRefreshHandle {
    /// Spawn the refresh loop on the current tokio runtime.
    ///
    /// The first tick fires immediately, then every `interval`. Ticks that find
    /// the session unauthenticated are skipped.
    pub(crate) fn spawn(manager: Weak<SessionManager>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(SessionError::Config(
                "Auto-refresh interval must be greater than zero".to_string(),
            ));
        }

        let runtime = Handle::try_current().map_err(|e| {
            SessionError::Runtime(format!("Auto-refresh requires a tokio runtime: {}", e))
        })?;

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(manager) = manager.upgrade() else {
                    log::debug!("Session manager dropped, stopping auto-refresh");
                    break;
                };

                if !manager.is_authenticated() {
                    log::trace!("Auto-refresh tick skipped: no active session");
                    continue;
                }

                if !manager.refresh_token().await {
                    log::debug!("Auto-refresh could not renew the session");
                }
            }
        });

        log::debug!("Auto-refresh started with a {:?} period", interval);
        Ok(Self { task, interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the refresh loop
    pub fn cancel(self) {
        // Drop aborts the task
    }
}

impl Drop for AutoRefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
