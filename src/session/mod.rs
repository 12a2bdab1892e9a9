//! Session lifecycle: state, manager, auto-refresh and access checks

pub mod guard;
pub mod manager;
pub mod refresh;
pub mod state;

// Re-export main components
pub use guard::AccessGuard;
pub use manager::SessionManager;
pub use refresh::AutoRefreshHandle;
pub use state::{SessionState, SessionStatus};
