//! BSS Session - authentication lifecycle management for BSS clients
//!
//! This library keeps the client-side session in step with an external
//! identity provider: it adopts provider sessions, refreshes tokens in the
//! background, drops the session when a refresh fails and answers role and
//! permission checks.

pub mod audit;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod session;

// Re-export main components
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use session::{AccessGuard, SessionManager, SessionState, SessionStatus};
