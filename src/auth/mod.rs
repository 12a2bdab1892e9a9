//! Identity provider integration and token claims

pub mod claims;
pub mod memory;
pub mod provider;
pub mod user;

// Re-export main components
pub use claims::{ParsedToken, RoleClaim};
pub use memory::{MemoryIdentityProvider, RefreshBehavior};
pub use provider::{IdentityProvider, LoginOptions, LogoutOptions, ProviderEndpoints};
pub use user::User;
