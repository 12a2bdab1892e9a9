// Identity provider defaults
pub const DEFAULT_REALM: &str = "bss";
pub const DEFAULT_CLIENT_ID: &str = "bss-frontend";
pub const DEFAULT_SCOPE: &str = "openid";

// Token refresh defaults
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MIN_VALIDITY_SECS: u64 = 30;

// Audit trail
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

// Role granting administrative access
pub const ADMIN_ROLE: &str = "admin";
