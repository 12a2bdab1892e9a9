use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    // Lifecycle errors
    Initialization,
    Callback,
    Login(String),
    Refresh(String),

    // Profile errors
    ProfileLoad(String),

    // Authorization errors
    InsufficientPermissions(String),

    // Identity provider errors
    Provider(String),
    TokenDecode(String),

    // Configuration errors
    Config(String),

    // System errors
    Runtime(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialization => write!(f, "Failed to initialize authentication"),
            Self::Callback => write!(f, "Authentication callback failed"),
            Self::Login(msg) => write!(f, "Login failed: {}", msg),
            Self::Refresh(msg) => write!(f, "Token refresh failed: {}", msg),
            Self::ProfileLoad(msg) => write!(f, "{}", msg),
            Self::InsufficientPermissions(permission) => {
                write!(f, "Insufficient permissions: {}", permission)
            }
            Self::Provider(msg) => write!(f, "{}", msg),
            Self::TokenDecode(msg) => write!(f, "Token decode error: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl Error for SessionError {}

// Generic result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
