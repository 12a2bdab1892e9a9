use serde::{Deserialize, Serialize};

use crate::auth::claims::ParsedToken;

/// Represents the user behind the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier (token subject)
    pub id: String,
    /// Login name
    pub username: String,
    /// Email address (optional)
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    /// Creates a new user with basic information
    pub fn new(id: String, username: String) -> Self {
        Self {
            id,
            username,
            email: None,
            first_name: None,
            last_name: None,
        }
    }

    /// Creates a new user with email
    pub fn with_email(id: String, username: String, email: String) -> Self {
        let mut user = Self::new(id, username);
        user.email = Some(email);
        user
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = Some(first_name.to_string());
        self.last_name = Some(last_name.to_string());
        self
    }

    /// Builds the user from token claims; `None` when the token carries no subject
    pub fn from_claims(claims: &ParsedToken) -> Option<Self> {
        if claims.sub.is_empty() {
            return None;
        }

        let username = claims
            .preferred_username
            .clone()
            .unwrap_or_else(|| claims.sub.clone());

        Some(Self {
            id: claims.sub.clone(),
            username,
            email: claims.email.clone(),
            first_name: claims.given_name.clone(),
            last_name: claims.family_name.clone(),
        })
    }

    /// "First Last" when both parts are known, the username otherwise
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.username.clone(),
        }
    }
}
