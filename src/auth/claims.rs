use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{Result, SessionError};

/// Role list wrapper used by both `realm_access` and `resource_access` entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims carried by an access token issued by the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedToken {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: String,
    /// Login name
    pub preferred_username: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    /// Expiration time (seconds since epoch)
    pub exp: Option<i64>,
    /// Issued at (seconds since epoch)
    pub iat: Option<i64>,
    /// Realm-level roles
    #[serde(default)]
    pub realm_access: RoleClaim,
    /// Roles per client resource
    #[serde(default)]
    pub resource_access: HashMap<String, RoleClaim>,
}

impl ParsedToken {
    /// Creates claims for a subject with a login name
    pub fn new(sub: &str, preferred_username: &str) -> Self {
        Self {
            sub: sub.to_string(),
            preferred_username: Some(preferred_username.to_string()),
            ..Self::default()
        }
    }

    pub fn with_realm_roles(mut self, roles: &[&str]) -> Self {
        self.realm_access.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_resource_roles(mut self, resource: &str, roles: &[&str]) -> Self {
        self.resource_access.insert(
            resource.to_string(),
            RoleClaim {
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        self
    }

    /// Sets the expiration relative to now
    pub fn expiring_in(mut self, seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        self.iat = Some(now);
        self.exp = Some(now + seconds);
        self
    }

    /// Decodes the claims of a JWT without checking its signature.
    ///
    /// The identity provider has already verified the token it hands out;
    /// this only reads the payload so the session can mirror it.
    pub fn decode_unverified(token: &str) -> Result<Self> {
        let header = decode_header(token)
            .map_err(|e| SessionError::TokenDecode(format!("Invalid token header: {}", e)))?;

        let mut validation = Validation::new(header.alg);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<ParsedToken>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| SessionError::TokenDecode(format!("Invalid token payload: {}", e)))
    }

    pub fn realm_roles(&self) -> BTreeSet<String> {
        self.realm_access.roles.iter().cloned().collect()
    }

    /// Roles granted on a client resource, empty when the resource is absent
    pub fn resource_roles(&self, resource: &str) -> BTreeSet<String> {
        self.resource_access
            .get(resource)
            .map(|claim| claim.roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Seconds left before `exp`, negative once expired and 0 without an `exp` claim
    pub fn seconds_until_expiration(&self) -> i64 {
        match self.exp {
            Some(exp) => exp - chrono::Utc::now().timestamp(),
            None => 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.exp {
            Some(exp) => chrono::Utc::now().timestamp() >= exp,
            None => false,
        }
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(claims: &serde_json::Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"provider-side-signing-key"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_keycloak_shaped_token() {
        let token = mint(&serde_json::json!({
            "sub": "user-123",
            "preferred_username": "testuser",
            "email": "test@example.com",
            "given_name": "Test",
            "family_name": "User",
            "exp": 4_102_444_800i64,
            "aud": ["bss-frontend", "account"],
            "realm_access": { "roles": ["user", "admin"] },
            "resource_access": { "bss-frontend": { "roles": ["read:customers"] } }
        }));

        let parsed = ParsedToken::decode_unverified(&token).unwrap();
        assert_eq!(parsed.sub, "user-123");
        assert_eq!(parsed.preferred_username.as_deref(), Some("testuser"));
        assert_eq!(parsed.realm_roles().len(), 2);
        assert!(parsed.resource_roles("bss-frontend").contains("read:customers"));
        assert!(parsed.resource_roles("other-client").is_empty());
    }

    #[test]
    fn test_decode_tolerates_missing_optional_claims() {
        let token = mint(&serde_json::json!({ "sub": "user-1" }));
        let parsed = ParsedToken::decode_unverified(&token).unwrap();
        assert!(parsed.realm_access.roles.is_empty());
        assert_eq!(parsed.exp, None);
        assert_eq!(parsed.seconds_until_expiration(), 0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = ParsedToken::decode_unverified("invalid.token.here");
        assert!(matches!(result, Err(SessionError::TokenDecode(_))));
    }

    #[test]
    fn test_expiration_window() {
        let parsed = ParsedToken::new("u", "user").expiring_in(3600);
        let remaining = parsed.seconds_until_expiration();
        assert!(remaining > 0 && remaining <= 3600);
        assert!(!parsed.is_expired());

        let stale = ParsedToken::new("u", "user").expiring_in(-10);
        assert!(stale.is_expired());
        assert!(stale.seconds_until_expiration() < 0);
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc".to_string()));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
