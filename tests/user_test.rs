use bss_session::auth::claims::ParsedToken;
use bss_session::auth::user::User;

#[test]
fn test_user_creation() {
    let user = User::new("user123".to_string(), "testuser".to_string());
    assert_eq!(user.id, "user123");
    assert_eq!(user.username, "testuser");
    assert_eq!(user.email, None);
    assert_eq!(user.first_name, None);
    assert_eq!(user.last_name, None);
}

#[test]
fn test_user_with_email() {
    let user = User::with_email(
        "user123".to_string(),
        "testuser".to_string(),
        "test@example.com".to_string(),
    );
    assert_eq!(user.email, Some("test@example.com".to_string()));
}

#[test]
fn test_full_name() {
    let user = User::new("123".to_string(), "testuser".to_string()).with_name("Test", "User");
    assert_eq!(user.full_name(), "Test User");

    let mut partial = User::new("123".to_string(), "testuser".to_string());
    partial.first_name = Some("Test".to_string());
    assert_eq!(partial.full_name(), "testuser");
}

#[test]
fn test_user_from_claims() {
    let mut claims = ParsedToken::new("user-123", "testuser");
    claims.email = Some("test@example.com".to_string());
    claims.given_name = Some("Test".to_string());
    claims.family_name = Some("User".to_string());

    let user = User::from_claims(&claims).unwrap();
    assert_eq!(user.id, "user-123");
    assert_eq!(user.username, "testuser");
    assert_eq!(user.full_name(), "Test User");
}

#[test]
fn test_user_from_claims_without_username() {
    let mut claims = ParsedToken::default();
    claims.sub = "user-123".to_string();

    let user = User::from_claims(&claims).unwrap();
    assert_eq!(user.username, "user-123");

    assert!(User::from_claims(&ParsedToken::default()).is_none());
}

#[test]
fn test_profile_json_uses_camel_case() {
    let profile: User = serde_json::from_value(serde_json::json!({
        "id": "user-123",
        "username": "testuser",
        "email": "test@example.com",
        "firstName": "Test",
        "lastName": "User"
    }))
    .unwrap();

    assert_eq!(profile.first_name.as_deref(), Some("Test"));
    assert_eq!(profile.last_name.as_deref(), Some("User"));

    let back = serde_json::to_value(&profile).unwrap();
    assert_eq!(back["firstName"], "Test");
}
