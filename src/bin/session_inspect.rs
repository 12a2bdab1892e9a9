use log::{error, info, warn};
use std::process;

use bss_session::auth::claims::{extract_bearer_token, ParsedToken};
use bss_session::auth::user::User;

fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Token from the first argument, else from the environment
    let raw = match std::env::args().nth(1).or_else(|| std::env::var("BSS_ACCESS_TOKEN").ok()) {
        Some(raw) => raw,
        None => {
            error!("Usage: session_inspect <token> (or set BSS_ACCESS_TOKEN)");
            process::exit(2);
        }
    };
    let token = extract_bearer_token(&raw).unwrap_or(raw);

    let claims = match ParsedToken::decode_unverified(&token) {
        Ok(claims) => claims,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let summary = serde_json::json!({
        "user": User::from_claims(&claims),
        "realmRoles": claims.realm_roles(),
        "resourceAccess": claims.resource_access,
        "expiresAt": claims.exp,
        "secondsUntilExpiration": claims.seconds_until_expiration(),
        "expired": claims.is_expired(),
    });

    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to render token summary: {}", e);
            process::exit(1);
        }
    }
}
