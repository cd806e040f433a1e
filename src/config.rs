use std::env;

/// JS-compatible timestamp format used by every DTO.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Authorization header scheme: `Authorization: Token <jwt>`.
pub const TOKEN_PREFIX: &str = "Token ";

pub const DEFAULT_LIMIT: i64 = 20;

pub struct AppState {
    /// HS256 secret for issuing and checking tokens.
    pub secret: Vec<u8>,
}

impl AppState {
    pub fn manage() -> AppState {
        let secret = env::var("SECRET_KEY").unwrap_or_else(|err| {
            if cfg!(debug_assertions) {
                "conduit-dev-secret-do-not-deploy".to_string()
            } else {
                panic!("No SECRET_KEY environment variable found: {}", err)
            }
        });

        AppState {
            secret: secret.into_bytes(),
        }
    }
}
