use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use serde::{Deserialize, Serialize};

use crate::config::{AppState, TOKEN_PREFIX};

/// Token claims. Doubles as the request guard establishing the viewer
/// identity; routes that work for anonymous readers take `Option<Auth>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Auth {
    /// Expiry, as a unix timestamp.
    pub exp: i64,
    pub id: i32,
    pub username: String,
}

impl Auth {
    pub fn new(id: i32, username: &str) -> Self {
        Auth {
            exp: (Utc::now() + Duration::days(60)).timestamp(),
            id,
            username: username.to_string(),
        }
    }

    pub fn token(&self, secret: &[u8]) -> String {
        jsonwebtoken::encode(&Header::default(), self, &EncodingKey::from_secret(secret))
            .expect("jwt encoding")
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = request
            .rocket()
            .state::<AppState>()
            .expect("AppState is managed at launch");
        match auth_from_request(request, &state.secret) {
            Some(auth) => Outcome::Success(auth),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

fn auth_from_request(request: &Request, secret: &[u8]) -> Option<Auth> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix(TOKEN_PREFIX))
        .and_then(|token| decode_token(token, secret))
}

fn decode_token(token: &str, secret: &[u8]) -> Option<Auth> {
    jsonwebtoken::decode::<Auth>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}
