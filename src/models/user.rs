use diesel::prelude::*;
use rand::rngs::OsRng;
use scrypt::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use scrypt::Scrypt;
use serde::Serialize;

use crate::auth::Auth;
use crate::schema::users;

#[derive(Identifiable, Queryable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub hash: String,
}

/// `{"user": ...}` payload: identity fields plus a fresh token.
#[derive(Serialize)]
pub struct UserAuth<'a> {
    username: &'a str,
    email: &'a str,
    bio: Option<&'a str>,
    image: Option<&'a str>,
    token: String,
}

/// `{"profile": ...}` payload; `following` is viewer-relative and computed
/// by the caller.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub following: bool,
}

impl User {
    pub fn to_user_auth(&self, secret: &[u8]) -> UserAuth {
        let token = Auth::new(self.id, &self.username).token(secret);
        UserAuth {
            username: &self.username,
            email: &self.email,
            bio: self.bio.as_deref(),
            image: self.image.as_deref(),
            token,
        }
    }

    pub fn to_profile(&self, following: bool) -> Profile {
        Profile {
            username: self.username.clone(),
            bio: self.bio.clone(),
            image: self.image.clone(),
            following,
        }
    }

    pub fn hash_password(plain: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Scrypt
            .hash_password(plain.as_bytes(), &salt)
            .expect("scrypt hashing")
            .to_string()
    }

    pub fn verify_password(&self, plain: &str) -> bool {
        PasswordHash::new(&self.hash)
            .map(|parsed| Scrypt.verify_password(plain.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(bio: Option<&str>) -> User {
        User {
            id: 1,
            username: "reader".to_string(),
            email: "reader@conduit.dev".to_string(),
            bio: bio.map(String::from),
            image: None,
            hash: String::new(),
        }
    }

    #[test]
    fn password_round_trips() {
        let mut user = user(None);
        user.hash = User::hash_password("correct horse battery staple");
        assert!(user.verify_password("correct horse battery staple"));
        assert!(!user.verify_password("incorrect horse"));
    }

    #[test]
    fn profile_carries_following_flag() {
        let profile = user(Some("hello")).to_profile(true);
        assert!(profile.following);
        assert_eq!(profile.bio.as_deref(), Some("hello"));
    }
}
