use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::{delete, insert_into, insert_or_ignore_into, select};

use crate::models::user::User;
use crate::schema::{follows, users};

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    username: &'a str,
    email: &'a str,
    hash: &'a str,
}

/// Partial update; `None` fields keep their stored value.
#[derive(AsChangeset, Default)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.bio.is_none()
            && self.image.is_none()
            && self.hash.is_none()
    }
}

/// User persistence and the follow graph. Follow edges are directed
/// `(follower, followed)` pairs; inserting one twice is a no-op.
pub trait UserStore {
    fn create_user(&mut self, username: &str, email: &str, hash: &str) -> QueryResult<User>;
    fn user_by_id(&mut self, id: i32) -> QueryResult<User>;
    fn user_by_email(&mut self, email: &str) -> QueryResult<User>;
    fn user_by_username(&mut self, username: &str) -> QueryResult<User>;
    fn update_user(&mut self, id: i32, changes: &UserChanges) -> QueryResult<User>;
    fn add_follower(&mut self, followed: i32, follower: i32) -> QueryResult<()>;
    fn remove_follower(&mut self, followed: i32, follower: i32) -> QueryResult<()>;
    fn is_follower(&mut self, followed: i32, follower: i32) -> QueryResult<bool>;
    /// Ids of everyone `follower` follows; used to decorate article lists
    /// without one `is_follower` query per row.
    fn following_ids(&mut self, follower: i32) -> QueryResult<Vec<i32>>;
}

impl UserStore for SqliteConnection {
    fn create_user(&mut self, username: &str, email: &str, hash: &str) -> QueryResult<User> {
        insert_into(users::table)
            .values(&NewUser {
                username,
                email,
                hash,
            })
            .get_result(self)
    }

    fn user_by_id(&mut self, id: i32) -> QueryResult<User> {
        users::table.find(id).first(self)
    }

    fn user_by_email(&mut self, email: &str) -> QueryResult<User> {
        users::table.filter(users::email.eq(email)).first(self)
    }

    fn user_by_username(&mut self, username: &str) -> QueryResult<User> {
        users::table.filter(users::username.eq(username)).first(self)
    }

    fn update_user(&mut self, id: i32, changes: &UserChanges) -> QueryResult<User> {
        diesel::update(users::table.find(id))
            .set(changes)
            .get_result(self)
    }

    fn add_follower(&mut self, followed: i32, follower: i32) -> QueryResult<()> {
        insert_or_ignore_into(follows::table)
            .values((
                follows::follower.eq(follower),
                follows::followed.eq(followed),
            ))
            .execute(self)
            .map(|_| ())
    }

    fn remove_follower(&mut self, followed: i32, follower: i32) -> QueryResult<()> {
        delete(
            follows::table
                .filter(follows::follower.eq(follower))
                .filter(follows::followed.eq(followed)),
        )
        .execute(self)
        .map(|_| ())
    }

    fn is_follower(&mut self, followed: i32, follower: i32) -> QueryResult<bool> {
        select(exists(
            follows::table
                .filter(follows::follower.eq(follower))
                .filter(follows::followed.eq(followed)),
        ))
        .get_result(self)
    }

    fn following_ids(&mut self, follower: i32) -> QueryResult<Vec<i32>> {
        follows::table
            .filter(follows::follower.eq(follower))
            .select(follows::followed)
            .load(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_conn;
    use diesel::result::{DatabaseErrorKind, Error};

    fn fixture_user(conn: &mut SqliteConnection, name: &str) -> User {
        conn.create_user(name, &format!("{}@conduit.dev", name), "hash")
            .expect("create user")
    }

    #[test]
    fn follow_then_is_follower() {
        let mut conn = test_conn();
        let a = fixture_user(&mut conn, "follower-a");
        let b = fixture_user(&mut conn, "followed-b");
        let c = fixture_user(&mut conn, "stranger-c");

        conn.add_follower(b.id, a.id).unwrap();
        assert!(conn.is_follower(b.id, a.id).unwrap());
        // direction matters
        assert!(!conn.is_follower(a.id, b.id).unwrap());
        assert!(!conn.is_follower(c.id, a.id).unwrap());
    }

    #[test]
    fn duplicate_follow_is_idempotent() {
        let mut conn = test_conn();
        let a = fixture_user(&mut conn, "dup-a");
        let b = fixture_user(&mut conn, "dup-b");

        conn.add_follower(b.id, a.id).unwrap();
        conn.add_follower(b.id, a.id).unwrap();
        assert_eq!(conn.following_ids(a.id).unwrap(), vec![b.id]);

        conn.remove_follower(b.id, a.id).unwrap();
        assert!(!conn.is_follower(b.id, a.id).unwrap());
        assert!(conn.following_ids(a.id).unwrap().is_empty());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let mut conn = test_conn();
        fixture_user(&mut conn, "taken");
        let err = conn
            .create_user("taken", "other@conduit.dev", "hash")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
        ));
    }

    #[test]
    fn update_user_keeps_unset_fields() {
        let mut conn = test_conn();
        let user = fixture_user(&mut conn, "updating");
        let updated = conn
            .update_user(
                user.id,
                &UserChanges {
                    bio: Some("now with a bio".to_string()),
                    ..UserChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.username, "updating");
        assert_eq!(updated.bio.as_deref(), Some("now with a bio"));
    }
}
