use rocket::serde::json::{json, Value};

use crate::auth::Auth;
use crate::database::users::UserStore;
use crate::database::Db;

#[get("/profiles/<username>")]
pub async fn get_profile(username: String, auth: Option<Auth>, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let user = conn.user_by_username(&username).ok()?;
        let following = match auth {
            Some(viewer) => conn.is_follower(user.id, viewer.id).ok()?,
            None => false,
        };
        Some(json!({ "profile": user.to_profile(following) }))
    })
    .await
}

#[post("/profiles/<username>/follow")]
pub async fn follow(username: String, auth: Auth, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let user = conn.user_by_username(&username).ok()?;
        conn.add_follower(user.id, auth.id).ok()?;
        let following = conn.is_follower(user.id, auth.id).ok()?;
        Some(json!({ "profile": user.to_profile(following) }))
    })
    .await
}

#[delete("/profiles/<username>/follow")]
pub async fn unfollow(username: String, auth: Auth, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let user = conn.user_by_username(&username).ok()?;
        conn.remove_follower(user.id, auth.id).ok()?;
        let following = conn.is_follower(user.id, auth.id).ok()?;
        Some(json!({ "profile": user.to_profile(following) }))
    })
    .await
}
