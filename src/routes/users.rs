use rocket::serde::json::{json, Json, Value};
use rocket::State;
use serde::Deserialize;
use validator::Validate;

use crate::auth::Auth;
use crate::config::AppState;
use crate::database::users::{UserChanges, UserStore};
use crate::database::Db;
use crate::errors::{constraint_errors, Errors, FieldValidator};
use crate::models::user::User;

#[derive(Deserialize)]
pub struct NewUser {
    user: NewUserData,
}

#[derive(Deserialize, Validate)]
struct NewUserData {
    #[validate(length(min = 1))]
    username: Option<String>,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 8))]
    password: Option<String>,
}

#[post("/users", format = "json", data = "<new_user>")]
pub async fn post_users(
    new_user: Json<NewUser>,
    db: Db,
    state: &State<AppState>,
) -> Result<Value, Errors> {
    let new_user = new_user.into_inner().user;

    let mut extractor = FieldValidator::validate(&new_user);
    let username = extractor.extract("username", new_user.username);
    let email = extractor.extract("email", new_user.email);
    let password = extractor.extract("password", new_user.password);
    extractor.check()?;

    let secret = state.secret.clone();
    db.run(move |conn| {
        let hash = User::hash_password(&password);
        conn.create_user(&username, &email, &hash)
            .map(|user| json!({ "user": user.to_user_auth(&secret) }))
            .map_err(constraint_errors)
    })
    .await
}

#[derive(Deserialize)]
pub struct LoginUser {
    user: LoginUserData,
}

#[derive(Deserialize, Validate)]
struct LoginUserData {
    #[validate(email)]
    email: Option<String>,
    password: Option<String>,
}

#[post("/users/login", format = "json", data = "<user>")]
pub async fn post_users_login(
    user: Json<LoginUser>,
    db: Db,
    state: &State<AppState>,
) -> Result<Value, Errors> {
    let user = user.into_inner().user;

    let mut extractor = FieldValidator::validate(&user);
    let email = extractor.extract("email", user.email);
    let password = extractor.extract("password", user.password);
    extractor.check()?;

    let secret = state.secret.clone();
    db.run(move |conn| {
        let invalid = || Errors::new(&[("email or password", "is invalid")]);
        let user = conn.user_by_email(&email).map_err(|_| invalid())?;
        if !user.verify_password(&password) {
            return Err(invalid());
        }
        Ok(json!({ "user": user.to_user_auth(&secret) }))
    })
    .await
}

#[get("/user")]
pub async fn get_user(auth: Auth, db: Db, state: &State<AppState>) -> Option<Value> {
    let secret = state.secret.clone();
    db.run(move |conn| {
        conn.user_by_id(auth.id)
            .map(|user| json!({ "user": user.to_user_auth(&secret) }))
            .ok()
    })
    .await
}

#[derive(Deserialize)]
pub struct UpdateUser {
    user: UpdateUserData,
}

#[derive(Deserialize, Validate, Default)]
struct UpdateUserData {
    #[validate(length(min = 1))]
    username: Option<String>,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 8))]
    password: Option<String>,
    bio: Option<String>,
    image: Option<String>,
}

#[put("/user", format = "json", data = "<user>")]
pub async fn put_user(
    user: Json<UpdateUser>,
    auth: Auth,
    db: Db,
    state: &State<AppState>,
) -> Result<Value, Errors> {
    let user = user.into_inner().user;
    FieldValidator::validate(&user).check()?;

    let secret = state.secret.clone();
    db.run(move |conn| {
        let changes = UserChanges {
            username: user.username,
            email: user.email,
            bio: user.bio,
            image: user.image,
            hash: user.password.as_deref().map(User::hash_password),
        };
        let updated = if changes.is_empty() {
            conn.user_by_id(auth.id)
        } else {
            conn.update_user(auth.id, &changes)
        };
        updated
            .map(|user| json!({ "user": user.to_user_auth(&secret) }))
            .map_err(constraint_errors)
    })
    .await
}
