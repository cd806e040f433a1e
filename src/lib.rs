#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate validator_derive;

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod routes;
pub mod schema;

use rocket::fairing::AdHoc;
use rocket::serde::json::{json, Value};
use rocket::{Build, Rocket};
use rocket_cors::{Cors, CorsOptions};

use crate::database::Db;

#[catch(404)]
fn not_found() -> Value {
    json!({ "errors": { "body": ["entity not found"] } })
}

#[catch(401)]
fn unauthorized() -> Value {
    json!({ "errors": { "body": ["missing or invalid authorization"] } })
}

#[catch(422)]
fn unprocessable_entity() -> Value {
    json!({ "errors": { "body": ["unable to process request"] } })
}

fn cors_fairing() -> Cors {
    CorsOptions::default()
        .to_cors()
        .expect("CORS fairing cannot be created")
}

async fn run_migrations(rocket: Rocket<Build>) -> Rocket<Build> {
    use diesel_migrations::MigrationHarness;

    let db = Db::get_one(&rocket)
        .await
        .expect("database connection for migrations");
    db.run(|conn| {
        conn.run_pending_migrations(database::MIGRATIONS)
            .expect("diesel migrations");
    })
    .await;
    rocket
}

pub fn rocket() -> Rocket<Build> {
    dotenv::dotenv().ok();
    let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "conduit.db".to_string());
    let figment = rocket::Config::figment().merge((
        "databases.diesel",
        rocket_sync_db_pools::Config {
            url: db_url,
            pool_size: 10,
            timeout: 5,
        },
    ));

    rocket::custom(figment)
        .attach(Db::fairing())
        .attach(AdHoc::on_ignite("Diesel Migrations", run_migrations))
        .attach(cors_fairing())
        .manage(config::AppState::manage())
        .mount(
            "/api",
            routes![
                routes::users::post_users,
                routes::users::post_users_login,
                routes::users::get_user,
                routes::users::put_user,
                routes::profiles::get_profile,
                routes::profiles::follow,
                routes::profiles::unfollow,
                routes::articles::get_articles,
                routes::articles::get_articles_feed,
                routes::articles::get_article,
                routes::articles::post_articles,
                routes::articles::put_articles,
                routes::articles::delete_article,
                routes::articles::favorite,
                routes::articles::unfavorite,
                routes::comments::post_comment,
                routes::comments::get_comments,
                routes::comments::delete_comment,
                routes::tags::get_tags,
            ],
        )
        .register("/", catchers![not_found, unauthorized, unprocessable_entity])
}
