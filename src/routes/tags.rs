use rocket::serde::json::{json, Value};

use crate::database::articles::ArticleStore;
use crate::database::Db;

#[get("/tags")]
pub async fn get_tags(db: Db) -> Option<Value> {
    db.run(|conn| {
        conn.tag_labels()
            .ok()
            .map(|tags| json!({ "tags": tags }))
    })
    .await
}
