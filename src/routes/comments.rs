use rocket::serde::json::{json, Json, Value};
use serde::Deserialize;
use validator::Validate;

use crate::auth::Auth;
use crate::database::articles::ArticleStore;
use crate::database::Db;
use crate::errors::{Errors, FieldValidator};
use crate::models::comment::CommentJson;
use crate::routes::viewer_following_ids;

#[derive(Deserialize)]
pub struct NewComment {
    comment: NewCommentData,
}

#[derive(Deserialize, Validate)]
struct NewCommentData {
    #[validate(length(min = 1))]
    body: Option<String>,
}

#[post("/articles/<slug>/comments", format = "json", data = "<new_comment>")]
pub async fn post_comment(
    slug: String,
    new_comment: Json<NewComment>,
    auth: Auth,
    db: Db,
) -> Result<Option<Value>, Errors> {
    let new_comment = new_comment.into_inner().comment;

    let mut extractor = FieldValidator::validate(&new_comment);
    let body = extractor.extract("body", new_comment.body);
    extractor.check()?;

    Ok(db
        .run(move |conn| {
            let (comment, author) = conn.add_comment(&slug, auth.id, &body).ok()?;
            Some(json!({ "comment": comment.to_json(&author, false) }))
        })
        .await)
}

#[get("/articles/<slug>/comments")]
pub async fn get_comments(slug: String, auth: Option<Auth>, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let rows = conn.comments_of_article(&slug).ok()?;
        let following = viewer_following_ids(conn, auth.as_ref());
        let comments: Vec<CommentJson> = rows
            .iter()
            .map(|(comment, author)| comment.to_json(author, following.contains(&author.id)))
            .collect();
        Some(json!({ "comments": comments }))
    })
    .await
}

#[delete("/articles/<slug>/comments/<id>")]
pub async fn delete_comment(slug: String, id: i32, auth: Auth, db: Db) -> Option<Value> {
    db.run(
        move |conn| match conn.delete_comment(&slug, id, auth.id) {
            Ok(deleted) if deleted > 0 => Some(json!({})),
            _ => None,
        },
    )
    .await
}
