use rocket::serde::json::{json, Json, Value};
use serde::Deserialize;
use validator::Validate;

use crate::auth::Auth;
use crate::config::DEFAULT_LIMIT;
use crate::database::articles::{ArticleFilter, ArticleStore, ArticleUpdate};
use crate::database::users::UserStore;
use crate::database::Db;
use crate::errors::{constraint_errors, Errors, FieldValidator};
use crate::models::article::ArticleJson;
use crate::routes::viewer_following_ids;

#[derive(FromForm, Default)]
pub struct ArticlesQuery {
    tag: Option<String>,
    author: Option<String>,
    favorited: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[get("/articles?<params..>")]
pub async fn get_articles(params: ArticlesQuery, auth: Option<Auth>, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let filter = ArticleFilter {
            tag: params.tag,
            author: params.author,
            favorited: params.favorited,
            limit: params.limit,
            offset: params.offset,
        };
        let (records, total) = conn.list_articles(&filter).ok()?;
        let following = viewer_following_ids(conn, auth.as_ref());
        let viewer = auth.map(|viewer| viewer.id);
        let articles: Vec<ArticleJson> = records
            .iter()
            .map(|record| record.to_json(viewer, following.contains(&record.article.author)))
            .collect();
        Some(json!({ "articles": articles, "articlesCount": total }))
    })
    .await
}

#[derive(FromForm, Default)]
pub struct FeedQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[get("/articles/feed?<params..>")]
pub async fn get_articles_feed(params: FeedQuery, auth: Auth, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let (records, total) = conn
            .feed_articles(
                auth.id,
                params.limit.unwrap_or(DEFAULT_LIMIT),
                params.offset.unwrap_or(0),
            )
            .ok()?;
        let following = viewer_following_ids(conn, Some(&auth));
        let articles: Vec<ArticleJson> = records
            .iter()
            .map(|record| record.to_json(Some(auth.id), following.contains(&record.article.author)))
            .collect();
        Some(json!({ "articles": articles, "articlesCount": total }))
    })
    .await
}

#[get("/articles/<slug>")]
pub async fn get_article(slug: String, auth: Option<Auth>, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let record = conn.article_by_slug(&slug).ok()?;
        let following = match auth.as_ref() {
            Some(viewer) => conn.is_follower(record.article.author, viewer.id).ok()?,
            None => false,
        };
        let viewer = auth.map(|viewer| viewer.id);
        Some(json!({ "article": record.to_json(viewer, following) }))
    })
    .await
}

#[derive(Deserialize)]
pub struct NewArticle {
    article: NewArticleData,
}

#[derive(Deserialize, Validate)]
struct NewArticleData {
    #[validate(length(min = 1))]
    title: Option<String>,
    #[validate(length(min = 1))]
    description: Option<String>,
    #[validate(length(min = 1))]
    body: Option<String>,
    #[serde(rename = "tagList", default)]
    tag_list: Vec<String>,
}

#[post("/articles", format = "json", data = "<new_article>")]
pub async fn post_articles(
    new_article: Json<NewArticle>,
    auth: Auth,
    db: Db,
) -> Result<Value, Errors> {
    let new_article = new_article.into_inner().article;

    let mut extractor = FieldValidator::validate(&new_article);
    let title = extractor.extract("title", new_article.title);
    let description = extractor.extract("description", new_article.description);
    let body = extractor.extract("body", new_article.body);
    extractor.check()?;
    let tag_list = new_article.tag_list;

    db.run(move |conn| {
        let author = conn
            .user_by_id(auth.id)
            .map_err(|_| Errors::new(&[("author", "does not exist")]))?;
        conn.create_article(&author, &title, &description, &body, &tag_list)
            .map(|record| json!({ "article": record.to_json(Some(auth.id), false) }))
            .map_err(constraint_errors)
    })
    .await
}

#[derive(Deserialize)]
pub struct UpdateArticle {
    article: UpdateArticleData,
}

#[derive(Deserialize, Validate, Default)]
struct UpdateArticleData {
    #[validate(length(min = 1))]
    title: Option<String>,
    #[validate(length(min = 1))]
    description: Option<String>,
    #[validate(length(min = 1))]
    body: Option<String>,
}

#[put("/articles/<slug>", format = "json", data = "<article>")]
pub async fn put_articles(
    slug: String,
    article: Json<UpdateArticle>,
    auth: Auth,
    db: Db,
) -> Result<Option<Value>, Errors> {
    let article = article.into_inner().article;
    FieldValidator::validate(&article).check()?;

    let update = ArticleUpdate {
        title: article.title,
        description: article.description,
        body: article.body,
    };
    db.run(
        move |conn| match conn.update_article(&slug, auth.id, &update) {
            Ok(record) => Ok(Some(
                json!({ "article": record.to_json(Some(auth.id), false) }),
            )),
            Err(diesel::result::Error::NotFound) => Ok(None),
            Err(err) => Err(constraint_errors(err)),
        },
    )
    .await
}

#[delete("/articles/<slug>")]
pub async fn delete_article(slug: String, auth: Auth, db: Db) -> Option<Value> {
    db.run(move |conn| {
        conn.delete_article(&slug, auth.id)
            .ok()
            .map(|_| json!({}))
    })
    .await
}

#[post("/articles/<slug>/favorite")]
pub async fn favorite(slug: String, auth: Auth, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let record = conn.add_favorite(&slug, auth.id).ok()?;
        let following = conn.is_follower(record.article.author, auth.id).ok()?;
        Some(json!({ "article": record.to_json(Some(auth.id), following) }))
    })
    .await
}

#[delete("/articles/<slug>/favorite")]
pub async fn unfavorite(slug: String, auth: Auth, db: Db) -> Option<Value> {
    db.run(move |conn| {
        let record = conn.remove_favorite(&slug, auth.id).ok()?;
        let following = conn.is_follower(record.article.author, auth.id).ok()?;
        Some(json!({ "article": record.to_json(Some(auth.id), following) }))
    })
    .await
}
