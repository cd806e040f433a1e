use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::config::DATE_FORMAT;
use crate::models::user::{Profile, User};
use crate::schema::articles;

#[derive(Identifiable, Queryable, Associations, Debug, Clone)]
#[diesel(table_name = articles, belongs_to(User, foreign_key = author))]
pub struct Article {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub author: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// An article with the associations a response needs: its author, tag
/// labels in association order, and the ids of users who favorited it.
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub article: Article,
    pub author: User,
    pub tags: Vec<String>,
    pub favorited_by: Vec<i32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArticleJson {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: Profile,
}

impl ArticleRecord {
    /// Projects the record for one viewer. `favorited` is a scan of the
    /// loaded favorite ids; `favoritesCount` ignores the viewer entirely.
    pub fn to_json(&self, viewer: Option<i32>, author_following: bool) -> ArticleJson {
        let favorited = viewer.map_or(false, |id| self.favorited_by.contains(&id));
        ArticleJson {
            slug: self.article.slug.clone(),
            title: self.article.title.clone(),
            description: self.article.description.clone(),
            body: self.article.body.clone(),
            tag_list: self.tags.clone(),
            created_at: self.article.created_at.format(DATE_FORMAT).to_string(),
            updated_at: self.article.updated_at.format(DATE_FORMAT).to_string(),
            favorited,
            favorites_count: self.favorited_by.len() as i64,
            author: self.author.to_profile(author_following),
        }
    }
}
