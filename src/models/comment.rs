use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::config::DATE_FORMAT;
use crate::models::article::Article;
use crate::models::user::{Profile, User};
use crate::schema::comments;

#[derive(Identifiable, Queryable, Associations, Debug, Clone)]
#[diesel(table_name = comments, belongs_to(Article, foreign_key = article), belongs_to(User, foreign_key = author))]
pub struct Comment {
    pub id: i32,
    pub body: String,
    pub article: i32,
    pub author: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentJson {
    pub id: i32,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
    pub author: Profile,
}

impl Comment {
    pub fn to_json(&self, author: &User, following: bool) -> CommentJson {
        CommentJson {
            id: self.id,
            body: self.body.clone(),
            created_at: self.created_at.format(DATE_FORMAT).to_string(),
            updated_at: self.updated_at.format(DATE_FORMAT).to_string(),
            author: author.to_profile(following),
        }
    }
}
