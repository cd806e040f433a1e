use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::{delete, insert_into, insert_or_ignore_into};

use crate::config::DEFAULT_LIMIT;
use crate::database::Paginate;
use crate::models::article::{Article, ArticleRecord};
use crate::models::comment::Comment;
use crate::models::tag::Tag;
use crate::models::user::User;
use crate::schema::{article_tags, articles, comments, favorites, follows, tags, users};

#[derive(Insertable)]
#[diesel(table_name = articles)]
struct NewArticle<'a> {
    slug: &'a str,
    title: &'a str,
    description: &'a str,
    body: &'a str,
    author: i32,
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
struct NewComment<'a> {
    body: &'a str,
    article: i32,
    author: i32,
}

#[derive(AsChangeset)]
#[diesel(table_name = articles)]
struct ArticleChanges {
    slug: Option<String>,
    title: Option<String>,
    description: Option<String>,
    body: Option<String>,
    updated_at: NaiveDateTime,
}

/// Fields a `PUT /articles/<slug>` may change. A new title re-derives the
/// slug.
#[derive(Debug, Default, Clone)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Default)]
pub struct ArticleFilter {
    pub tag: Option<String>,
    pub author: Option<String>,
    /// Username whose favorites to list.
    pub favorited: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Articles with their tag and favorite associations, plus comments.
/// Listings return the page and the total matching count side by side.
pub trait ArticleStore {
    fn create_article(
        &mut self,
        author: &User,
        title: &str,
        description: &str,
        body: &str,
        tag_list: &[String],
    ) -> QueryResult<ArticleRecord>;
    fn article_by_slug(&mut self, slug: &str) -> QueryResult<ArticleRecord>;
    fn list_articles(&mut self, filter: &ArticleFilter) -> QueryResult<(Vec<ArticleRecord>, i64)>;
    fn feed_articles(
        &mut self,
        viewer: i32,
        limit: i64,
        offset: i64,
    ) -> QueryResult<(Vec<ArticleRecord>, i64)>;
    fn update_article(
        &mut self,
        slug: &str,
        author: i32,
        update: &ArticleUpdate,
    ) -> QueryResult<ArticleRecord>;
    fn delete_article(&mut self, slug: &str, author: i32) -> QueryResult<usize>;
    fn add_favorite(&mut self, slug: &str, user: i32) -> QueryResult<ArticleRecord>;
    fn remove_favorite(&mut self, slug: &str, user: i32) -> QueryResult<ArticleRecord>;
    fn add_comment(&mut self, slug: &str, author: i32, body: &str)
        -> QueryResult<(Comment, User)>;
    fn comments_of_article(&mut self, slug: &str) -> QueryResult<Vec<(Comment, User)>>;
    fn delete_comment(&mut self, slug: &str, comment_id: i32, author: i32) -> QueryResult<usize>;
    fn tag_labels(&mut self) -> QueryResult<Vec<String>>;
}

impl ArticleStore for SqliteConnection {
    fn create_article(
        &mut self,
        author: &User,
        title: &str,
        description: &str,
        body: &str,
        tag_list: &[String],
    ) -> QueryResult<ArticleRecord> {
        self.transaction(|conn| {
            let slug = slugify(title);
            let article: Article = insert_into(articles::table)
                .values(&NewArticle {
                    slug: &slug,
                    title,
                    description,
                    body,
                    author: author.id,
                })
                .get_result(conn)?;

            let mut labels: Vec<String> = Vec::new();
            for label in tag_list {
                let tag = upsert_tag(conn, label)?;
                insert_or_ignore_into(article_tags::table)
                    .values((
                        article_tags::article.eq(article.id),
                        article_tags::tag.eq(tag.id),
                    ))
                    .execute(conn)?;
                if !labels.contains(&tag.name) {
                    labels.push(tag.name);
                }
            }

            Ok(ArticleRecord {
                article,
                author: author.clone(),
                tags: labels,
                favorited_by: Vec::new(),
            })
        })
    }

    fn article_by_slug(&mut self, slug: &str) -> QueryResult<ArticleRecord> {
        let row: (Article, User) = articles::table
            .inner_join(users::table)
            .filter(articles::slug.eq(slug))
            .first(self)?;
        hydrate(self, vec![row])?
            .pop()
            .ok_or(diesel::result::Error::NotFound)
    }

    fn list_articles(&mut self, filter: &ArticleFilter) -> QueryResult<(Vec<ArticleRecord>, i64)> {
        let mut query = articles::table
            .inner_join(users::table)
            .order((articles::created_at.desc(), articles::id.desc()))
            .into_boxed();

        if let Some(ref author) = filter.author {
            query = query.filter(users::username.eq(author.clone()));
        }
        if let Some(ref label) = filter.tag {
            let tagged = article_tags::table
                .inner_join(tags::table)
                .filter(tags::name.eq(label.clone()))
                .select(article_tags::article);
            query = query.filter(articles::id.eq_any(tagged));
        }
        if let Some(ref username) = filter.favorited {
            let favorited: Vec<i32> = favorites::table
                .inner_join(users::table)
                .filter(users::username.eq(username.clone()))
                .select(favorites::article)
                .load(self)?;
            query = query.filter(articles::id.eq_any(favorited));
        }

        let (rows, total) = query
            .paginate(
                filter.limit.unwrap_or(DEFAULT_LIMIT),
                filter.offset.unwrap_or(0),
            )
            .load_with_total::<(Article, User)>(self)?;
        Ok((hydrate(self, rows)?, total))
    }

    fn feed_articles(
        &mut self,
        viewer: i32,
        limit: i64,
        offset: i64,
    ) -> QueryResult<(Vec<ArticleRecord>, i64)> {
        let followed = follows::table
            .filter(follows::follower.eq(viewer))
            .select(follows::followed);
        let (rows, total) = articles::table
            .inner_join(users::table)
            .filter(articles::author.eq_any(followed))
            .order((articles::created_at.desc(), articles::id.desc()))
            .paginate(limit, offset)
            .load_with_total::<(Article, User)>(self)?;
        Ok((hydrate(self, rows)?, total))
    }

    fn update_article(
        &mut self,
        slug: &str,
        author: i32,
        update: &ArticleUpdate,
    ) -> QueryResult<ArticleRecord> {
        let changes = ArticleChanges {
            slug: update.title.as_deref().map(slugify),
            title: update.title.clone(),
            description: update.description.clone(),
            body: update.body.clone(),
            updated_at: Utc::now().naive_utc(),
        };
        let article: Article = diesel::update(
            articles::table
                .filter(articles::slug.eq(slug))
                .filter(articles::author.eq(author)),
        )
        .set(&changes)
        .get_result(self)?;
        let author = users::table.find(article.author).first::<User>(self)?;
        hydrate(self, vec![(article, author)])?
            .pop()
            .ok_or(diesel::result::Error::NotFound)
    }

    fn delete_article(&mut self, slug: &str, author: i32) -> QueryResult<usize> {
        self.transaction(|conn| {
            let article: Article = articles::table
                .filter(articles::slug.eq(slug))
                .filter(articles::author.eq(author))
                .first(conn)?;
            delete(comments::table.filter(comments::article.eq(article.id))).execute(conn)?;
            delete(favorites::table.filter(favorites::article.eq(article.id))).execute(conn)?;
            delete(article_tags::table.filter(article_tags::article.eq(article.id)))
                .execute(conn)?;
            delete(articles::table.find(article.id)).execute(conn)
        })
    }

    fn add_favorite(&mut self, slug: &str, user: i32) -> QueryResult<ArticleRecord> {
        let article_id = article_id_by_slug(self, slug)?;
        insert_or_ignore_into(favorites::table)
            .values((favorites::user.eq(user), favorites::article.eq(article_id)))
            .execute(self)?;
        self.article_by_slug(slug)
    }

    fn remove_favorite(&mut self, slug: &str, user: i32) -> QueryResult<ArticleRecord> {
        let article_id = article_id_by_slug(self, slug)?;
        delete(
            favorites::table
                .filter(favorites::user.eq(user))
                .filter(favorites::article.eq(article_id)),
        )
        .execute(self)?;
        self.article_by_slug(slug)
    }

    fn add_comment(
        &mut self,
        slug: &str,
        author: i32,
        body: &str,
    ) -> QueryResult<(Comment, User)> {
        let article_id = article_id_by_slug(self, slug)?;
        let comment: Comment = insert_into(comments::table)
            .values(&NewComment {
                body,
                article: article_id,
                author,
            })
            .get_result(self)?;
        let author = users::table.find(comment.author).first(self)?;
        Ok((comment, author))
    }

    fn comments_of_article(&mut self, slug: &str) -> QueryResult<Vec<(Comment, User)>> {
        let article_id = article_id_by_slug(self, slug)?;
        comments::table
            .inner_join(users::table)
            .filter(comments::article.eq(article_id))
            .order(comments::id.asc())
            .load(self)
    }

    fn delete_comment(&mut self, slug: &str, comment_id: i32, author: i32) -> QueryResult<usize> {
        let article_id = article_id_by_slug(self, slug)?;
        delete(
            comments::table
                .filter(comments::id.eq(comment_id))
                .filter(comments::article.eq(article_id))
                .filter(comments::author.eq(author)),
        )
        .execute(self)
    }

    fn tag_labels(&mut self) -> QueryResult<Vec<String>> {
        tags::table
            .order(tags::id.asc())
            .load::<Tag>(self)
            .map(|tags| tags.into_iter().map(|tag| tag.name).collect())
    }
}

fn article_id_by_slug(conn: &mut SqliteConnection, slug: &str) -> QueryResult<i32> {
    articles::table
        .filter(articles::slug.eq(slug))
        .select(articles::id)
        .first(conn)
}

fn upsert_tag(conn: &mut SqliteConnection, label: &str) -> QueryResult<Tag> {
    insert_or_ignore_into(tags::table)
        .values(tags::name.eq(label))
        .execute(conn)?;
    tags::table.filter(tags::name.eq(label)).first(conn)
}

/// Attaches tag labels (association order) and favoriting-user ids to a
/// page of articles in two grouped queries.
fn hydrate(
    conn: &mut SqliteConnection,
    rows: Vec<(Article, User)>,
) -> QueryResult<Vec<ArticleRecord>> {
    let ids: Vec<i32> = rows.iter().map(|(article, _)| article.id).collect();

    let tag_rows: Vec<(i32, String)> = article_tags::table
        .inner_join(tags::table)
        .filter(article_tags::article.eq_any(&ids))
        .order(article_tags::id.asc())
        .select((article_tags::article, tags::name))
        .load(conn)?;
    let mut tag_map: HashMap<i32, Vec<String>> = HashMap::new();
    for (article_id, label) in tag_rows {
        tag_map.entry(article_id).or_default().push(label);
    }

    let favorite_rows: Vec<(i32, i32)> = favorites::table
        .filter(favorites::article.eq_any(&ids))
        .select((favorites::article, favorites::user))
        .load(conn)?;
    let mut favorite_map: HashMap<i32, Vec<i32>> = HashMap::new();
    for (article_id, user_id) in favorite_rows {
        favorite_map.entry(article_id).or_default().push(user_id);
    }

    Ok(rows
        .into_iter()
        .map(|(article, author)| ArticleRecord {
            tags: tag_map.remove(&article.id).unwrap_or_default(),
            favorited_by: favorite_map.remove(&article.id).unwrap_or_default(),
            article,
            author,
        })
        .collect())
}

#[cfg(feature = "random-suffix")]
fn slugify(title: &str) -> String {
    use rand::distributions::Alphanumeric;
    use rand::{thread_rng, Rng};

    const SUFFIX_LEN: usize = 6;
    let suffix: String = thread_rng()
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", slug::slugify(title), suffix)
}

#[cfg(not(feature = "random-suffix"))]
fn slugify(title: &str) -> String {
    slug::slugify(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_conn;
    use crate::database::users::UserStore;

    fn fixture_user(conn: &mut SqliteConnection, name: &str) -> User {
        conn.create_user(name, &format!("{}@conduit.dev", name), "hash")
            .expect("create user")
    }

    fn fixture_article(
        conn: &mut SqliteConnection,
        author: &User,
        title: &str,
        tags: &[&str],
    ) -> ArticleRecord {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        conn.create_article(author, title, "description", "body", &tags)
            .expect("create article")
    }

    #[test]
    fn create_round_trips_tags() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "tagger");
        let created = fixture_article(&mut conn, &author, "Tagged piece", &["one", "two", "one"]);

        let fetched = conn.article_by_slug(&created.article.slug).unwrap();
        assert_eq!(fetched.tags, vec!["one", "two"]);
        assert_eq!(fetched.author.username, "tagger");
        assert!(fetched.favorited_by.is_empty());
    }

    #[test]
    fn slug_derives_from_title() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "slugger");
        let record = fixture_article(&mut conn, &author, "Hello, World!", &[]);
        assert!(record.article.slug.starts_with("hello-world"));
    }

    #[test]
    fn favorites_are_idempotent_and_counted() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "favored-author");
        let fan = fixture_user(&mut conn, "fan");
        let record = fixture_article(&mut conn, &author, "Liked", &[]);

        let after = conn.add_favorite(&record.article.slug, fan.id).unwrap();
        assert_eq!(after.favorited_by, vec![fan.id]);
        let again = conn.add_favorite(&record.article.slug, fan.id).unwrap();
        assert_eq!(again.favorited_by.len(), 1);

        let removed = conn.remove_favorite(&record.article.slug, fan.id).unwrap();
        assert!(removed.favorited_by.is_empty());
    }

    #[test]
    fn list_filters_by_tag_author_and_favoriter() {
        let mut conn = test_conn();
        let ada = fixture_user(&mut conn, "ada");
        let ben = fixture_user(&mut conn, "ben");
        let by_ada = fixture_article(&mut conn, &ada, "Ada on lisp", &["lisp"]);
        let _by_ben = fixture_article(&mut conn, &ben, "Ben on forth", &["forth"]);
        conn.add_favorite(&by_ada.article.slug, ben.id).unwrap();

        let (rows, total) = conn
            .list_articles(&ArticleFilter {
                tag: Some("lisp".to_string()),
                ..ArticleFilter::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].article.title, "Ada on lisp");

        let (rows, _) = conn
            .list_articles(&ArticleFilter {
                author: Some("ben".to_string()),
                ..ArticleFilter::default()
            })
            .unwrap();
        assert_eq!(rows[0].article.title, "Ben on forth");

        let (rows, _) = conn
            .list_articles(&ArticleFilter {
                favorited: Some("ben".to_string()),
                ..ArticleFilter::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].article.title, "Ada on lisp");
    }

    #[test]
    fn list_reports_total_beyond_page() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "prolific");
        for n in 0..5 {
            fixture_article(&mut conn, &author, &format!("Piece {}", n), &[]);
        }

        let (rows, total) = conn
            .list_articles(&ArticleFilter {
                limit: Some(2),
                offset: Some(1),
                ..ArticleFilter::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(total, 5);
    }

    #[test]
    fn feed_lists_followed_authors_only() {
        let mut conn = test_conn();
        let ada = fixture_user(&mut conn, "feed-ada");
        let ben = fixture_user(&mut conn, "feed-ben");
        let carl = fixture_user(&mut conn, "feed-carl");
        fixture_article(&mut conn, &ada, "From ada", &[]);
        fixture_article(&mut conn, &ben, "From ben", &[]);

        conn.add_follower(ada.id, carl.id).unwrap();
        let (rows, total) = conn.feed_articles(carl.id, 20, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].article.title, "From ada");
    }

    #[test]
    fn update_changes_slug_with_title() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "editor");
        let record = fixture_article(&mut conn, &author, "First title", &[]);

        let updated = conn
            .update_article(
                &record.article.slug,
                author.id,
                &ArticleUpdate {
                    title: Some("Second title".to_string()),
                    ..ArticleUpdate::default()
                },
            )
            .unwrap();
        assert!(updated.article.slug.starts_with("second-title"));
        assert_eq!(updated.article.body, "body");
    }

    #[test]
    fn update_by_non_author_is_not_found() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "owner");
        let other = fixture_user(&mut conn, "intruder");
        let record = fixture_article(&mut conn, &author, "Owned", &[]);

        let err = conn
            .update_article(
                &record.article.slug,
                other.id,
                &ArticleUpdate {
                    body: Some("hijacked".to_string()),
                    ..ArticleUpdate::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, diesel::result::Error::NotFound);
    }

    #[test]
    fn delete_cascades_comments_favorites_and_tag_links() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "deleter");
        let fan = fixture_user(&mut conn, "deleter-fan");
        let record = fixture_article(&mut conn, &author, "Doomed", &["doom"]);
        let slug = record.article.slug.clone();

        conn.add_favorite(&slug, fan.id).unwrap();
        conn.add_comment(&slug, fan.id, "so long").unwrap();

        conn.delete_article(&slug, author.id).unwrap();
        assert_eq!(
            conn.article_by_slug(&slug).unwrap_err(),
            diesel::result::Error::NotFound
        );
        let comment_count: i64 = comments::table.count().get_result(&mut conn).unwrap();
        assert_eq!(comment_count, 0);
        let favorite_count: i64 = favorites::table.count().get_result(&mut conn).unwrap();
        assert_eq!(favorite_count, 0);
        // labels survive for /tags
        assert_eq!(conn.tag_labels().unwrap(), vec!["doom"]);
    }

    #[test]
    fn comments_come_back_in_creation_order() {
        let mut conn = test_conn();
        let author = fixture_user(&mut conn, "commented");
        let reader = fixture_user(&mut conn, "reader");
        let record = fixture_article(&mut conn, &author, "Discussed", &[]);
        let slug = record.article.slug.clone();

        conn.add_comment(&slug, reader.id, "first").unwrap();
        conn.add_comment(&slug, author.id, "second").unwrap();

        let comments = conn.comments_of_article(&slug).unwrap();
        let bodies: Vec<&str> = comments.iter().map(|(c, _)| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(comments[0].1.username, "reader");

        let deleted = conn
            .delete_comment(&slug, comments[0].0.id, reader.id)
            .unwrap();
        assert_eq!(deleted, 1);
        // only the comment's author may remove it
        let refused = conn
            .delete_comment(&slug, comments[1].0.id, reader.id)
            .unwrap();
        assert_eq!(refused, 0);
    }
}
