table! {
    articles (id) {
        id -> Integer,
        slug -> Text,
        title -> Text,
        description -> Text,
        body -> Text,
        author -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    article_tags (id) {
        id -> Integer,
        article -> Integer,
        tag -> Integer,
    }
}

table! {
    comments (id) {
        id -> Integer,
        body -> Text,
        article -> Integer,
        author -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    favorites (user, article) {
        user -> Integer,
        article -> Integer,
    }
}

table! {
    follows (follower, followed) {
        follower -> Integer,
        followed -> Integer,
    }
}

table! {
    tags (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    users (id) {
        id -> Integer,
        username -> Text,
        email -> Text,
        bio -> Nullable<Text>,
        image -> Nullable<Text>,
        hash -> Text,
    }
}

joinable!(articles -> users (author));
joinable!(article_tags -> articles (article));
joinable!(article_tags -> tags (tag));
joinable!(comments -> articles (article));
joinable!(comments -> users (author));
joinable!(favorites -> articles (article));
joinable!(favorites -> users (user));

allow_tables_to_appear_in_same_query!(
    articles,
    article_tags,
    comments,
    favorites,
    follows,
    tags,
    users,
);
