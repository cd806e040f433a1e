pub mod articles;
pub mod comments;
pub mod profiles;
pub mod tags;
pub mod users;

use diesel::SqliteConnection;

use crate::auth::Auth;
use crate::database::users::UserStore;

/// Followed-author ids for the viewer, empty for anonymous readers. Lists
/// decorate every row against this one fetch instead of a query per row.
pub(crate) fn viewer_following_ids(conn: &mut SqliteConnection, auth: Option<&Auth>) -> Vec<i32> {
    auth.and_then(|viewer| conn.following_ids(viewer.id).ok())
        .unwrap_or_default()
}
