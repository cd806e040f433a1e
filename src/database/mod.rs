pub mod articles;
pub mod users;

use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use rocket_sync_db_pools::database;

#[database("diesel")]
pub struct Db(diesel::SqliteConnection);

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[cfg(test)]
pub fn test_conn() -> diesel::SqliteConnection {
    use diesel::Connection;
    use diesel_migrations::MigrationHarness;

    let mut conn =
        diesel::SqliteConnection::establish(":memory:").expect("in-memory sqlite connection");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("schema migrations");
    conn
}

use diesel::prelude::*;
use diesel::query_builder::*;
use diesel::query_dsl::methods::LoadQuery;
use diesel::sql_types::BigInt;
use diesel::sqlite::Sqlite;

/// Wraps a query in `SELECT *, COUNT(*) OVER () FROM (...) LIMIT ? OFFSET ?`
/// so listings load one page together with the size of the full matching
/// set, which responses report as `articlesCount`.
pub trait Paginate: Sized {
    fn paginate(self, limit: i64, offset: i64) -> Paginated<Self>;
}

impl<T> Paginate for T {
    fn paginate(self, limit: i64, offset: i64) -> Paginated<Self> {
        Paginated {
            query: self,
            limit,
            offset,
        }
    }
}

#[derive(Debug, Clone, Copy, QueryId)]
pub struct Paginated<T> {
    query: T,
    limit: i64,
    offset: i64,
}

impl<T> Paginated<T> {
    pub fn load_with_total<'a, U>(self, conn: &mut SqliteConnection) -> QueryResult<(Vec<U>, i64)>
    where
        Self: LoadQuery<'a, SqliteConnection, (U, i64)>,
    {
        let rows = self.load::<(U, i64)>(conn)?;
        let total = rows.first().map(|row| row.1).unwrap_or(0);
        let records = rows.into_iter().map(|row| row.0).collect();
        Ok((records, total))
    }
}

impl<T: Query> Query for Paginated<T> {
    type SqlType = (T::SqlType, BigInt);
}

impl<T> RunQueryDsl<SqliteConnection> for Paginated<T> {}

impl<T> QueryFragment<Sqlite> for Paginated<T>
where
    T: QueryFragment<Sqlite>,
{
    fn walk_ast<'a>(&'a self, mut out: AstPass<'_, 'a, Sqlite>) -> QueryResult<()> {
        out.push_sql("SELECT *, COUNT(*) OVER () FROM (");
        self.query.walk_ast(out.reborrow())?;
        out.push_sql(") t LIMIT ");
        out.push_bind_param::<BigInt, _>(&self.limit)?;
        out.push_sql(" OFFSET ");
        out.push_bind_param::<BigInt, _>(&self.offset)?;
        Ok(())
    }
}
