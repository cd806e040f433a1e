use diesel::prelude::*;

use crate::schema::tags;

#[derive(Identifiable, Queryable, Debug, Clone)]
#[diesel(table_name = tags)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}
