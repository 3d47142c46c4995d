use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use thiserror::Error;

pub mod comments_db_operations;
pub mod follows_db_operations;
pub mod groups_db_operations;
pub mod posts_db_operations;
pub mod users_db_operations;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

/// Fixed-width RFC 3339 so that text ordering in SQLite matches time ordering.
pub fn timestamp_to_sql(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn read_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::setup::db_setup;
    use rusqlite::Connection;

    /// A fresh in-memory database with the full schema applied.
    pub fn open_blog_db() -> Connection {
        let mut conn = Connection::open_in_memory().expect("in-memory database");
        db_setup::setup_blog_db(&mut conn).expect("schema");
        conn
    }
}
