use crate::models::db_operations::{read_timestamp, timestamp_to_sql};
use crate::models::User;
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Error as RusqliteError};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        date_joined: read_timestamp(row, 2)?,
    })
}

pub fn create_user(conn: &Connection, username: &str, password: &str) -> Result<i64, RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO users (username, password_hash, date_joined) VALUES (?1, ?2, ?3)",
        params![username, hashed_password, timestamp_to_sql(&Utc::now())],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, RusqliteError> {
    conn.query_row(
        "SELECT id, username, date_joined FROM users WHERE username = ?1",
        [username],
        map_user,
    )
    .optional()
}

pub fn read_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>, RusqliteError> {
    conn.query_row(
        "SELECT id, username, date_joined FROM users WHERE id = ?1",
        [user_id],
        map_user,
    )
    .optional()
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [username],
        |row| row.get(0),
    )
}

pub fn verify_credentials(conn: &Connection, username: &str, password: &str) -> Option<User> {
    let res: rusqlite::Result<(i64, String)> = conn.query_row(
        "SELECT id, password_hash FROM users WHERE username = ?1",
        [username],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );

    let (id, password_hash) = res.ok()?;
    if !verify(password, &password_hash).unwrap_or(false) {
        return None;
    }
    read_user_by_id(conn, id).ok().flatten()
}

pub fn delete_user(conn: &Connection, user_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM users WHERE id = ?1", [user_id])
}
