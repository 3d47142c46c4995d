use rusqlite::{params, Connection, Error as RusqliteError};

/// Returns `true` when a new relationship was recorded. Following yourself or
/// someone you already follow changes nothing.
pub fn follow(conn: &Connection, user_id: i64, author_id: i64) -> Result<bool, RusqliteError> {
    if user_id == author_id {
        return Ok(false);
    }
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?1, ?2)",
        params![user_id, author_id],
    )?;
    Ok(inserted > 0)
}

/// Returns `true` when a relationship was removed.
pub fn unfollow(conn: &Connection, user_id: i64, author_id: i64) -> Result<bool, RusqliteError> {
    let removed = conn.execute(
        "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
        params![user_id, author_id],
    )?;
    Ok(removed > 0)
}

pub fn is_following(conn: &Connection, user_id: i64, author_id: i64) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = ?1 AND author_id = ?2)",
        params![user_id, author_id],
        |row| row.get(0),
    )
}

pub fn count_follows(conn: &Connection) -> Result<u64, RusqliteError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM follows", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub fn count_followers(conn: &Connection, author_id: i64) -> Result<u64, RusqliteError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM follows WHERE author_id = ?1", [author_id], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub fn count_following(conn: &Connection, user_id: i64) -> Result<u64, RusqliteError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM follows WHERE user_id = ?1", [user_id], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}
