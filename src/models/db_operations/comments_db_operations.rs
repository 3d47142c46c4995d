use crate::models::db_operations::{read_timestamp, timestamp_to_sql};
use crate::models::Comment;
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError};

pub fn create_comment(conn: &Connection, post_id: i64, author_id: i64, text: &str) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text, created) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, author_id, text, timestamp_to_sql(&Utc::now())],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Oldest first, so a thread reads top to bottom.
pub fn read_comments_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Comment>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created
         FROM comments c JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?1
         ORDER BY c.created, c.id",
    )?;
    let rows = stmt.query_map([post_id], |row| {
        Ok(Comment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            author_id: row.get(2)?,
            author_username: row.get(3)?,
            text: row.get(4)?,
            created: read_timestamp(row, 5)?,
        })
    })?;

    let mut comments = Vec::new();
    for comment in rows {
        comments.push(comment?);
    }
    Ok(comments)
}

pub fn count_comments(conn: &Connection, post_id: i64) -> Result<u64, RusqliteError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM comments WHERE post_id = ?1", [post_id], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}
