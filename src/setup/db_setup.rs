use rusqlite::{Connection, Result as RusqliteResult};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// SQLite leaves foreign keys off per connection, so every connection
/// (pooled or not) has to switch them on.
pub fn enable_foreign_keys(conn: &Connection) -> RusqliteResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

/// Opens the database file, creating it and its folder when missing.
pub fn create_db_file(db_path: &Path) -> Result<Connection, SetupError> {
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    Ok(Connection::open(db_path)?)
}

pub fn setup_blog_db(conn: &mut Connection) -> Result<(), SetupError> {
    enable_foreign_keys(conn)?;
    let tx = conn.transaction()?;

    log::info!("Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            date_joined TEXT NOT NULL
        )",
        [],
    )?;

    log::info!("Creating 'post_groups' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS post_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    log::info!("Creating 'posts' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            pub_date TEXT NOT NULL,
            author_id INTEGER NOT NULL,
            group_id INTEGER,
            image TEXT,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (group_id) REFERENCES post_groups(id) ON DELETE SET NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_posts_pub_date ON posts (pub_date DESC, id DESC)",
        [],
    )?;
    tx.execute("CREATE INDEX IF NOT EXISTS idx_posts_group ON posts (group_id)", [])?;
    tx.execute("CREATE INDEX IF NOT EXISTS idx_posts_author ON posts (author_id)", [])?;

    log::info!("Creating 'comments' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            author_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            created TEXT NOT NULL,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    log::info!("Creating 'follows' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS follows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            author_id INTEGER NOT NULL,
            UNIQUE (user_id, author_id),
            CHECK (user_id <> author_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_blog_db(&mut conn).unwrap();
        setup_blog_db(&mut conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'post_groups', 'posts', 'comments', 'follows')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_blog_db(&mut conn).unwrap();
        let orphan = conn.execute(
            "INSERT INTO posts (text, pub_date, author_id) VALUES ('x', '2024-01-01T00:00:00.000000Z', 42)",
            [],
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn db_file_is_created_with_its_folder() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("blog").join("blog.db");

        let mut conn = create_db_file(&db_path).unwrap();
        setup_blog_db(&mut conn).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn blocked_folder_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blog");
        fs::write(&blocker, b"not a folder").unwrap();

        let result = create_db_file(&blocker.join("blog.db"));
        assert!(matches!(result, Err(SetupError::Io(_))));
    }
}
