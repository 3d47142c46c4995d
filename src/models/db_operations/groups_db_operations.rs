use crate::models::Group;
use rusqlite::{params, Connection, OptionalExtension, Error as RusqliteError};

fn map_group(row: &rusqlite::Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

pub fn create_group(
    conn: &Connection,
    title: &str,
    slug: &str,
    description: &str,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO post_groups (title, slug, description) VALUES (?1, ?2, ?3)",
        params![title, slug, description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_group_by_slug(conn: &Connection, slug: &str) -> Result<Option<Group>, RusqliteError> {
    conn.query_row(
        "SELECT id, title, slug, description FROM post_groups WHERE slug = ?1",
        [slug],
        map_group,
    )
    .optional()
}

pub fn read_group_by_id(conn: &Connection, group_id: i64) -> Result<Option<Group>, RusqliteError> {
    conn.query_row(
        "SELECT id, title, slug, description FROM post_groups WHERE id = ?1",
        [group_id],
        map_group,
    )
    .optional()
}

pub fn read_all_groups(conn: &Connection) -> Result<Vec<Group>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT id, title, slug, description FROM post_groups ORDER BY title, id")?;
    let rows = stmt.query_map([], map_group)?;

    let mut groups = Vec::new();
    for group in rows {
        groups.push(group?);
    }
    Ok(groups)
}

/// Posts of a deleted group stay, with their group reference nulled.
pub fn delete_group_by_slug(conn: &Connection, slug: &str) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM post_groups WHERE slug = ?1", [slug])
}
