use crate::models::db_operations::{read_timestamp, timestamp_to_sql};
use crate::models::{excerpt, Group, Post, PostView};
use crate::pagination::PageWindow;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Error as RusqliteError};

/// Which slice of the post table a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows.
    FollowedBy(i64),
}

impl FeedScope {
    fn filter(&self) -> (&'static str, Option<i64>) {
        match *self {
            FeedScope::All => ("", None),
            FeedScope::Group(id) => ("WHERE p.group_id = ?", Some(id)),
            FeedScope::Author(id) => ("WHERE p.author_id = ?", Some(id)),
            FeedScope::FollowedBy(id) => (
                "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ?)",
                Some(id),
            ),
        }
    }
}

pub struct NewPost<'a> {
    pub author_id: i64,
    pub text: &'a str,
    pub group_id: Option<i64>,
    pub image: Option<&'a str>,
}

const POST_VIEW_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, p.author_id, u.username,
        g.id, g.title, g.slug, g.description
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id";

// Newest first; posts created within the same microsecond fall back to insertion order.
const FEED_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

fn map_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        text: row.get(1)?,
        pub_date: read_timestamp(row, 2)?,
        author_id: row.get(3)?,
        group_id: row.get(4)?,
        image: row.get(5)?,
    })
}

fn map_post_view(row: &rusqlite::Row) -> rusqlite::Result<PostView> {
    let text: String = row.get(1)?;
    let group = match row.get::<_, Option<i64>>(6)? {
        Some(id) => Some(Group {
            id,
            title: row.get(7)?,
            slug: row.get(8)?,
            description: row.get(9)?,
        }),
        None => None,
    };
    Ok(PostView {
        id: row.get(0)?,
        excerpt: excerpt(&text),
        text,
        pub_date: read_timestamp(row, 2)?,
        image: row.get(3)?,
        author_id: row.get(4)?,
        author_username: row.get(5)?,
        group,
    })
}

pub fn create_post(conn: &Connection, post: &NewPost) -> Result<i64, RusqliteError> {
    create_post_at(conn, post, Utc::now())
}

pub fn create_post_at(conn: &Connection, post: &NewPost, pub_date: DateTime<Utc>) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO posts (text, pub_date, author_id, group_id, image) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![post.text, timestamp_to_sql(&pub_date), post.author_id, post.group_id, post.image],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_post(conn: &Connection, post_id: i64) -> Result<Option<Post>, RusqliteError> {
    conn.query_row(
        "SELECT id, text, pub_date, author_id, group_id, image FROM posts WHERE id = ?1",
        [post_id],
        map_post,
    )
    .optional()
}

pub fn read_post_view(conn: &Connection, post_id: i64) -> Result<Option<PostView>, RusqliteError> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", POST_VIEW_SELECT),
        [post_id],
        map_post_view,
    )
    .optional()
}

/// Rewrites the editable fields; author and publication date never change.
pub fn update_post(
    conn: &Connection,
    post_id: i64,
    text: &str,
    group_id: Option<i64>,
    image: Option<&str>,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE posts SET text = ?1, group_id = ?2, image = ?3 WHERE id = ?4",
        params![text, group_id, image, post_id],
    )
}

/// Comments go with the post (ON DELETE CASCADE).
pub fn delete_post(conn: &Connection, post_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])
}

pub fn count_posts(conn: &Connection, scope: FeedScope) -> Result<u64, RusqliteError> {
    let (filter, scope_id) = scope.filter();
    let sql = format!("SELECT COUNT(*) FROM posts p {}", filter);
    let count: i64 = conn.query_row(&sql, params_from_iter(scope_id), |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub fn read_post_views(
    conn: &Connection,
    scope: FeedScope,
    window: PageWindow,
) -> Result<Vec<PostView>, RusqliteError> {
    let (filter, scope_id) = scope.filter();
    let sql = format!("{} {} {} LIMIT ? OFFSET ?", POST_VIEW_SELECT, filter, FEED_ORDER);

    let offset = i64::try_from(window.offset).unwrap_or(i64::MAX);
    let bound: Vec<i64> = scope_id
        .into_iter()
        .chain([i64::from(window.limit), offset])
        .collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bound), map_post_view)?;

    let mut posts = Vec::new();
    for post in rows {
        posts.push(post?);
    }
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::test_support::open_blog_db;
    use crate::models::db_operations::{follows_db_operations, groups_db_operations, users_db_operations};
    use chrono::TimeZone;

    fn all(limit: u32) -> PageWindow {
        PageWindow { limit, offset: 0 }
    }

    fn new_post(author_id: i64, text: &str, group_id: Option<i64>) -> NewPost<'_> {
        NewPost { author_id, text, group_id, image: None }
    }

    #[test]
    fn feed_is_newest_first() {
        let conn = open_blog_db();
        let author = users_db_operations::create_user(&conn, "ann", "password-one").unwrap();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let older = create_post_at(&conn, &new_post(author, "older", None), base).unwrap();
        let newer = create_post_at(&conn, &new_post(author, "newer", None), base + chrono::Duration::hours(1)).unwrap();
        let same_time = create_post_at(&conn, &new_post(author, "same time", None), base).unwrap();

        let ids: Vec<i64> = read_post_views(&conn, FeedScope::All, all(10))
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![newer, same_time, older]);
    }

    #[test]
    fn window_slices_the_feed() {
        let conn = open_blog_db();
        let author = users_db_operations::create_user(&conn, "ann", "password-one").unwrap();
        for i in 0..13 {
            create_post(&conn, &new_post(author, &format!("post {}", i), None)).unwrap();
        }

        assert_eq!(count_posts(&conn, FeedScope::All).unwrap(), 13);
        assert_eq!(read_post_views(&conn, FeedScope::All, PageWindow { limit: 10, offset: 0 }).unwrap().len(), 10);
        let rest = read_post_views(&conn, FeedScope::All, PageWindow { limit: 10, offset: 10 }).unwrap();
        assert_eq!(rest.len(), 3);
        assert_eq!(rest.last().unwrap().text, "post 0");
    }

    #[test]
    fn group_scope_excludes_other_groups() {
        let conn = open_blog_db();
        let author = users_db_operations::create_user(&conn, "ann", "password-one").unwrap();
        let a = groups_db_operations::create_group(&conn, "A", "group-a", "").unwrap();
        let b = groups_db_operations::create_group(&conn, "B", "group-b", "").unwrap();
        let post = create_post(&conn, &new_post(author, "in A", Some(a))).unwrap();
        create_post(&conn, &new_post(author, "no group", None)).unwrap();

        let in_a = read_post_views(&conn, FeedScope::Group(a), all(10)).unwrap();
        assert_eq!(in_a.len(), 1);
        assert_eq!(in_a[0].id, post);
        assert_eq!(in_a[0].group.as_ref().map(|g| g.slug.as_str()), Some("group-a"));
        assert_eq!(count_posts(&conn, FeedScope::Group(b)).unwrap(), 0);
    }

    #[test]
    fn author_and_follow_scopes() {
        let conn = open_blog_db();
        let ann = users_db_operations::create_user(&conn, "ann", "password-one").unwrap();
        let bob = users_db_operations::create_user(&conn, "bob", "password-two").unwrap();
        let cid = users_db_operations::create_user(&conn, "cid", "password-six").unwrap();
        create_post(&conn, &new_post(ann, "by ann", None)).unwrap();
        create_post(&conn, &new_post(bob, "by bob", None)).unwrap();

        assert_eq!(count_posts(&conn, FeedScope::Author(ann)).unwrap(), 1);
        assert_eq!(count_posts(&conn, FeedScope::FollowedBy(cid)).unwrap(), 0);

        follows_db_operations::follow(&conn, cid, bob).unwrap();
        let feed = read_post_views(&conn, FeedScope::FollowedBy(cid), all(10)).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author_username, "bob");
    }

    #[test]
    fn deleting_a_group_keeps_its_posts() {
        let conn = open_blog_db();
        let author = users_db_operations::create_user(&conn, "ann", "password-one").unwrap();
        let group = groups_db_operations::create_group(&conn, "A", "group-a", "").unwrap();
        let post = create_post(&conn, &new_post(author, "in A", Some(group))).unwrap();

        groups_db_operations::delete_group_by_slug(&conn, "group-a").unwrap();
        let kept = read_post(&conn, post).unwrap().expect("post survives");
        assert_eq!(kept.group_id, None);
    }

    #[test]
    fn update_changes_text_and_group_only() {
        let conn = open_blog_db();
        let author = users_db_operations::create_user(&conn, "ann", "password-one").unwrap();
        let group = groups_db_operations::create_group(&conn, "A", "group-a", "").unwrap();
        let post = create_post(&conn, &new_post(author, "draft", None)).unwrap();
        let before = read_post(&conn, post).unwrap().unwrap();

        update_post(&conn, post, "final", Some(group), Some("posts/cover.png")).unwrap();
        let after = read_post_view(&conn, post).unwrap().unwrap();
        assert_eq!(after.text, "final");
        assert_eq!(after.group.map(|g| g.id), Some(group));
        assert_eq!(after.image.as_deref(), Some("posts/cover.png"));
        assert_eq!(after.pub_date, before.pub_date);
        assert_eq!(after.author_id, author);
    }
}
