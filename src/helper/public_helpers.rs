use crate::models::db_operations::posts_db_operations::{self, FeedScope};
use crate::models::db_operations::{
    comments_db_operations, follows_db_operations, groups_db_operations, users_db_operations, DbError,
};
use crate::models::{Comment, Group, PostView, User};
use crate::pagination::{Page, Paginator};
use crate::DbPool;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Serialize)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostView>,
}

#[derive(Serialize)]
pub struct ProfileFeed {
    pub author: User,
    pub posts_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    /// Whether the viewer follows this author; always false for anonymous viewers.
    pub following: bool,
    pub page: Page<PostView>,
}

#[derive(Serialize)]
pub struct PostDetail {
    pub post: PostView,
    pub author_posts: u64,
    pub comments: Vec<Comment>,
}

/// Counts the scope, resolves the requested page against it and loads that slice.
fn paginate_scope(
    conn: &Connection,
    scope: FeedScope,
    raw_page: Option<&str>,
    per_page: u32,
) -> Result<Page<PostView>, DbError> {
    let paginator = Paginator::new(posts_db_operations::count_posts(conn, scope)?, per_page);
    let number = paginator.resolve(raw_page);
    let items = posts_db_operations::read_post_views(conn, scope, paginator.window(number))?;
    Ok(paginator.page(number, items))
}

pub fn verify_user_credentials(pool: &DbPool, username: &str, password: &str) -> Option<User> {
    let conn = pool.get().ok()?;
    users_db_operations::verify_credentials(&conn, username, password)
}

pub fn fetch_index_feed(pool: &DbPool, raw_page: Option<&str>, per_page: u32) -> Result<Page<PostView>, DbError> {
    let conn = pool.get()?;
    paginate_scope(&conn, FeedScope::All, raw_page, per_page)
}

pub fn fetch_group_feed(
    pool: &DbPool,
    slug: &str,
    raw_page: Option<&str>,
    per_page: u32,
) -> Result<GroupFeed, DbError> {
    let conn = pool.get()?;
    let group = groups_db_operations::read_group_by_slug(&conn, slug)?
        .ok_or_else(|| DbError::NotFound(format!("group '{}'", slug)))?;
    let page = paginate_scope(&conn, FeedScope::Group(group.id), raw_page, per_page)?;
    Ok(GroupFeed { group, page })
}

pub fn fetch_profile_feed(
    pool: &DbPool,
    username: &str,
    viewer_id: Option<i64>,
    raw_page: Option<&str>,
    per_page: u32,
) -> Result<ProfileFeed, DbError> {
    let conn = pool.get()?;
    let author = users_db_operations::read_user_by_username(&conn, username)?
        .ok_or_else(|| DbError::NotFound(format!("user '{}'", username)))?;

    let page = paginate_scope(&conn, FeedScope::Author(author.id), raw_page, per_page)?;
    let following = match viewer_id {
        Some(viewer_id) => follows_db_operations::is_following(&conn, viewer_id, author.id)?,
        None => false,
    };

    Ok(ProfileFeed {
        posts_count: page.count,
        followers_count: follows_db_operations::count_followers(&conn, author.id)?,
        following_count: follows_db_operations::count_following(&conn, author.id)?,
        following,
        author,
        page,
    })
}

pub fn fetch_follow_feed(
    pool: &DbPool,
    user_id: i64,
    raw_page: Option<&str>,
    per_page: u32,
) -> Result<Page<PostView>, DbError> {
    let conn = pool.get()?;
    paginate_scope(&conn, FeedScope::FollowedBy(user_id), raw_page, per_page)
}

pub fn fetch_post_detail(pool: &DbPool, post_id: i64) -> Result<PostDetail, DbError> {
    let conn = pool.get()?;
    let post = posts_db_operations::read_post_view(&conn, post_id)?
        .ok_or_else(|| DbError::NotFound(format!("post {}", post_id)))?;
    let author_posts = posts_db_operations::count_posts(&conn, FeedScope::Author(post.author_id))?;
    let comments = comments_db_operations::read_comments_for_post(&conn, post_id)?;
    Ok(PostDetail { post, author_posts, comments })
}

pub fn fetch_all_groups(pool: &DbPool) -> Result<Vec<Group>, DbError> {
    let conn = pool.get()?;
    Ok(groups_db_operations::read_all_groups(&conn)?)
}
