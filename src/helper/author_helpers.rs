use crate::helper::sanitization_helpers;
use crate::helper::{ActionError, FormErrors};
use crate::models::db_operations::posts_db_operations::{self, NewPost};
use crate::models::db_operations::{comments_db_operations, follows_db_operations, groups_db_operations, users_db_operations};
use crate::models::{excerpt, Post};
use crate::DbPool;
use rusqlite::Connection;
use serde::Serialize;

/// Raw values of the post form, kept as typed so an invalid form can be shown again.
#[derive(Debug, Serialize, Default, Clone)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: String,
}

impl PostForm {
    pub fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
            image: post.image.clone().unwrap_or_default(),
        }
    }
}

struct ValidPost {
    text: String,
    group_id: Option<i64>,
    image: Option<String>,
}

fn validate_post_form(conn: &Connection, form: &PostForm) -> Result<ValidPost, ActionError> {
    let mut errors = FormErrors::new();

    let text = sanitization_helpers::strip_all_html(&form.text).trim().to_string();
    if text.is_empty() {
        errors.insert("text", "Post text is required.".to_string());
    }

    let group_id = match form.group.trim() {
        "" => None,
        raw => {
            let existing = match raw.parse::<i64>() {
                Ok(id) => groups_db_operations::read_group_by_id(conn, id)?.map(|group| group.id),
                Err(_) => None,
            };
            if existing.is_none() {
                errors.insert("group", "Select a valid group.".to_string());
            }
            existing
        }
    };

    if !errors.is_empty() {
        return Err(ActionError::Invalid(errors));
    }

    Ok(ValidPost {
        text,
        group_id,
        image: sanitization_helpers::clean_optional(Some(&form.image)),
    })
}

fn load_owned_post(conn: &Connection, editor_id: i64, post_id: i64) -> Result<Post, ActionError> {
    let post = posts_db_operations::read_post(conn, post_id)?
        .ok_or_else(|| ActionError::NotFound(format!("post {}", post_id)))?;
    if post.author_id != editor_id {
        return Err(ActionError::NotAuthor);
    }
    Ok(post)
}

pub fn create_post(pool: &DbPool, author_id: i64, form: &PostForm) -> Result<i64, ActionError> {
    let conn = pool.get()?;
    let valid = validate_post_form(&conn, form)?;
    let post_id = posts_db_operations::create_post(
        &conn,
        &NewPost {
            author_id,
            text: &valid.text,
            group_id: valid.group_id,
            image: valid.image.as_deref(),
        },
    )?;
    log::info!("User {} published post {} ('{}')", author_id, post_id, excerpt(&valid.text));
    Ok(post_id)
}

/// The post as stored, provided `editor_id` wrote it.
pub fn load_post_for_edit(pool: &DbPool, editor_id: i64, post_id: i64) -> Result<Post, ActionError> {
    let conn = pool.get()?;
    load_owned_post(&conn, editor_id, post_id)
}

pub fn edit_post(pool: &DbPool, editor_id: i64, post_id: i64, form: &PostForm) -> Result<(), ActionError> {
    let conn = pool.get()?;
    load_owned_post(&conn, editor_id, post_id)?;
    let valid = validate_post_form(&conn, form)?;
    posts_db_operations::update_post(&conn, post_id, &valid.text, valid.group_id, valid.image.as_deref())?;
    log::info!("User {} edited post {}", editor_id, post_id);
    Ok(())
}

pub fn delete_post(pool: &DbPool, user_id: i64, post_id: i64) -> Result<(), ActionError> {
    let conn = pool.get()?;
    load_owned_post(&conn, user_id, post_id)?;
    posts_db_operations::delete_post(&conn, post_id)?;
    log::info!("User {} deleted post {}", user_id, post_id);
    Ok(())
}

pub fn add_comment(pool: &DbPool, author_id: i64, post_id: i64, text: &str) -> Result<i64, ActionError> {
    let conn = pool.get()?;
    if posts_db_operations::read_post(&conn, post_id)?.is_none() {
        return Err(ActionError::NotFound(format!("post {}", post_id)));
    }
    let text = sanitization_helpers::strip_all_html(text).trim().to_string();
    if text.is_empty() {
        return Err(ActionError::invalid("text", "Comment text is required."));
    }
    Ok(comments_db_operations::create_comment(&conn, post_id, author_id, &text)?)
}

fn author_id_by_username(conn: &Connection, username: &str) -> Result<i64, ActionError> {
    users_db_operations::read_user_by_username(conn, username)?
        .map(|user| user.id)
        .ok_or_else(|| ActionError::NotFound(format!("user '{}'", username)))
}

pub fn follow_author(pool: &DbPool, user_id: i64, username: &str) -> Result<bool, ActionError> {
    let conn = pool.get()?;
    let author_id = author_id_by_username(&conn, username)?;
    Ok(follows_db_operations::follow(&conn, user_id, author_id)?)
}

pub fn unfollow_author(pool: &DbPool, user_id: i64, username: &str) -> Result<bool, ActionError> {
    let conn = pool.get()?;
    let author_id = author_id_by_username(&conn, username)?;
    Ok(follows_db_operations::unfollow(&conn, user_id, author_id)?)
}
