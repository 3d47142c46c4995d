use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters a post shows in titles and log lines.
pub const POST_EXCERPT_CHARS: usize = 15;

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A post row as stored.
#[derive(Debug, Serialize, Clone)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// A post joined with its author and group, the shape every feed renders.
#[derive(Debug, Serialize, Clone)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub excerpt: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub group: Option<Group>,
}

impl fmt::Display for PostView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.excerpt)
    }
}

pub fn excerpt(text: &str) -> String {
    text.chars().take(POST_EXCERPT_CHARS).collect()
}

#[derive(Debug, Serialize, Clone)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

pub mod db_operations;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_keeps_first_fifteen_characters() {
        assert_eq!(excerpt("Short"), "Short");
        assert_eq!(excerpt("0123456789abcdefghij"), "0123456789abcde");
        // Characters, not bytes.
        assert_eq!(excerpt("Тестовый текст поста"), "Тестовый текст ");
    }

    #[test]
    fn group_displays_as_its_title() {
        let group = Group {
            id: 1,
            title: "Rustaceans".to_string(),
            slug: "rust".to_string(),
            description: String::new(),
        };
        assert_eq!(group.to_string(), "Rustaceans");
    }
}
