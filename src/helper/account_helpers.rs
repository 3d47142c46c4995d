use crate::helper::{ActionError, FormErrors};
use crate::models::db_operations::users_db_operations;
use crate::models::User;
use crate::DbPool;
use actix_session::Session;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 150;

pub const SESSION_USER_ID: &str = "user_id";

/// Letters, digits and `@ . + - _`, like most account systems accept.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
}

pub fn sign_up(pool: &DbPool, username: &str, password: &str, password_confirm: &str) -> Result<User, ActionError> {
    let username = username.trim();
    let mut errors = FormErrors::new();

    if !is_valid_username(username) {
        errors.insert(
            "username",
            format!("Use up to {} letters, digits and @/./+/-/_ characters.", MAX_USERNAME_LEN),
        );
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert("password", format!("Password must be at least {} characters.", MIN_PASSWORD_LEN));
    } else if password != password_confirm {
        errors.insert("password_confirm", "The two passwords do not match.".to_string());
    }
    if !errors.is_empty() {
        return Err(ActionError::Invalid(errors));
    }

    let conn = pool.get()?;
    if users_db_operations::username_exists(&conn, username)? {
        return Err(ActionError::invalid("username", "A user with that username already exists."));
    }
    let user_id = users_db_operations::create_user(&conn, username, password)?;
    log::info!("New account '{}' registered", username);
    users_db_operations::read_user_by_id(&conn, user_id)?
        .ok_or_else(|| ActionError::NotFound(format!("user {}", user_id)))
}

pub fn log_in(session: &Session, user: &User) -> Result<(), actix_web::Error> {
    session.renew();
    session.insert(SESSION_USER_ID, user.id)?;
    Ok(())
}

pub fn log_out(session: &Session) {
    session.purge();
}

/// Only same-site paths are followed after login.
pub fn safe_redirect_target(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(is_valid_username("leo.tolstoy+1@home"));
        assert!(is_valid_username("Лев"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"a".repeat(MAX_USERNAME_LEN + 1)));
    }

    #[test]
    fn redirect_targets_stay_on_site() {
        assert_eq!(safe_redirect_target(Some("/create/")), "/create/");
        assert_eq!(safe_redirect_target(Some("//evil.example")), "/");
        assert_eq!(safe_redirect_target(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect_target(None), "/");
    }
}
