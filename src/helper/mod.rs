use crate::models::db_operations::DbError;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod account_helpers;
pub mod author_helpers;
pub mod public_helpers;
pub mod sanitization_helpers;

/// Field name to message, rendered next to the offending input.
pub type FormErrors = BTreeMap<&'static str, String>;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Only the author can change this post")]
    NotAuthor,
    #[error("Invalid form submission")]
    Invalid(FormErrors),
}

impl From<rusqlite::Error> for ActionError {
    fn from(e: rusqlite::Error) -> Self {
        ActionError::Database(DbError::Rusqlite(e))
    }
}

impl From<r2d2::Error> for ActionError {
    fn from(e: r2d2::Error) -> Self {
        ActionError::Database(DbError::Pool(e))
    }
}

impl ActionError {
    pub fn invalid(field: &'static str, message: &str) -> Self {
        let mut errors = FormErrors::new();
        errors.insert(field, message.to_string());
        ActionError::Invalid(errors)
    }
}
