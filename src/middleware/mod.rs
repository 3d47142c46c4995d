use crate::helper::account_helpers::SESSION_USER_ID;
use crate::models::db_operations::users_db_operations;
use crate::DbPool;
use actix_session::SessionExt;
use actix_web::error::ErrorInternalServerError;
use actix_web::{dev, http::header, web, FromRequest, HttpRequest, HttpResponse};
use serde::Serialize;
use std::future::{ready, Ready};
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/auth/login/";

/// The logged-in user, read from the session cookie and checked against the
/// users table.
///
/// Extracting it on a handler makes the route login-only: anonymous requests
/// are redirected to the login page with `next` pointing back. Use
/// `Option<AuthenticatedUser>` where anonymous access is fine.
#[derive(Serialize, Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, actix_web::Error> {
    let session = req.get_session();
    let user_id = match session.get::<i64>(SESSION_USER_ID) {
        Ok(Some(id)) => id,
        _ => return Err(login_redirect(req)),
    };

    let pool = req
        .app_data::<web::Data<DbPool>>()
        .ok_or_else(|| ErrorInternalServerError("Database pool is not configured."))?;
    let conn = pool.get().map_err(|e| {
        log::error!("Could not get a database connection to check the session: {}", e);
        ErrorInternalServerError("Database unavailable.")
    })?;

    match users_db_operations::read_user_by_id(&conn, user_id) {
        Ok(Some(user)) => Ok(AuthenticatedUser { id: user.id, username: user.username }),
        Ok(None) => {
            // The account was deleted while the cookie lived on.
            log::warn!("Session refers to missing user {}; logging it out", user_id);
            session.purge();
            Err(login_redirect(req))
        }
        Err(e) => {
            log::error!("Could not load session user {}: {}", user_id, e);
            Err(ErrorInternalServerError("Database error."))
        }
    }
}

pub fn login_url(next: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN_PATH, encoded)
}

fn login_redirect(req: &HttpRequest) -> actix_web::Error {
    let next = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let response = HttpResponse::Found()
        .append_header((header::LOCATION, login_url(next)))
        .finish();
    actix_web::error::InternalError::from_response("Login required.", response).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_encodes_the_return_path() {
        assert_eq!(login_url("/create/"), "/auth/login/?next=%2Fcreate%2F");
        assert_eq!(login_url("/follow/?page=2"), "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2");
    }
}
