use crate::helper::ActionError;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::DbError;
use crate::models::Notification;
use actix_csrf::extractor::{CsrfGuarded, CsrfToken};
use actix_csrf::CsrfMiddleware;
use actix_session::Session;
use actix_web::http::Method;
use actix_web::{http::header, http::StatusCode, web, HttpRequest, HttpResponse};
use rand::rngs::StdRng;
use serde::Deserialize;
use tera::{Context, Tera};
use url::form_urlencoded;

pub mod about;
pub mod auth;
pub mod posts;

/// Registers every public page. The 404 fallback is installed on the `App`
/// itself with [`not_found`].
pub fn config_site(cfg: &mut web::ServiceConfig) {
    cfg.configure(posts::config_posts)
        .configure(auth::config_auth)
        .configure(about::config_about);
}

/// GET pages that render a POST form. Each visit hands out a fresh token
/// cookie; the matching POST handlers check it with `Csrf<web::Form<_>>`.
const CSRF_FORM_PAGES: [&str; 7] = [
    "/auth/login/",
    "/auth/signup/",
    "/auth/logout/",
    "/create/",
    "/posts/{post_id}/",
    "/posts/{post_id}/edit/",
    "/profile/{username}/",
];

pub fn csrf_middleware() -> CsrfMiddleware<StdRng> {
    CSRF_FORM_PAGES
        .iter()
        .fold(CsrfMiddleware::<StdRng>::new(), |csrf, page| csrf.set_cookie(Method::GET, *page))
}

/// Body of the buttons that post nothing but their token.
#[derive(Deserialize)]
pub struct TokenForm {
    csrf_token: CsrfToken,
}

impl CsrfGuarded for TokenForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

pub fn set_notification(session: &Session, message: &str, r#type: &str) {
    let notification = Notification { message: message.to_string(), r#type: r#type.to_string() };
    if let Err(e) = session.insert("notification", &notification) {
        log::warn!("Could not store notification in session: {}", e);
    }
}

/// Context shared by every page: the viewer and any pending notification.
/// The flag tells whether a notification was consumed.
pub fn base_context(viewer: Option<&AuthenticatedUser>, session: &Session) -> (Context, bool) {
    let mut ctx = Context::new();
    ctx.insert("current_user", &viewer);

    let notification = session.get::<Notification>("notification").unwrap_or(None);
    let flashed = notification.is_some();
    if let Some(notification) = notification {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }
    (ctx, flashed)
}

/// The last `page` value of the query string, as typed.
pub fn page_param(req: &HttpRequest) -> Option<String> {
    form_urlencoded::parse(req.query_string().as_bytes())
        .filter(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())
        .last()
}

pub fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status).content_type("text/html; charset=utf-8").body(body)
}

pub fn render(tera: &Tera, template: &str, ctx: &Context, status: StatusCode) -> HttpResponse {
    match tera.render(template, ctx) {
        Ok(rendered) => html(status, rendered),
        Err(err) => {
            log::error!("Template rendering error for '{}': {}", template, err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().append_header((header::LOCATION, location)).finish()
}

pub fn render_not_found(tera: &Tera) -> HttpResponse {
    render(tera, "core/404.html", &Context::new(), StatusCode::NOT_FOUND)
}

pub async fn not_found(tera: web::Data<Tera>) -> HttpResponse {
    render_not_found(&tera)
}

pub fn db_error_response(tera: &Tera, err: DbError) -> HttpResponse {
    match err {
        DbError::NotFound(what) => {
            log::debug!("Not found: {}", what);
            render_not_found(tera)
        }
        other => {
            log::error!("Database failure: {}", other);
            HttpResponse::InternalServerError().body("Internal server error")
        }
    }
}

/// Fallback for action errors the handler did not deal with itself.
pub fn action_error_response(tera: &Tera, err: ActionError) -> HttpResponse {
    match err {
        ActionError::Database(db_err) => db_error_response(tera, db_err),
        ActionError::NotFound(what) => {
            log::debug!("Not found: {}", what);
            render_not_found(tera)
        }
        ActionError::NotAuthor => HttpResponse::Forbidden().body("Only the author can do that."),
        ActionError::Invalid(errors) => {
            HttpResponse::BadRequest().body(format!("Invalid submission: {:?}", errors))
        }
    }
}
