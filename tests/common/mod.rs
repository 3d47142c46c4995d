#![allow(dead_code)]

use actix_web::cookie::{Cookie, Key};
use actix_web::test::TestRequest;
use actix_web::web;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use inkwell_backend::models::db_operations::posts_db_operations::{self, NewPost};
use inkwell_backend::models::db_operations::{groups_db_operations, users_db_operations};
use inkwell_backend::setup::db_setup;
use inkwell_backend::{create_pool, load_templates, AppState, DbPool};
use rusqlite::Connection;
use std::time::Duration;
use tempfile::TempDir;
use tera::Tera;

pub const PASSWORD: &str = "correct-horse-battery";

/// A throwaway blog: its own SQLite file, templates, and session key.
pub struct TestBlog {
    _dir: TempDir,
    pub pool: DbPool,
    pub tera: Tera,
    pub state: web::Data<AppState>,
    pub key: Key,
}

impl TestBlog {
    /// Home-feed caching is off so every request sees fresh rows.
    pub fn new() -> Self {
        Self::with_cache(Duration::ZERO)
    }

    pub fn with_cache(ttl: Duration) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("blog.db");
        let mut conn = Connection::open(&db_path).expect("open blog db");
        db_setup::setup_blog_db(&mut conn).expect("create schema");
        drop(conn);

        let pool = create_pool(&db_path).expect("build pool");
        let tera = load_templates(concat!(env!("CARGO_MANIFEST_DIR"), "/templates")).expect("load templates");

        TestBlog {
            _dir: dir,
            pool,
            tera,
            state: web::Data::new(AppState::new(10, ttl)),
            key: Key::generate(),
        }
    }

    pub fn conn(&self) -> r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager> {
        self.pool.get().expect("pooled connection")
    }

    pub fn user(&self, username: &str) -> i64 {
        users_db_operations::create_user(&self.conn(), username, PASSWORD).expect("create user")
    }

    pub fn group(&self, title: &str, slug: &str) -> i64 {
        groups_db_operations::create_group(&self.conn(), title, slug, "").expect("create group")
    }

    /// Inserts `count` posts one minute apart, newest last.
    pub fn posts(&self, author_id: i64, group_id: Option<i64>, count: usize) -> Vec<i64> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let conn = self.conn();
        (0..count)
            .map(|i| {
                let text = format!("Post number {}", i);
                let post = NewPost { author_id, text: &text, group_id, image: None };
                posts_db_operations::create_post_at(&conn, &post, start + ChronoDuration::minutes(i as i64))
                    .expect("create post")
            })
            .collect()
    }
}

/// Builds the full site around a [`TestBlog`], the same way `main` wires it.
macro_rules! init_app {
    ($blog:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        $blog.key.clone(),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new($blog.tera.clone()))
                .app_data(actix_web::web::Data::new($blog.pool.clone()))
                .app_data($blog.state.clone())
                .service(
                    actix_web::web::scope("")
                        .wrap(inkwell_backend::routes::csrf_middleware())
                        .configure(inkwell_backend::routes::config_site),
                )
                .default_service(actix_web::web::to(inkwell_backend::routes::not_found)),
        )
        .await
    };
}

/// Loads a form page and returns its CSRF token plus the cookies to send it with.
macro_rules! form_token {
    ($app:expr, $uri:expr, $cookies:expr) => {{
        let cookies: &[actix_web::cookie::Cookie<'static>] = $cookies;
        let req = common::with_cookies(actix_web::test::TestRequest::get().uri($uri), cookies).to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "form page {} should render", $uri);
        let fresh: Vec<actix_web::cookie::Cookie<'static>> =
            resp.response().cookies().map(|c| c.into_owned()).collect();
        let body = actix_web::test::read_body(resp).await;
        let token = common::csrf_token_in(std::str::from_utf8(&body).expect("utf-8 body"));
        (token, common::merge_cookies(cookies, fresh))
    }};
}

/// Logs in through the real form and returns the session and CSRF cookies.
macro_rules! log_in {
    ($app:expr, $username:expr) => {{
        let (token, cookies) = form_token!($app, "/auth/login/", &[]);
        let req = common::with_cookies(actix_web::test::TestRequest::post().uri("/auth/login/"), &cookies)
            .set_form([("csrf_token", token.as_str()), ("username", $username), ("password", common::PASSWORD)])
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FOUND, "login should redirect");
        let fresh: Vec<actix_web::cookie::Cookie<'static>> =
            resp.response().cookies().map(|c| c.into_owned()).collect();
        common::merge_cookies(&cookies, fresh)
    }};
}

/// Pulls the value of the hidden `csrf_token` input out of a rendered form.
pub fn csrf_token_in(body: &str) -> String {
    let marker = "name=\"csrf_token\" value=\"";
    let start = body.find(marker).expect("page has a csrf_token input") + marker.len();
    let end = body[start..].find('"').expect("closing quote") + start;
    html_escape::decode_html_entities(&body[start..end]).into_owned()
}

/// Cookies set by a later response replace earlier ones with the same name.
pub fn merge_cookies(current: &[Cookie<'static>], fresh: Vec<Cookie<'static>>) -> Vec<Cookie<'static>> {
    let mut merged: Vec<Cookie<'static>> =
        current.iter().filter(|c| fresh.iter().all(|f| f.name() != c.name())).cloned().collect();
    merged.extend(fresh);
    merged
}

pub fn with_cookies(mut req: TestRequest, cookies: &[Cookie<'static>]) -> TestRequest {
    for cookie in cookies {
        req = req.cookie(cookie.clone());
    }
    req
}

pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn post_cards(body: &str) -> usize {
    body.matches("<article class=\"post-card\"").count()
}
