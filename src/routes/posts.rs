use crate::helper::author_helpers::{self, PostForm};
use crate::helper::{public_helpers, ActionError, FormErrors};
use crate::middleware::AuthenticatedUser;
use crate::routes::{
    action_error_response, base_context, db_error_response, html, page_param, redirect, render, set_notification,
    TokenForm,
};
use crate::{AppState, DbPool};
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use tera::Tera;
use url::form_urlencoded;

/// The create/edit form as posted. Missing fields count as empty.
#[derive(Deserialize)]
struct PostSubmission {
    csrf_token: CsrfToken,
    #[serde(default)]
    text: String,
    #[serde(default)]
    group: String,
    #[serde(default)]
    image: String,
}

impl CsrfGuarded for PostSubmission {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

impl PostSubmission {
    fn post_form(&self) -> PostForm {
        PostForm { text: self.text.clone(), group: self.group.clone(), image: self.image.clone() }
    }
}

#[derive(Deserialize)]
struct CommentSubmission {
    csrf_token: CsrfToken,
    #[serde(default)]
    text: String,
}

impl CsrfGuarded for CommentSubmission {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

pub fn config_posts(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/group/{slug}/", web::get().to(group_posts))
        .route("/profile/{username}/", web::get().to(profile))
        .route("/profile/{username}/follow/", web::post().to(profile_follow))
        .route("/profile/{username}/unfollow/", web::post().to(profile_unfollow))
        .route("/posts/{post_id}/", web::get().to(post_detail))
        .route("/posts/{post_id}/edit/", web::get().to(show_edit_form))
        .route("/posts/{post_id}/edit/", web::post().to(handle_edit))
        .route("/posts/{post_id}/delete/", web::post().to(delete_post_action))
        .route("/posts/{post_id}/comment/", web::post().to(add_comment_action))
        .route("/create/", web::get().to(show_create_form))
        .route("/create/", web::post().to(handle_create))
        .route("/follow/", web::get().to(follow_index));
}

fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

fn profile_url(username: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}/", encoded)
}

/// Cache entries are per viewer, since the page header shows who is logged in.
fn home_cache_key(req: &HttpRequest, viewer: Option<&AuthenticatedUser>) -> String {
    let path = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match viewer {
        Some(user) => format!("user:{}|{}", user.id, path),
        None => format!("anonymous|{}", path),
    }
}

// --- Feed pages ---

async fn index(
    req: HttpRequest,
    viewer: Option<AuthenticatedUser>,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
) -> impl Responder {
    let cache_key = home_cache_key(&req, viewer.as_ref());
    if let Some(cached) = state.home_cache.get(&cache_key) {
        log::debug!("Serving home feed from cache ({})", cache_key);
        return html(StatusCode::OK, cached);
    }

    let page = match public_helpers::fetch_index_feed(&pool, page_param(&req).as_deref(), state.posts_per_page) {
        Ok(page) => page,
        Err(e) => return db_error_response(&tera, e),
    };

    let (mut ctx, flashed) = base_context(viewer.as_ref(), &session);
    ctx.insert("page_obj", &page);
    match tera.render("posts/index.html", &ctx) {
        Ok(rendered) => {
            // A one-off notification must not be replayed from the cache.
            if !flashed {
                state.home_cache.put(cache_key, rendered.clone());
            }
            html(StatusCode::OK, rendered)
        }
        Err(err) => {
            log::error!("Template rendering error for home feed: {}", err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

async fn group_posts(
    req: HttpRequest,
    slug: web::Path<String>,
    viewer: Option<AuthenticatedUser>,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
) -> impl Responder {
    let feed = match public_helpers::fetch_group_feed(&pool, &slug, page_param(&req).as_deref(), state.posts_per_page) {
        Ok(feed) => feed,
        Err(e) => return db_error_response(&tera, e),
    };

    let (mut ctx, _) = base_context(viewer.as_ref(), &session);
    ctx.insert("group", &feed.group);
    ctx.insert("page_obj", &feed.page);
    render(&tera, "posts/group_list.html", &ctx, StatusCode::OK)
}

async fn profile(
    req: HttpRequest,
    username: web::Path<String>,
    viewer: Option<AuthenticatedUser>,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    token: CsrfToken,
) -> impl Responder {
    let viewer_id = viewer.as_ref().map(|user| user.id);
    let feed = match public_helpers::fetch_profile_feed(
        &pool,
        &username,
        viewer_id,
        page_param(&req).as_deref(),
        state.posts_per_page,
    ) {
        Ok(feed) => feed,
        Err(e) => return db_error_response(&tera, e),
    };

    let (mut ctx, _) = base_context(viewer.as_ref(), &session);
    ctx.insert("csrf_token", token.get());
    ctx.insert("is_own_profile", &(viewer_id == Some(feed.author.id)));
    ctx.insert("author", &feed.author);
    ctx.insert("posts_count", &feed.posts_count);
    ctx.insert("followers_count", &feed.followers_count);
    ctx.insert("following_count", &feed.following_count);
    ctx.insert("following", &feed.following);
    ctx.insert("page_obj", &feed.page);
    render(&tera, "posts/profile.html", &ctx, StatusCode::OK)
}

async fn follow_index(
    req: HttpRequest,
    user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
) -> impl Responder {
    let page = match public_helpers::fetch_follow_feed(&pool, user.id, page_param(&req).as_deref(), state.posts_per_page) {
        Ok(page) => page,
        Err(e) => return db_error_response(&tera, e),
    };

    let (mut ctx, _) = base_context(Some(&user), &session);
    ctx.insert("page_obj", &page);
    render(&tera, "posts/follow.html", &ctx, StatusCode::OK)
}

async fn post_detail(
    post_id: web::Path<i64>,
    viewer: Option<AuthenticatedUser>,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    token: CsrfToken,
) -> impl Responder {
    let detail = match public_helpers::fetch_post_detail(&pool, *post_id) {
        Ok(detail) => detail,
        Err(e) => return db_error_response(&tera, e),
    };

    let (mut ctx, _) = base_context(viewer.as_ref(), &session);
    let is_author = viewer.as_ref().map_or(false, |user| user.id == detail.post.author_id);
    ctx.insert("csrf_token", token.get());
    ctx.insert("is_author", &is_author);
    ctx.insert("post", &detail.post);
    ctx.insert("author_posts", &detail.author_posts);
    ctx.insert("comments", &detail.comments);
    render(&tera, "posts/post_detail.html", &ctx, StatusCode::OK)
}

// --- Authoring ---

fn render_post_form(
    tera: &Tera,
    pool: &DbPool,
    user: &AuthenticatedUser,
    session: &Session,
    csrf_token: &str,
    form: &PostForm,
    errors: &FormErrors,
    edited_post: Option<i64>,
) -> HttpResponse {
    let groups = match public_helpers::fetch_all_groups(pool) {
        Ok(groups) => groups,
        Err(e) => return db_error_response(tera, e),
    };

    let (mut ctx, _) = base_context(Some(user), session);
    ctx.insert("csrf_token", csrf_token);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("groups", &groups);
    ctx.insert("is_edit", &edited_post.is_some());
    ctx.insert("post_id", &edited_post);
    render(tera, "posts/create_post.html", &ctx, StatusCode::OK)
}

async fn show_create_form(
    user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    token: CsrfToken,
) -> impl Responder {
    render_post_form(&tera, &pool, &user, &session, token.get(), &PostForm::default(), &FormErrors::new(), None)
}

async fn handle_create(
    user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<PostSubmission>>,
) -> impl Responder {
    let submission = form.into_inner().into_inner();
    let post_form = submission.post_form();

    match author_helpers::create_post(&pool, user.id, &post_form) {
        Ok(_) => {
            set_notification(&session, "Your post has been published.", "success");
            redirect(&profile_url(&user.username))
        }
        Err(ActionError::Invalid(errors)) => {
            render_post_form(&tera, &pool, &user, &session, submission.csrf_token.get(), &post_form, &errors, None)
        }
        Err(e) => action_error_response(&tera, e),
    }
}

async fn show_edit_form(
    post_id: web::Path<i64>,
    user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    token: CsrfToken,
) -> impl Responder {
    let post_id = post_id.into_inner();
    match author_helpers::load_post_for_edit(&pool, user.id, post_id) {
        Ok(post) => render_post_form(
            &tera,
            &pool,
            &user,
            &session,
            token.get(),
            &PostForm::from_post(&post),
            &FormErrors::new(),
            Some(post_id),
        ),
        Err(ActionError::NotAuthor) => redirect(&post_url(post_id)),
        Err(e) => action_error_response(&tera, e),
    }
}

async fn handle_edit(
    post_id: web::Path<i64>,
    user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<PostSubmission>>,
) -> impl Responder {
    let post_id = post_id.into_inner();
    let submission = form.into_inner().into_inner();
    let post_form = submission.post_form();

    match author_helpers::edit_post(&pool, user.id, post_id, &post_form) {
        Ok(()) => redirect(&post_url(post_id)),
        Err(ActionError::NotAuthor) => {
            log::warn!("User {} tried to edit post {} they did not write", user.id, post_id);
            redirect(&post_url(post_id))
        }
        Err(ActionError::Invalid(errors)) => {
            render_post_form(
                &tera,
                &pool,
                &user,
                &session,
                submission.csrf_token.get(),
                &post_form,
                &errors,
                Some(post_id),
            )
        }
        Err(e) => action_error_response(&tera, e),
    }
}

async fn delete_post_action(
    post_id: web::Path<i64>,
    user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    _form: Csrf<web::Form<TokenForm>>,
) -> impl Responder {
    let post_id = post_id.into_inner();
    match author_helpers::delete_post(&pool, user.id, post_id) {
        Ok(()) => {
            set_notification(&session, "Post deleted.", "success");
            redirect(&profile_url(&user.username))
        }
        Err(ActionError::NotAuthor) => {
            log::warn!("User {} tried to delete post {} they did not write", user.id, post_id);
            redirect(&post_url(post_id))
        }
        Err(e) => action_error_response(&tera, e),
    }
}

async fn add_comment_action(
    post_id: web::Path<i64>,
    user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<CommentSubmission>>,
) -> impl Responder {
    let post_id = post_id.into_inner();
    let comment = form.into_inner().into_inner();

    match author_helpers::add_comment(&pool, user.id, post_id, &comment.text) {
        Ok(_) => redirect(&post_url(post_id)),
        Err(ActionError::Invalid(_)) => {
            set_notification(&session, "Comment text is required.", "error");
            redirect(&post_url(post_id))
        }
        Err(e) => action_error_response(&tera, e),
    }
}

async fn profile_follow(
    username: web::Path<String>,
    user: AuthenticatedUser,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    _form: Csrf<web::Form<TokenForm>>,
) -> impl Responder {
    match author_helpers::follow_author(&pool, user.id, &username) {
        Ok(_) => redirect(&profile_url(&username)),
        Err(e) => action_error_response(&tera, e),
    }
}

async fn profile_unfollow(
    username: web::Path<String>,
    user: AuthenticatedUser,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    _form: Csrf<web::Form<TokenForm>>,
) -> impl Responder {
    match author_helpers::unfollow_author(&pool, user.id, &username) {
        Ok(_) => redirect(&profile_url(&username)),
        Err(e) => action_error_response(&tera, e),
    }
}
