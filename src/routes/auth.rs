use crate::helper::account_helpers;
use crate::helper::{public_helpers, ActionError, FormErrors};
use crate::middleware::AuthenticatedUser;
use crate::routes::{action_error_response, base_context, redirect, render, TokenForm};
use crate::DbPool;
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use serde::Deserialize;
use tera::Tera;

#[derive(Deserialize)]
struct NextQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    username: String,
    password: String,
    next: Option<String>,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Deserialize)]
struct SignupForm {
    csrf_token: CsrfToken,
    username: String,
    password: String,
    password_confirm: String,
}

impl CsrfGuarded for SignupForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

pub fn config_auth(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login/", web::get().to(show_login_form))
            .route("/login/", web::post().to(handle_login))
            .route("/logout/", web::get().to(show_logout_form))
            .route("/logout/", web::post().to(handle_logout))
            .route("/signup/", web::get().to(show_signup_form))
            .route("/signup/", web::post().to(handle_signup)),
    );
}

fn render_login(
    tera: &Tera,
    session: &Session,
    csrf_token: &str,
    username: &str,
    next: &str,
    error: Option<&str>,
) -> HttpResponse {
    let (mut ctx, _) = base_context(None, session);
    ctx.insert("csrf_token", csrf_token);
    ctx.insert("username", username);
    ctx.insert("next", next);
    ctx.insert("error", &error);
    render(tera, "users/login.html", &ctx, StatusCode::OK)
}

async fn show_login_form(
    viewer: Option<AuthenticatedUser>,
    session: Session,
    tera: web::Data<Tera>,
    query: web::Query<NextQuery>,
    token: CsrfToken,
) -> impl Responder {
    let next = account_helpers::safe_redirect_target(query.next.as_deref());
    if viewer.is_some() {
        return redirect(&next);
    }
    render_login(&tera, &session, token.get(), "", &next, None)
}

async fn handle_login(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<LoginForm>>,
) -> impl Responder {
    let login = form.into_inner().into_inner();
    let next = account_helpers::safe_redirect_target(login.next.as_deref());

    match public_helpers::verify_user_credentials(&pool, login.username.trim(), &login.password) {
        Some(user) => {
            if let Err(e) = account_helpers::log_in(&session, &user) {
                log::error!("Could not start a session for '{}': {}", user.username, e);
                return HttpResponse::InternalServerError().body("Could not start session.");
            }
            log::info!("User '{}' logged in", user.username);
            redirect(&next)
        }
        None => {
            log::warn!("Failed login attempt for '{}'", login.username);
            render_login(
                &tera,
                &session,
                login.csrf_token.get(),
                &login.username,
                &next,
                Some("Invalid username or password."),
            )
        }
    }
}

async fn show_logout_form(
    viewer: Option<AuthenticatedUser>,
    session: Session,
    tera: web::Data<Tera>,
    token: CsrfToken,
) -> impl Responder {
    let Some(user) = viewer else {
        return redirect("/");
    };
    let (mut ctx, _) = base_context(Some(&user), &session);
    ctx.insert("csrf_token", token.get());
    render(&tera, "users/logout.html", &ctx, StatusCode::OK)
}

async fn handle_logout(session: Session, _form: Csrf<web::Form<TokenForm>>) -> impl Responder {
    account_helpers::log_out(&session);
    redirect("/")
}

fn render_signup(tera: &Tera, session: &Session, csrf_token: &str, username: &str, errors: &FormErrors) -> HttpResponse {
    let (mut ctx, _) = base_context(None, session);
    ctx.insert("csrf_token", csrf_token);
    ctx.insert("username", username);
    ctx.insert("errors", errors);
    render(tera, "users/signup.html", &ctx, StatusCode::OK)
}

async fn show_signup_form(
    viewer: Option<AuthenticatedUser>,
    session: Session,
    tera: web::Data<Tera>,
    token: CsrfToken,
) -> impl Responder {
    if viewer.is_some() {
        return redirect("/");
    }
    render_signup(&tera, &session, token.get(), "", &FormErrors::new())
}

async fn handle_signup(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<SignupForm>>,
) -> impl Responder {
    let signup = form.into_inner().into_inner();
    match account_helpers::sign_up(&pool, &signup.username, &signup.password, &signup.password_confirm) {
        Ok(user) => {
            if let Err(e) = account_helpers::log_in(&session, &user) {
                log::error!("Could not start a session for '{}': {}", user.username, e);
                return HttpResponse::InternalServerError().body("Could not start session.");
            }
            redirect("/")
        }
        Err(ActionError::Invalid(errors)) => {
            render_signup(&tera, &session, signup.csrf_token.get(), &signup.username, &errors)
        }
        Err(e) => action_error_response(&tera, e),
    }
}
