use crate::middleware::AuthenticatedUser;
use crate::routes::{base_context, render};
use actix_session::Session;
use actix_web::{http::StatusCode, web, Responder};
use tera::Tera;

pub fn config_about(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/about")
            .route("/author/", web::get().to(author_page))
            .route("/tech/", web::get().to(tech_page)),
    );
}

async fn author_page(viewer: Option<AuthenticatedUser>, session: Session, tera: web::Data<Tera>) -> impl Responder {
    let (ctx, _) = base_context(viewer.as_ref(), &session);
    render(&tera, "about/author.html", &ctx, StatusCode::OK)
}

async fn tech_page(viewer: Option<AuthenticatedUser>, session: Session, tera: web::Data<Tera>) -> impl Responder {
    let (ctx, _) = base_context(viewer.as_ref(), &session);
    render(&tera, "about/tech.html", &ctx, StatusCode::OK)
}
