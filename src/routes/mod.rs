use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub mod about;
pub mod assets;
pub mod auth;
pub mod careers;
pub mod categories;
pub mod dashboard;
pub mod post_prefixes;
pub mod posts;
pub mod projects;
pub mod tags;

/// Registers the whole JSON API under `/api`. Shared by the server binary and
/// the integration tests.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .configure(auth::configure)
            .configure(about::configure)
            .configure(dashboard::configure)
            .configure(assets::configure)
            .configure(categories::configure)
            .configure(post_prefixes::configure)
            .configure(tags::configure)
            .configure(posts::configure)
            .configure(careers::configure)
            .configure(projects::configure),
    );
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
