use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::site_db_operations;
use crate::models::{AboutMessage, AboutMessageBody, IntroBody};
use crate::DbPool;

const KEY_PROJECTS_CAREERS_INTRO: &str = "projects_careers_intro";
const INTRO_MAX_LEN: usize = 20;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/about")
            .route("/messages", web::get().to(public_messages))
            .route(
                "/projects-careers-intro",
                web::get().to(get_projects_careers_intro),
            ),
    );
    cfg.service(
        web::scope("/about_messages")
            .route("", web::get().to(admin_messages))
            .route("", web::post().to(create_message))
            .route(
                "/projects-careers-intro",
                web::put().to(update_projects_careers_intro),
            )
            .route("/{id}", web::put().to(update_message))
            .route("/{id}", web::delete().to(delete_message)),
    );
}

/// Public listing without timestamps.
async fn public_messages(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let items: Vec<AboutMessage> = site_db_operations::list_about_messages(&conn)?
        .into_iter()
        .map(|mut m| {
            m.created_at = None;
            m.updated_at = None;
            m
        })
        .collect();
    Ok(HttpResponse::Ok().json(items))
}

async fn get_projects_careers_intro(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let text = site_db_operations::read_setting(&conn, KEY_PROJECTS_CAREERS_INTRO)?
        .map(|v| v.trim().to_string())
        .unwrap_or_default();
    Ok(HttpResponse::Ok().json(json!({ "text": text })))
}

async fn admin_messages(
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let items = site_db_operations::list_about_messages(&conn)?;
    Ok(HttpResponse::Ok().json(items))
}

async fn create_message(
    _user: AuthenticatedUser,
    body: web::Json<AboutMessageBody>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    site_db_operations::insert_about_message(&conn, &body.title, &body.content, body.sort_order)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "created" })))
}

async fn update_message(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<AboutMessageBody>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let conn = pool.get()?;
    if site_db_operations::read_about_message(&conn, id)?.is_none() {
        return Err(ApiError::not_found("Message not found."));
    }
    site_db_operations::update_about_message(&conn, id, &body.title, &body.content, body.sort_order)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "updated" })))
}

async fn delete_message(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    if site_db_operations::delete_about_message(&conn, path.into_inner())? == 0 {
        return Err(ApiError::not_found("Message not found."));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "deleted" })))
}

async fn update_projects_careers_intro(
    _user: AuthenticatedUser,
    body: web::Json<IntroBody>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let value: String = body.text.trim().chars().take(INTRO_MAX_LEN).collect();
    let conn = pool.get()?;
    site_db_operations::upsert_setting(&conn, KEY_PROJECTS_CAREERS_INTRO, &value)?;
    Ok(HttpResponse::Ok().json(json!({ "text": value })))
}
