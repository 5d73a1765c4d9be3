use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::taxonomy_db_operations;
use crate::models::{PostPrefixCreate, PostPrefixUpdate};
use crate::DbPool;

const PREFIX_NAME_MAX_LEN: usize = 20;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/post_prefixes")
            .route("", web::get().to(list_prefixes))
            .route("", web::post().to(create_prefix))
            .route("/{id}", web::get().to(get_prefix))
            .route("/{id}", web::put().to(update_prefix))
            .route("/{id}", web::delete().to(delete_prefix)),
    );
}

fn validate_name(raw: &str) -> Result<&str, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("Prefix name is required."));
    }
    if name.chars().count() > PREFIX_NAME_MAX_LEN {
        return Err(ApiError::invalid(format!(
            "Prefix name must be at most {PREFIX_NAME_MAX_LEN} characters."
        )));
    }
    Ok(name)
}

async fn list_prefixes(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let prefixes = taxonomy_db_operations::list_prefixes(&conn)?;
    Ok(HttpResponse::Ok().json(prefixes))
}

async fn create_prefix(
    _user: AuthenticatedUser,
    body: web::Json<PostPrefixCreate>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let name = validate_name(&body.name)?;
    let conn = pool.get()?;
    let id = taxonomy_db_operations::insert_prefix(&conn, name)?;
    let created = taxonomy_db_operations::read_prefix(&conn, id)?
        .ok_or_else(|| ApiError::Internal("Prefix vanished after insert".to_string()))?;
    Ok(HttpResponse::Created().json(created))
}

async fn get_prefix(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let prefix = taxonomy_db_operations::read_prefix(&conn, path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Prefix not found."))?;
    Ok(HttpResponse::Ok().json(prefix))
}

async fn update_prefix(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<PostPrefixUpdate>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let conn = pool.get()?;
    let existing = taxonomy_db_operations::read_prefix(&conn, id)?
        .ok_or_else(|| ApiError::not_found("Prefix not found."))?;
    let Some(raw) = body.name.as_deref() else {
        return Ok(HttpResponse::Ok().json(existing));
    };
    let name = validate_name(raw)?;
    taxonomy_db_operations::update_prefix_name(&conn, id, name)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "id": id, "name": name })))
}

async fn delete_prefix(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    if taxonomy_db_operations::delete_prefix(&conn, path.into_inner())? == 0 {
        return Err(ApiError::not_found("Prefix not found."));
    }
    Ok(HttpResponse::NoContent().finish())
}
