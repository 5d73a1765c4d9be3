use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::taxonomy_db_operations;
use crate::models::{CreateTagRequest, Tag};
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tags")
            .route("", web::get().to(list_tags))
            .route("", web::post().to(create_tag)),
    );
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    used_in_posts: bool,
}

async fn list_tags(
    query: web::Query<ListQuery>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    if query.used_in_posts {
        let tags = taxonomy_db_operations::list_tags_used_in_posts(&conn)?;
        return Ok(HttpResponse::Ok().json(tags));
    }
    let tags = taxonomy_db_operations::list_tags(&conn)?;
    Ok(HttpResponse::Ok().json(tags))
}

/// Find-or-create: posting an existing name returns the existing tag.
async fn create_tag(
    _user: AuthenticatedUser,
    body: web::Json<CreateTagRequest>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("Tag name is required."));
    }
    let conn = pool.get()?;
    if let Some(tag) = taxonomy_db_operations::find_tag_by_name(&conn, name)? {
        return Ok(HttpResponse::Ok().json(tag));
    }
    let id = taxonomy_db_operations::insert_tag(&conn, name)?;
    Ok(HttpResponse::Ok().json(Tag {
        id,
        name: name.to_string(),
    }))
}
