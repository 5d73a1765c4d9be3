use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::taxonomy_db_operations;
use crate::models::{Category, CategoryCreate, CategoryNode, CategoryUpdate, ReorderBody};
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .route("", web::get().to(list_categories))
            .route("", web::post().to(create_category))
            .route("/reorder", web::patch().to(reorder_categories))
            .route("/{id}", web::get().to(get_category))
            .route("/{id}", web::put().to(update_category))
            .route("/{id}", web::delete().to(delete_category)),
    );
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    tree: bool,
}

async fn list_categories(
    query: web::Query<ListQuery>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let items = taxonomy_db_operations::list_categories(&conn)?;
    if !query.tree {
        return Ok(HttpResponse::Ok().json(items));
    }

    // Two-level tree: roots with their direct children.
    let (roots, children): (Vec<Category>, Vec<Category>) =
        items.into_iter().partition(|c| c.parent_id.is_none());
    let nodes: Vec<CategoryNode> = roots
        .into_iter()
        .map(|root| {
            let kids = children
                .iter()
                .filter(|c| c.parent_id == Some(root.id))
                .cloned()
                .collect();
            CategoryNode {
                category: root,
                children: kids,
            }
        })
        .collect();
    Ok(HttpResponse::Ok().json(nodes))
}

async fn create_category(
    _user: AuthenticatedUser,
    body: web::Json<CategoryCreate>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("Category name is required."));
    }
    let conn = pool.get()?;
    if let Some(pid) = body.parent_id {
        if !taxonomy_db_operations::category_exists(&conn, pid)? {
            return Err(ApiError::invalid("Parent category not found."));
        }
    }
    let sort_order = match body.sort_order {
        Some(order) => order,
        None => taxonomy_db_operations::next_category_sort(&conn, body.parent_id)?,
    };
    let id = taxonomy_db_operations::insert_category(&conn, body.parent_id, name, sort_order)?;
    let created = taxonomy_db_operations::read_category(&conn, id)?
        .ok_or_else(|| ApiError::Internal("Category vanished after insert".to_string()))?;
    Ok(HttpResponse::Created().json(created))
}

async fn get_category(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let category = taxonomy_db_operations::read_category(&conn, path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Category not found."))?;
    Ok(HttpResponse::Ok().json(category))
}

async fn update_category(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<CategoryUpdate>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let conn = pool.get()?;
    if taxonomy_db_operations::read_category(&conn, id)?.is_none() {
        return Err(ApiError::not_found("Category not found."));
    }

    if let Some(name) = body.name.as_deref() {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::invalid("Category name is required."));
        }
        taxonomy_db_operations::update_category_name(&conn, id, name)?;
    }
    if let Some(parent_id) = body.parent_id {
        if parent_id == Some(id) {
            return Err(ApiError::invalid(
                "A category cannot be its own parent.",
            ));
        }
        if let Some(pid) = parent_id {
            if !taxonomy_db_operations::category_exists(&conn, pid)? {
                return Err(ApiError::invalid("Parent category not found."));
            }
        }
        taxonomy_db_operations::update_category_parent(&conn, id, parent_id)?;
    }
    if let Some(sort_order) = body.sort_order {
        taxonomy_db_operations::update_category_sort(&conn, id, sort_order)?;
    }

    let updated = taxonomy_db_operations::read_category(&conn, id)?
        .ok_or_else(|| ApiError::not_found("Category not found."))?;
    Ok(HttpResponse::Ok().json(updated))
}

async fn delete_category(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let conn = pool.get()?;
    if taxonomy_db_operations::delete_category(&conn, id)? == 0 {
        return Err(ApiError::not_found("Category not found."));
    }
    Ok(HttpResponse::NoContent().finish())
}

async fn reorder_categories(
    _user: AuthenticatedUser,
    body: web::Json<ReorderBody>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    for item in &body.order {
        taxonomy_db_operations::update_category_sort(&conn, item.id, item.sort_order)?;
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
