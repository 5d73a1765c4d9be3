use actix_web::{web, HttpResponse};
use rusqlite::Connection;
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::helper::{asset_helpers, time_helpers};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{assets_db_operations, portfolio_db_operations};
use crate::models::{IdOrderBody, ProjectBody, ProjectOut};
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/projects")
            .route("", web::get().to(list_projects))
            .route("", web::post().to(create_project))
            .route("/reorder", web::patch().to(reorder_projects))
            .route("/{id}", web::put().to(update_project))
            .route("/{id}", web::delete().to(delete_project)),
    );
}

fn asset_url(conn: &Connection, asset_id: Option<i64>) -> Option<String> {
    let id = asset_id?;
    match assets_db_operations::read_asset(conn, id) {
        Ok(Some(asset)) => asset_helpers::opt_file_path_to_url(Some(&asset.file_path)),
        _ => None,
    }
}

fn project_out(conn: &Connection, row: portfolio_db_operations::ProjectRow) -> ProjectOut {
    ProjectOut {
        thumbnail: asset_url(conn, row.thumbnail_asset_id),
        intro_image: asset_url(conn, row.intro_image_asset_id),
        links: portfolio_db_operations::project_links_or_empty(conn, row.id),
        tags: portfolio_db_operations::project_tags_or_empty(conn, row.id),
        id: row.id,
        thumbnail_asset_id: row.thumbnail_asset_id,
        intro_image_asset_id: row.intro_image_asset_id,
        title: row.title,
        description: row.description,
        start_date: row.start_date,
        end_date: row.end_date,
        sort_order: row.sort_order,
    }
}

async fn list_projects(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let items: Vec<ProjectOut> = portfolio_db_operations::list_projects(&conn)?
        .into_iter()
        .map(|row| project_out(&conn, row))
        .collect();
    Ok(HttpResponse::Ok().json(items))
}

async fn create_project(
    _user: AuthenticatedUser,
    body: web::Json<ProjectBody>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::invalid("Project title is required."));
    }
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let id = portfolio_db_operations::insert_project(
        &tx,
        body.thumbnail_asset_id,
        body.intro_image_asset_id,
        title,
        body.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
        time_helpers::normalize_date(body.start_date.as_deref()).as_deref(),
        time_helpers::normalize_date(body.end_date.as_deref()).as_deref(),
        body.sort_order,
    )?;
    let upload_root = config.upload_root();
    asset_helpers::relocate_portfolio_temp_asset(
        &tx,
        &upload_root,
        body.thumbnail_asset_id,
        "projects",
        id,
    );
    asset_helpers::relocate_portfolio_temp_asset(
        &tx,
        &upload_root,
        body.intro_image_asset_id,
        "projects",
        id,
    );
    portfolio_db_operations::replace_project_links(&tx, id, &body.project_links)?;
    portfolio_db_operations::replace_project_tags(&tx, id, &body.project_tags)?;
    tx.commit()?;
    Ok(HttpResponse::Ok().json(json!({ "id": id })))
}

async fn update_project(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<ProjectBody>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut conn = pool.get()?;
    if portfolio_db_operations::read_project(&conn, id)?.is_none() {
        return Err(ApiError::not_found("Project not found."));
    }
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::invalid("Project title is required."));
    }

    let tx = conn.transaction()?;
    portfolio_db_operations::update_project(
        &tx,
        id,
        body.thumbnail_asset_id,
        body.intro_image_asset_id,
        title,
        body.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
        time_helpers::normalize_date(body.start_date.as_deref()).as_deref(),
        time_helpers::normalize_date(body.end_date.as_deref()).as_deref(),
        body.sort_order,
    )?;
    portfolio_db_operations::replace_project_links(&tx, id, &body.project_links)?;
    portfolio_db_operations::replace_project_tags(&tx, id, &body.project_tags)?;
    let upload_root = config.upload_root();
    asset_helpers::relocate_portfolio_temp_asset(
        &tx,
        &upload_root,
        body.thumbnail_asset_id,
        "projects",
        id,
    );
    asset_helpers::relocate_portfolio_temp_asset(
        &tx,
        &upload_root,
        body.intro_image_asset_id,
        "projects",
        id,
    );
    tx.commit()?;
    Ok(HttpResponse::Ok().json(json!({ "id": id })))
}

async fn delete_project(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    if portfolio_db_operations::delete_project(&conn, path.into_inner())? == 0 {
        return Err(ApiError::not_found("Project not found."));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn reorder_projects(
    _user: AuthenticatedUser,
    body: web::Json<IdOrderBody>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    for (i, id) in body.id_order.iter().enumerate().filter(|(_, &id)| id != 0) {
        portfolio_db_operations::set_project_sort(&conn, *id, i as i64)?;
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
