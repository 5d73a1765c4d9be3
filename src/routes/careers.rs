use actix_web::{web, HttpResponse};
use rusqlite::Connection;
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::helper::{asset_helpers, time_helpers};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{assets_db_operations, portfolio_db_operations};
use crate::models::{CareerBody, CareerOut, IdOrderBody};
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/careers")
            .route("", web::get().to(list_careers))
            .route("", web::post().to(create_career))
            .route("/reorder", web::patch().to(reorder_careers))
            .route("/{id}", web::put().to(update_career))
            .route("/{id}", web::delete().to(delete_career)),
    );
}

fn asset_url(conn: &Connection, asset_id: Option<i64>) -> Option<String> {
    let id = asset_id?;
    match assets_db_operations::read_asset(conn, id) {
        Ok(Some(asset)) => asset_helpers::opt_file_path_to_url(Some(&asset.file_path)),
        _ => None,
    }
}

fn career_out(conn: &Connection, row: portfolio_db_operations::CareerRow) -> CareerOut {
    CareerOut {
        logo: asset_url(conn, row.logo_asset_id),
        links: portfolio_db_operations::career_links_or_empty(conn, row.id),
        highlights: portfolio_db_operations::career_highlights_or_empty(conn, row.id),
        tags: portfolio_db_operations::career_tags_or_empty(conn, row.id),
        id: row.id,
        logo_asset_id: row.logo_asset_id,
        company_name: row.company_name,
        role: row.role,
        start_date: row.start_date,
        end_date: row.end_date,
        description: row.description,
        sort_order: row.sort_order,
    }
}

async fn list_careers(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let items: Vec<CareerOut> = portfolio_db_operations::list_careers(&conn)?
        .into_iter()
        .map(|row| career_out(&conn, row))
        .collect();
    Ok(HttpResponse::Ok().json(items))
}

struct ValidatedCareer {
    company_name: String,
    role: String,
    start_date: String,
    end_date: Option<String>,
    description: Option<String>,
}

fn validate_career(body: &CareerBody) -> Result<ValidatedCareer, ApiError> {
    let company_name = body.company_name.trim();
    if company_name.is_empty() {
        return Err(ApiError::invalid("Company name is required."));
    }
    let role = body.role.trim();
    if role.is_empty() {
        return Err(ApiError::invalid("Role is required."));
    }
    let start_date = time_helpers::normalize_date(body.start_date.as_deref())
        .ok_or_else(|| ApiError::invalid("Start date is required."))?;
    Ok(ValidatedCareer {
        company_name: company_name.to_string(),
        role: role.to_string(),
        start_date,
        end_date: time_helpers::normalize_date(body.end_date.as_deref()),
        description: body
            .description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

async fn create_career(
    _user: AuthenticatedUser,
    body: web::Json<CareerBody>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let fields = validate_career(&body)?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let id = portfolio_db_operations::insert_career(
        &tx,
        body.logo_asset_id,
        &fields.company_name,
        &fields.role,
        Some(&fields.start_date),
        fields.end_date.as_deref(),
        fields.description.as_deref(),
        body.sort_order,
    )?;
    asset_helpers::relocate_portfolio_temp_asset(
        &tx,
        &config.upload_root(),
        body.logo_asset_id,
        "careers",
        id,
    );
    portfolio_db_operations::replace_career_links(&tx, id, &body.career_links)?;
    portfolio_db_operations::replace_career_highlights(&tx, id, &body.career_highlights)?;
    portfolio_db_operations::replace_career_tags(&tx, id, &body.career_tags)?;
    tx.commit()?;
    Ok(HttpResponse::Ok().json(json!({ "id": id })))
}

async fn update_career(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<CareerBody>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut conn = pool.get()?;
    if portfolio_db_operations::read_career(&conn, id)?.is_none() {
        return Err(ApiError::not_found("Career not found."));
    }
    let fields = validate_career(&body)?;

    let tx = conn.transaction()?;
    portfolio_db_operations::update_career(
        &tx,
        id,
        body.logo_asset_id,
        &fields.company_name,
        &fields.role,
        Some(&fields.start_date),
        fields.end_date.as_deref(),
        fields.description.as_deref(),
        body.sort_order,
    )?;
    asset_helpers::relocate_portfolio_temp_asset(
        &tx,
        &config.upload_root(),
        body.logo_asset_id,
        "careers",
        id,
    );
    portfolio_db_operations::replace_career_links(&tx, id, &body.career_links)?;
    portfolio_db_operations::replace_career_highlights(&tx, id, &body.career_highlights)?;
    portfolio_db_operations::replace_career_tags(&tx, id, &body.career_tags)?;
    tx.commit()?;
    Ok(HttpResponse::Ok().json(json!({ "id": id })))
}

async fn delete_career(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    if portfolio_db_operations::delete_career(&conn, path.into_inner())? == 0 {
        return Err(ApiError::not_found("Career not found."));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn reorder_careers(
    _user: AuthenticatedUser,
    body: web::Json<IdOrderBody>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    for (i, id) in body.id_order.iter().enumerate().filter(|(_, &id)| id != 0) {
        portfolio_db_operations::set_career_sort(&conn, *id, i as i64)?;
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
