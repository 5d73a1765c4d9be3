use std::fs;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

use crate::config::Config;
use crate::error::ApiError;
use crate::helper::asset_helpers;
use crate::models::db_operations::assets_db_operations;
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/assets")
            .route("/upload", web::post().to(upload))
            .route("/{id}/download", web::get().to(download)),
    );
}

#[derive(Deserialize)]
struct UploadQuery {
    /// Owning post id; uploads without one land in a temp folder.
    post_id: Option<String>,
    folder: Option<String>,
}

async fn upload(
    query: web::Query<UploadQuery>,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let owner = query
        .post_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("temp");
    let conn = pool.get()?;
    let response = asset_helpers::save_upload(
        &conn,
        &config.upload_root(),
        payload,
        owner,
        query.folder.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn download(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let asset = assets_db_operations::read_asset(&conn, path.into_inner())?
        .ok_or_else(|| ApiError::not_found("File not found."))?;
    if asset.file_path.trim().is_empty() {
        return Err(ApiError::not_found("File has no stored path."));
    }

    let full_path = config
        .upload_root()
        .join(asset.file_path.replace('\\', "/"));
    if !full_path.is_file() {
        return Err(ApiError::not_found("File does not exist."));
    }
    let bytes = web::block(move || fs::read(full_path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Failed to read file: {e}")))?;

    // Dual-form Content-Disposition: ASCII fallback plus RFC 5987 UTF-8 name.
    let safe_ascii: String = asset
        .original_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '?'
            }
        })
        .collect();
    let safe_ascii = if safe_ascii.trim().is_empty() {
        "download".to_string()
    } else {
        safe_ascii
    };
    let encoded = utf8_percent_encode(&asset.original_name, NON_ALPHANUMERIC).to_string();
    let disposition =
        format!("attachment; filename=\"{safe_ascii}\"; filename*=UTF-8''{encoded}");

    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header(("Content-Disposition", disposition))
        .body(bytes))
}
