use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use actix_web::web;
use chrono::Datelike;
use futures_util::StreamExt;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::ApiError;
use crate::helper::time_helpers;
use crate::models::db_operations::assets_db_operations;
use crate::models::UploadResponse;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const URL_PREFIX: &str = "/static/uploads/";

const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "pdf", "ppt", "pptx", "hwp", "hwpx", "docx",
];

const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/x-hwp",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

fn unsupported_format() -> ApiError {
    ApiError::invalid(
        "Unsupported file format. Allowed: png, jpg, jpeg, gif, webp, pdf, ppt, pptx, hwp, hwpx, docx",
    )
}

/// Lowercased extension when it sits on the allow-list, otherwise None.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn is_image_ext(ext: &str) -> bool {
    matches!(ext, "png" | "jpg" | "jpeg" | "gif" | "webp")
}

/// Second check after the extension. `application/octet-stream` is accepted
/// for hwp/hwpx only, where browsers have no specific type to declare.
pub fn validate_mime(declared: Option<&str>, ext: &str) -> Result<(), ApiError> {
    let Some(mime) = declared.filter(|m| !m.is_empty()) else {
        return Ok(());
    };
    if ALLOWED_MIME_TYPES.contains(&mime) {
        return Ok(());
    }
    if mime == "application/octet-stream" && matches!(ext, "hwp" | "hwpx") {
        return Ok(());
    }
    Err(unsupported_format())
}

/// Destination relative to the upload root. Careers and projects keep a flat
/// per-owner folder; everything else is filed by upload date, with images and
/// documents on separate branches.
pub fn destination_rel_path(folder: Option<&str>, owner: &str, ext: &str, name: &str) -> String {
    match folder {
        Some("projects") => format!("images/projects/{owner}/{name}"),
        Some("careers") => format!("images/careers/{owner}/{name}"),
        _ => {
            let now = time_helpers::now_utc();
            let (y, m, d) = (now.year(), now.month(), now.day());
            if is_image_ext(ext) {
                format!("images/posts/{y}/{m:02}/{d:02}/{owner}/{name}")
            } else {
                format!("documents/{y}/{m:02}/{d:02}/{owner}/{name}")
            }
        }
    }
}

pub fn file_path_to_url(file_path: &str) -> String {
    format!("{URL_PREFIX}{}", file_path.replace('\\', "/"))
}

pub fn opt_file_path_to_url(file_path: Option<&str>) -> Option<String> {
    file_path.filter(|p| !p.is_empty()).map(file_path_to_url)
}

pub struct SavedUpload {
    pub rel_path: String,
    pub uuid_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Streams the `file` field of a multipart payload to disk under the upload
/// root, enforcing the extension, MIME and size rules. A partial file left by
/// an oversize upload is removed before the error returns.
pub async fn save_upload_file(
    upload_root: &Path,
    mut payload: Multipart,
    owner: &str,
    folder: Option<&str>,
) -> Result<SavedUpload, ApiError> {
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::invalid(format!("Malformed multipart payload: {e}")))?;
        if field.name() != "file" {
            continue;
        }

        let original_name = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .trim()
            .to_string();
        let ext = allowed_extension(&original_name).ok_or_else(unsupported_format)?;
        let declared_mime = field.content_type().map(|m| m.to_string());
        validate_mime(declared_mime.as_deref(), &ext)?;

        let uuid_name = format!("{}.{ext}", &Uuid::new_v4().simple().to_string()[..12]);
        let rel_path = destination_rel_path(folder, owner, &ext, &uuid_name);
        let dest: PathBuf = upload_root.join(&rel_path);

        let parent = dest
            .parent()
            .ok_or_else(|| ApiError::Internal("upload destination has no parent".to_string()))?
            .to_path_buf();
        web::block(move || fs::create_dir_all(&parent))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(|e| ApiError::Internal(format!("Failed to create upload directory: {e}")))?;

        let mut f = web::block({
            let dest = dest.clone();
            move || fs::File::create(dest)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Failed to create upload file: {e}")))?;

        let mut size_bytes: u64 = 0;
        while let Some(chunk) = field.next().await {
            let data =
                chunk.map_err(|e| ApiError::invalid(format!("Broken upload stream: {e}")))?;
            size_bytes += data.len() as u64;
            if size_bytes > MAX_UPLOAD_BYTES {
                drop(f);
                let _ = fs::remove_file(&dest);
                return Err(ApiError::PayloadTooLarge(
                    "File exceeds the 10 MiB upload limit".to_string(),
                ));
            }
            f = web::block(move || f.write_all(&data).map(|_| f))
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?
                .map_err(|e| ApiError::Internal(format!("Failed to write upload: {e}")))?;
        }

        let original_name = if original_name.is_empty() {
            uuid_name.clone()
        } else {
            original_name
        };
        return Ok(SavedUpload {
            rel_path,
            uuid_name,
            original_name,
            mime_type: declared_mime.unwrap_or_else(|| "application/octet-stream".to_string()),
            size_bytes,
        });
    }
    Err(ApiError::invalid("No file field in upload".to_string()))
}

/// Saves the upload and records it in the assets table.
pub async fn save_upload(
    conn: &Connection,
    upload_root: &Path,
    payload: Multipart,
    owner: &str,
    folder: Option<&str>,
) -> Result<UploadResponse, ApiError> {
    let saved = save_upload_file(upload_root, payload, owner, folder).await?;
    let id = assets_db_operations::insert_asset(
        conn,
        &saved.uuid_name,
        &saved.original_name,
        &saved.mime_type,
        &saved.rel_path,
        saved.size_bytes as i64,
    )?;
    Ok(UploadResponse {
        id,
        url: file_path_to_url(&saved.rel_path),
        original_name: saved.original_name,
    })
}

/// Moves a post asset out of its temp folder once the owning post exists.
/// Silently does nothing when the asset, its file, or a temp segment is
/// missing.
pub fn relocate_post_temp_asset(
    conn: &Connection,
    upload_root: &Path,
    asset_id: Option<i64>,
    post_id: i64,
) {
    let Some(asset_id) = asset_id else { return };
    let Ok(Some(asset)) = assets_db_operations::read_asset(conn, asset_id) else {
        return;
    };
    let file_path = asset.file_path.trim().replace('\\', "/");
    if !file_path.contains("/temp/") {
        return;
    }
    let new_rel_path = file_path.replacen("/temp/", &format!("/{post_id}/"), 1);
    move_and_update(conn, upload_root, asset_id, &file_path, &new_rel_path);
}

/// Career and project assets live directly under `images/{kind}/temp/`; only
/// that exact prefix triggers a move.
pub fn relocate_portfolio_temp_asset(
    conn: &Connection,
    upload_root: &Path,
    asset_id: Option<i64>,
    kind: &str,
    owner_id: i64,
) {
    let Some(asset_id) = asset_id else { return };
    let Ok(Some(asset)) = assets_db_operations::read_asset(conn, asset_id) else {
        return;
    };
    let file_path = asset.file_path.trim().replace('\\', "/");
    let temp_prefix = format!("images/{kind}/temp/");
    if !file_path.starts_with(&temp_prefix) {
        return;
    }
    let filename = file_path.rsplit('/').next().unwrap_or_default();
    let new_rel_path = format!("images/{kind}/{owner_id}/{filename}");
    move_and_update(conn, upload_root, asset_id, &file_path, &new_rel_path);
}

fn move_and_update(
    conn: &Connection,
    upload_root: &Path,
    asset_id: i64,
    old_rel: &str,
    new_rel: &str,
) {
    let src = upload_root.join(old_rel);
    if !src.is_file() {
        return;
    }
    let dest = upload_root.join(new_rel);
    if let Some(parent) = dest.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("asset {asset_id}: failed to create {}: {e}", parent.display());
            return;
        }
    }
    if let Err(e) = fs::rename(&src, &dest) {
        log::warn!("asset {asset_id}: failed to move to {}: {e}", dest.display());
        return;
    }
    if let Err(e) = assets_db_operations::update_asset_path(conn, asset_id, new_rel) {
        log::warn!("asset {asset_id}: failed to update path: {e}");
    }
}

/// Relocates every temp post asset whose URL (or bare path) appears in the
/// saved body HTML.
pub fn relocate_content_temp_assets(
    conn: &Connection,
    upload_root: &Path,
    post_id: i64,
    content_html: Option<&str>,
) {
    let Some(content) = content_html.filter(|c| !c.is_empty()) else {
        return;
    };
    let content = content.replace('\\', "/");
    let assets = match assets_db_operations::list_temp_post_assets(conn) {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("post {post_id}: temp asset scan failed: {e}");
            return;
        }
    };
    for (asset_id, file_path) in assets {
        let fp = file_path.trim().replace('\\', "/");
        let url = file_path_to_url(&fp);
        if content.contains(&url) || content.contains(&fp) {
            relocate_post_temp_asset(conn, upload_root, Some(asset_id), post_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        db_setup::create_schema(&conn).expect("schema");
        conn
    }

    fn seed_asset(conn: &Connection, file_path: &str) -> i64 {
        assets_db_operations::insert_asset(conn, "abc123def456.png", "photo.png", "image/png", file_path, 42)
            .unwrap()
    }

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("photo.PNG").as_deref(), Some("png"));
        assert_eq!(allowed_extension("report.hwpx").as_deref(), Some("hwpx"));
        assert_eq!(allowed_extension("malware.exe"), None);
        assert_eq!(allowed_extension("noext"), None);
    }

    #[test]
    fn octet_stream_only_for_hwp() {
        assert!(validate_mime(Some("application/octet-stream"), "hwp").is_ok());
        assert!(validate_mime(Some("application/octet-stream"), "hwpx").is_ok());
        assert!(validate_mime(Some("application/octet-stream"), "png").is_err());
        assert!(validate_mime(Some("image/png"), "png").is_ok());
        assert!(validate_mime(None, "png").is_ok());
        assert!(validate_mime(Some("text/html"), "png").is_err());
    }

    #[test]
    fn destination_paths() {
        assert_eq!(
            destination_rel_path(Some("projects"), "7", "png", "a.png"),
            "images/projects/7/a.png"
        );
        assert_eq!(
            destination_rel_path(Some("careers"), "temp", "png", "a.png"),
            "images/careers/temp/a.png"
        );
        let dated = destination_rel_path(None, "temp", "pdf", "a.pdf");
        assert!(dated.starts_with("documents/"));
        assert!(dated.ends_with("/temp/a.pdf"));
        let image = destination_rel_path(Some("unknown"), "temp", "jpg", "a.jpg");
        assert!(image.starts_with("images/posts/"));
    }

    #[test]
    fn relocation_moves_file_and_row() {
        let conn = test_conn();
        let root = tempfile::tempdir().unwrap();
        let old_rel = "images/posts/2026/08/29/temp/abc123def456.png";
        let id = seed_asset(&conn, old_rel);
        let src = root.path().join(old_rel);
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"img").unwrap();

        relocate_post_temp_asset(&conn, root.path(), Some(id), 55);

        let new_rel = "images/posts/2026/08/29/55/abc123def456.png";
        assert!(!src.exists());
        assert!(root.path().join(new_rel).is_file());
        let stored: String = conn
            .query_row("SELECT file_path FROM assets WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, new_rel);
    }

    #[test]
    fn relocation_noop_without_temp_segment() {
        let conn = test_conn();
        let root = tempfile::tempdir().unwrap();
        let rel = "images/posts/2026/08/29/12/abc123def456.png";
        let id = seed_asset(&conn, rel);
        let src = root.path().join(rel);
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"img").unwrap();

        relocate_post_temp_asset(&conn, root.path(), Some(id), 55);

        assert!(src.is_file());
        let stored: String = conn
            .query_row("SELECT file_path FROM assets WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, rel);
    }

    #[test]
    fn portfolio_relocation_requires_exact_prefix() {
        let conn = test_conn();
        let root = tempfile::tempdir().unwrap();
        let rel = "images/careers/temp/abc123def456.png";
        let id = seed_asset(&conn, rel);
        let src = root.path().join(rel);
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"img").unwrap();

        relocate_portfolio_temp_asset(&conn, root.path(), Some(id), "careers", 3);

        assert!(root.path().join("images/careers/3/abc123def456.png").is_file());

        // A posts-style path never matches the careers prefix.
        let other = seed_asset(&conn, "images/posts/2026/08/29/temp/zzz.png");
        relocate_portfolio_temp_asset(&conn, root.path(), Some(other), "careers", 3);
        let stored: String = conn
            .query_row("SELECT file_path FROM assets WHERE id = ?1", [other], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "images/posts/2026/08/29/temp/zzz.png");
    }

    #[test]
    fn content_scan_relocates_referenced_assets_only() {
        let conn = test_conn();
        let root = tempfile::tempdir().unwrap();
        let referenced = "images/posts/2026/08/29/temp/aaa111bbb222.png";
        let unreferenced = "images/posts/2026/08/29/temp/ccc333ddd444.png";
        let ref_id = seed_asset(&conn, referenced);
        let unref_id = seed_asset(&conn, unreferenced);
        for rel in [referenced, unreferenced] {
            let p = root.path().join(rel);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(&p, b"img").unwrap();
        }
        let html = format!("<img src=\"{}\">", file_path_to_url(referenced));

        relocate_content_temp_assets(&conn, root.path(), 9, Some(&html));

        let moved: String = conn
            .query_row("SELECT file_path FROM assets WHERE id = ?1", [ref_id], |r| r.get(0))
            .unwrap();
        assert_eq!(moved, "images/posts/2026/08/29/9/aaa111bbb222.png");
        let kept: String = conn
            .query_row("SELECT file_path FROM assets WHERE id = ?1", [unref_id], |r| r.get(0))
            .unwrap();
        assert_eq!(kept, unreferenced);
    }
}
