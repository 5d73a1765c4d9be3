use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::helper::{asset_helpers, post_helpers};
use crate::middleware::{AuthenticatedUser, MaybeUser};
use crate::models::db_operations::posts_db_operations::{self, PostFilters, PostRecord};
use crate::models::{NeighborsResponse, PostBody, PostListResponse};
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .route("", web::get().to(list_posts))
            .route("", web::post().to(create_post))
            .route("/{id}/neighbors", web::get().to(neighbors))
            .route("/{id}", web::get().to(get_post))
            .route("/{id}", web::put().to(update_post))
            .route("/{id}", web::delete().to(delete_post)),
    );
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    category_id: Option<i64>,
    tag_id: Option<i64>,
    prefix_id: Option<i64>,
    status: Option<String>,
    q: Option<String>,
    order_by: Option<String>,
}

async fn list_posts(
    query: web::Query<ListQuery>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).max(1);
    let filters = PostFilters {
        category_id: query.category_id,
        tag_id: query.tag_id,
        prefix_id: query.prefix_id,
        status: query.status.clone().filter(|s| !s.is_empty()),
        q: query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        order_by: query.order_by.clone(),
    };

    let conn = pool.get()?;
    let total = posts_db_operations::count_posts(&conn, &filters)?;
    let items = posts_db_operations::list_posts(&conn, &filters, per_page, (page - 1) * per_page)?;
    Ok(HttpResponse::Ok().json(PostListResponse { items, total }))
}

async fn neighbors(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let conn = pool.get()?;
    if !posts_db_operations::is_publicly_visible(&conn, id)? {
        return Err(ApiError::not_found("Post not found."));
    }
    let (prev, next) = posts_db_operations::neighbor_posts(&conn, id)?;
    Ok(HttpResponse::Ok().json(NeighborsResponse { prev, next }))
}

async fn get_post(
    path: web::Path<i64>,
    user: MaybeUser,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut conn = pool.get()?;
    let mut post = posts_db_operations::read_post_detail(&conn, id)?
        .ok_or_else(|| ApiError::not_found("Post not found."))?;

    if !user.is_authenticated() {
        if post.status != "PUBLISHED" || !posts_db_operations::is_publicly_visible(&conn, id)? {
            return Err(ApiError::not_found("Post not found."));
        }
        post_helpers::record_public_view(&mut conn, id, config.timezone_offset_hours);
        post.view_count += 1;
    }

    let tags = posts_db_operations::tags_for_post(&conn, id)?;
    post.post_tags = tags.iter().map(|t| t.id).collect();
    post.tags = tags;
    post.attachments = posts_db_operations::attachments_for_post(&conn, id, asset_helpers::URL_PREFIX)
        .unwrap_or_else(|e| {
            log::warn!("post {id}: failed to load attachments: {e}");
            Vec::new()
        });

    Ok(HttpResponse::Ok().json(post))
}

fn clean_ids(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().filter(|&v| v != 0).collect()
}

async fn create_post(
    _user: AuthenticatedUser,
    body: web::Json<PostBody>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = pool.get()?;
    let slug = post_helpers::unique_slug(&conn, &body.slug, None)?;
    let published_at = post_helpers::resolve_published_at(body.published_at.as_deref(), None)?;

    let title = body.title.trim();
    let record = PostRecord {
        title: if title.is_empty() { "Untitled" } else { title },
        slug: &slug,
        status: if body.status.is_empty() { "DRAFT" } else { &body.status },
        published_at,
        category_id: body.category_id,
        prefix_id: body.prefix_id,
        thumbnail_asset_id: body.thumbnail_asset_id,
        content_html: body.content_html.as_deref(),
        content_json: body.content_json.as_deref(),
    };

    let upload_root = config.upload_root();
    let tx = conn.transaction()?;
    let id = posts_db_operations::insert_post(&tx, &record)?;
    posts_db_operations::replace_post_tags(&tx, id, &clean_ids(&body.post_tags))?;
    let attachment_ids = clean_ids(&body.attachment_asset_ids);
    posts_db_operations::replace_post_attachments(&tx, id, &attachment_ids)?;

    asset_helpers::relocate_post_temp_asset(&tx, &upload_root, body.thumbnail_asset_id, id);
    for aid in &attachment_ids {
        asset_helpers::relocate_post_temp_asset(&tx, &upload_root, Some(*aid), id);
    }
    asset_helpers::relocate_content_temp_assets(&tx, &upload_root, id, body.content_html.as_deref());
    posts_db_operations::rewrite_temp_paths(&tx, id)?;
    tx.commit()?;

    Ok(HttpResponse::Ok().json(json!({ "id": id, "slug": slug })))
}

async fn update_post(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<PostBody>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut conn = pool.get()?;
    if posts_db_operations::read_post_detail(&conn, id)?.is_none() {
        return Err(ApiError::not_found("Post not found."));
    }
    let existing_published_at = posts_db_operations::read_published_at(&conn, id)?;
    let slug = post_helpers::unique_slug(&conn, &body.slug, Some(id))?;
    let published_at = post_helpers::resolve_published_at(
        body.published_at.as_deref(),
        existing_published_at.as_deref(),
    )?;

    let title = body.title.trim();
    let record = PostRecord {
        title: if title.is_empty() { "Untitled" } else { title },
        slug: &slug,
        status: if body.status.is_empty() { "DRAFT" } else { &body.status },
        published_at,
        category_id: body.category_id,
        prefix_id: body.prefix_id,
        thumbnail_asset_id: body.thumbnail_asset_id,
        content_html: body.content_html.as_deref(),
        content_json: body.content_json.as_deref(),
    };

    let upload_root = config.upload_root();
    let tx = conn.transaction()?;
    posts_db_operations::update_post(&tx, id, &record)?;
    posts_db_operations::replace_post_tags(&tx, id, &clean_ids(&body.post_tags))?;
    let attachment_ids = clean_ids(&body.attachment_asset_ids);
    posts_db_operations::replace_post_attachments(&tx, id, &attachment_ids)?;

    asset_helpers::relocate_post_temp_asset(&tx, &upload_root, body.thumbnail_asset_id, id);
    for aid in &attachment_ids {
        asset_helpers::relocate_post_temp_asset(&tx, &upload_root, Some(*aid), id);
    }
    asset_helpers::relocate_content_temp_assets(&tx, &upload_root, id, body.content_html.as_deref());
    posts_db_operations::rewrite_temp_paths(&tx, id)?;
    tx.commit()?;

    Ok(HttpResponse::Ok().json(json!({ "id": id, "slug": slug })))
}

async fn delete_post(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    if posts_db_operations::delete_post(&conn, path.into_inner())? == 0 {
        return Err(ApiError::not_found("Post not found."));
    }
    Ok(HttpResponse::NoContent().finish())
}
