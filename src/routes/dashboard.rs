use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::helper::time_helpers;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{posts_db_operations, site_db_operations};
use crate::models::DashboardStats;
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .route("/stats", web::get().to(stats))
            .route("/recent-activity", web::get().to(recent_activity)),
    );
}

async fn stats(
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let today = time_helpers::today_for_offset(config.timezone_offset_hours);
    Ok(HttpResponse::Ok().json(DashboardStats {
        today_visits: site_db_operations::today_visits(&conn, &today)?,
        total_views: site_db_operations::total_views_through(&conn, &today)?,
        published_posts: posts_db_operations::count_published(&conn)?,
    }))
}

async fn recent_activity(
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let recent = posts_db_operations::recent_posts(&conn, 5)?;
    Ok(HttpResponse::Ok().json(json!({ "recent_posts": recent })))
}
