use actix_web::{web, HttpResponse};

use crate::config::Config;
use crate::error::ApiError;
use crate::middleware::{self, AuthenticatedUser};
use crate::models::db_operations::users_db_operations;
use crate::models::{LoginRequest, LoginResponse};
use crate::DbPool;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(me)),
    );
}

async fn login(
    body: web::Json<LoginRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let email = body.username.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(ApiError::invalid("Email and password are required."));
    }

    let conn = pool.get()?;
    let user = users_db_operations::verify_credentials(&conn, email, &body.password)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password.".to_string()))?;

    let token =
        middleware::create_access_token(user.id, &user.email, body.remember_me, &config.secret_key)
            .map_err(|e| ApiError::Internal(format!("Failed to issue token: {e}")))?;
    users_db_operations::update_last_login(&conn, user.id)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user,
    }))
}

async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
    }))
}
