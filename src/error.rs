use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Crate-wide request error. Every handler returns `Result<_, ApiError>` and
/// the ResponseError impl renders a `{"detail": ...}` JSON body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArgument(msg.into())
    }

    /// Uniform 401. Every authentication failure carries the same message.
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication required.".to_string())
    }

    /// Body text for the response. A missing-column failure means the file
    /// predates the current schema, so the message names the remedy.
    fn detail(&self) -> String {
        if let ApiError::Database(e) = self {
            let msg = e.to_string();
            if msg.contains("no such column") {
                return format!(
                    "Database error: {msg}. The database schema is out of date; \
                     restart the server so the startup migrations can run."
                );
            }
        }
        self.to_string()
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Pool(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = self.detail();
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("request failed: {detail}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "detail": detail }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_errors_name_the_migration_remedy() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE categories (id INTEGER PRIMARY KEY);")
            .unwrap();
        let err = conn
            .query_row("SELECT parent_id FROM categories", [], |r| r.get::<_, i64>(0))
            .unwrap_err();

        let api = ApiError::from(err);
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = api.detail();
        assert!(detail.contains("no such column: parent_id"));
        assert!(detail.contains("startup migrations"));
    }

    #[test]
    fn ordinary_database_errors_are_relayed_unchanged() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT id FROM missing_table", [], |r| r.get::<_, i64>(0))
            .unwrap_err();

        let detail = ApiError::from(err).detail();
        assert!(detail.starts_with("Database error:"));
        assert!(!detail.contains("migrations"));
    }
}
