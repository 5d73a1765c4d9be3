use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

pub mod config;
pub mod error;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;

/// Builds the SQLite connection pool with foreign keys enabled on every
/// connection. Handlers rely on the cascade/nullify rules declared in the schema.
pub fn build_pool(db_file: &std::path::Path) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(db_file)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().build(manager)
}
