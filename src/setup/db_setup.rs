use log::info;
use rusqlite::Connection;
use thiserror::Error;

use crate::config::Config;
use crate::models::db_operations::users_db_operations;
use crate::DbPool;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Creates every table if it does not exist yet. Safe to run on every start.
pub fn create_schema(conn: &Connection) -> Result<(), SetupError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT,
            last_login_at TEXT
        );

        CREATE TABLE IF NOT EXISTS assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid_name TEXT NOT NULL,
            original_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            file_path TEXT NOT NULL,
            size_bytes INTEGER NOT NULL DEFAULT 0,
            created_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER REFERENCES categories(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS post_prefixes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'DRAFT'
                CHECK(status IN ('DRAFT', 'PUBLISHED', 'PRIVATE', 'UNLISTED')),
            published_at TEXT,
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            prefix_id INTEGER REFERENCES post_prefixes(id) ON DELETE SET NULL,
            thumbnail_asset_id INTEGER REFERENCES assets(id) ON DELETE SET NULL,
            content_html TEXT,
            content_json TEXT,
            view_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT
        );

        CREATE TABLE IF NOT EXISTS post_tags (
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (post_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS post_attachments (
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            asset_id INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
            sort_order INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (post_id, asset_id)
        );

        CREATE TABLE IF NOT EXISTS careers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            logo_asset_id INTEGER REFERENCES assets(id) ON DELETE SET NULL,
            company_name TEXT NOT NULL,
            role TEXT NOT NULL,
            start_date TEXT,
            end_date TEXT,
            description TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT
        );

        CREATE TABLE IF NOT EXISTS career_links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            career_id INTEGER NOT NULL REFERENCES careers(id) ON DELETE CASCADE,
            link_name TEXT NOT NULL,
            link_url TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS career_highlights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            career_id INTEGER NOT NULL REFERENCES careers(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS career_tags (
            career_id INTEGER NOT NULL REFERENCES careers(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (career_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            thumbnail_asset_id INTEGER REFERENCES assets(id) ON DELETE SET NULL,
            intro_image_asset_id INTEGER REFERENCES assets(id) ON DELETE SET NULL,
            title TEXT NOT NULL,
            description TEXT,
            start_date TEXT,
            end_date TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT
        );

        CREATE TABLE IF NOT EXISTS project_links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            link_name TEXT NOT NULL,
            link_url TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS project_tags (
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            sort_order INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (project_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
            date TEXT PRIMARY KEY,
            visits INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS about_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT
        );

        CREATE TABLE IF NOT EXISTS site_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        );",
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Additive migrations for databases created before the columns existed.
pub fn run_migrations(conn: &Connection) -> Result<(), SetupError> {
    if table_exists(conn, "posts")? {
        if !column_exists(conn, "posts", "view_count")? {
            info!("migrating: adding posts.view_count");
            conn.execute(
                "ALTER TABLE posts ADD COLUMN view_count INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }
        if !column_exists(conn, "posts", "prefix_id")? {
            info!("migrating: adding posts.prefix_id");
            conn.execute(
                "ALTER TABLE posts ADD COLUMN prefix_id INTEGER
                 REFERENCES post_prefixes(id) ON DELETE SET NULL",
                [],
            )?;
        }
        if !column_exists(conn, "posts", "content_json")? {
            info!("migrating: adding posts.content_json");
            conn.execute("ALTER TABLE posts ADD COLUMN content_json TEXT", [])?;
        }
    }
    Ok(())
}

fn seed_admin(conn: &Connection, config: &Config) -> Result<(), SetupError> {
    let email = config.seed_admin_email.trim();
    let password = config.seed_admin_password.trim();
    if email.is_empty() || password.is_empty() {
        return Ok(());
    }
    if users_db_operations::user_exists_by_email(conn, email)? {
        return Ok(());
    }
    users_db_operations::create_user(conn, email, password, &config.seed_admin_name)?;
    info!("seeded admin account for {email}");
    Ok(())
}

/// Startup initialization: schema, migrations, and the optional seed admin.
pub fn initialize(pool: &DbPool, config: &Config) -> Result<(), SetupError> {
    let conn = pool.get()?;
    create_schema(&conn)?;
    run_migrations(&conn)?;
    seed_admin(&conn, config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creation_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        create_schema(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert!(table_exists(&conn, "posts").unwrap());
        assert!(column_exists(&conn, "posts", "view_count").unwrap());
    }

    #[test]
    fn migrations_add_missing_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL DEFAULT 'DRAFT',
                published_at TEXT,
                category_id INTEGER,
                thumbnail_asset_id INTEGER,
                content_html TEXT,
                created_at TEXT,
                updated_at TEXT
            );",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        assert!(column_exists(&conn, "posts", "view_count").unwrap());
        assert!(column_exists(&conn, "posts", "prefix_id").unwrap());
        assert!(column_exists(&conn, "posts", "content_json").unwrap());
    }
}
