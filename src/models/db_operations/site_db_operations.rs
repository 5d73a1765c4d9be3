use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

use crate::helper::time_helpers;
use crate::models::AboutMessage;

// --- About messages ---

pub fn list_about_messages(conn: &Connection) -> Result<Vec<AboutMessage>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, sort_order, created_at, updated_at
         FROM about_messages ORDER BY sort_order, id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(AboutMessage {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            sort_order: row.get(3)?,
            created_at: time_helpers::opt_iso_z(row.get(4)?),
            updated_at: time_helpers::opt_iso_z(row.get(5)?),
        })
    })?;
    rows.collect()
}

pub fn read_about_message(
    conn: &Connection,
    id: i64,
) -> Result<Option<AboutMessage>, RusqliteError> {
    conn.query_row(
        "SELECT id, title, content, sort_order, created_at, updated_at
         FROM about_messages WHERE id = ?1",
        [id],
        |row| {
            Ok(AboutMessage {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                sort_order: row.get(3)?,
                created_at: time_helpers::opt_iso_z(row.get(4)?),
                updated_at: time_helpers::opt_iso_z(row.get(5)?),
            })
        },
    )
    .optional()
}

pub fn insert_about_message(
    conn: &Connection,
    title: &str,
    content: &str,
    sort_order: i64,
) -> Result<i64, RusqliteError> {
    let now = time_helpers::now_utc_text();
    conn.execute(
        "INSERT INTO about_messages (title, content, sort_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![title, content, sort_order, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_about_message(
    conn: &Connection,
    id: i64,
    title: &str,
    content: &str,
    sort_order: i64,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE about_messages SET title = ?1, content = ?2, sort_order = ?3, updated_at = ?4
         WHERE id = ?5",
        params![title, content, sort_order, time_helpers::now_utc_text(), id],
    )
}

pub fn delete_about_message(conn: &Connection, id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM about_messages WHERE id = ?1", [id])
}

// --- Site settings ---

pub fn read_setting(conn: &Connection, key: &str) -> Result<Option<String>, RusqliteError> {
    conn.query_row(
        "SELECT value FROM site_settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

pub fn upsert_setting(conn: &Connection, key: &str, value: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO site_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, time_helpers::now_utc_text()],
    )?;
    Ok(())
}

// --- Daily visit stats ---

/// One row per site-local calendar day. Visits and views both bump on every
/// counted public read.
pub fn upsert_daily_stat(conn: &Connection, date: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO daily_stats (date, visits, views) VALUES (?1, 1, 1)
         ON CONFLICT(date) DO UPDATE SET visits = visits + 1, views = views + 1",
        [date],
    )?;
    Ok(())
}

/// Cumulative view total up to and including the given day.
pub fn total_views_through(conn: &Connection, date: &str) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COALESCE(SUM(views), 0) FROM daily_stats WHERE date <= ?1",
        [date],
        |row| row.get(0),
    )
}

pub fn today_visits(conn: &Connection, date: &str) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COALESCE(visits, 0) FROM daily_stats WHERE date = ?1",
        [date],
        |row| row.get(0),
    )
    .optional()
    .map(|v| v.unwrap_or(0))
}
