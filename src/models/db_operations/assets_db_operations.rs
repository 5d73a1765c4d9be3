use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

/// Metadata row for an uploaded file. The binary lives on disk under the
/// upload root at `file_path`.
#[derive(Debug, Clone)]
pub struct AssetRow {
    pub id: i64,
    pub uuid_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_path: String,
    pub size_bytes: i64,
}

pub fn insert_asset(
    conn: &Connection,
    uuid_name: &str,
    original_name: &str,
    mime_type: &str,
    file_path: &str,
    size_bytes: i64,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO assets (uuid_name, original_name, mime_type, file_path, size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![uuid_name, original_name, mime_type, file_path, size_bytes],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_asset(conn: &Connection, asset_id: i64) -> Result<Option<AssetRow>, RusqliteError> {
    conn.query_row(
        "SELECT id, uuid_name, original_name, mime_type, file_path, size_bytes
         FROM assets WHERE id = ?1",
        [asset_id],
        |row| {
            Ok(AssetRow {
                id: row.get(0)?,
                uuid_name: row.get(1)?,
                original_name: row.get(2)?,
                mime_type: row.get(3)?,
                file_path: row.get(4)?,
                size_bytes: row.get(5)?,
            })
        },
    )
    .optional()
}

pub fn update_asset_path(
    conn: &Connection,
    asset_id: i64,
    new_path: &str,
) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE assets SET file_path = ?1 WHERE id = ?2",
        params![new_path, asset_id],
    )?;
    Ok(())
}

/// Post-body assets still parked under a temp owner segment. Scanned when a
/// post is saved so inline images migrate with it.
pub fn list_temp_post_assets(conn: &Connection) -> Result<Vec<(i64, String)>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, file_path FROM assets
         WHERE file_path LIKE 'images/posts/%' AND file_path LIKE '%/temp/%'",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}
