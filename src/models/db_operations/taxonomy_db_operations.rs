use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

use crate::models::{Category, PostPrefix, Tag, TagWithCount};

// --- Categories ---

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, parent_id, name, sort_order FROM categories ORDER BY sort_order, id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            name: row.get(2)?,
            sort_order: row.get(3)?,
        })
    })?;
    rows.collect()
}

pub fn read_category(conn: &Connection, id: i64) -> Result<Option<Category>, RusqliteError> {
    conn.query_row(
        "SELECT id, parent_id, name, sort_order FROM categories WHERE id = ?1",
        [id],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                name: row.get(2)?,
                sort_order: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn category_exists(conn: &Connection, id: i64) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
}

/// Next sort position among siblings of the given parent.
pub fn next_category_sort(conn: &Connection, parent_id: Option<i64>) -> Result<i64, RusqliteError> {
    match parent_id {
        Some(pid) => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM categories WHERE parent_id = ?1",
            [pid],
            |row| row.get(0),
        ),
        None => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM categories WHERE parent_id IS NULL",
            [],
            |row| row.get(0),
        ),
    }
}

pub fn insert_category(
    conn: &Connection,
    parent_id: Option<i64>,
    name: &str,
    sort_order: i64,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO categories (parent_id, name, sort_order) VALUES (?1, ?2, ?3)",
        params![parent_id, name, sort_order],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_category_name(conn: &Connection, id: i64, name: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;
    Ok(())
}

pub fn update_category_parent(
    conn: &Connection,
    id: i64,
    parent_id: Option<i64>,
) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE categories SET parent_id = ?1 WHERE id = ?2",
        params![parent_id, id],
    )?;
    Ok(())
}

pub fn update_category_sort(conn: &Connection, id: i64, sort_order: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE categories SET sort_order = ?1 WHERE id = ?2",
        params![sort_order, id],
    )?;
    Ok(())
}

/// Children go with the parent via the self-referential FK cascade.
pub fn delete_category(conn: &Connection, id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM categories WHERE id = ?1", [id])
}

// --- Tags ---

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Tags attached to at least one PUBLISHED post, with usage counts.
pub fn list_tags_used_in_posts(conn: &Connection) -> Result<Vec<TagWithCount>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, COUNT(pt.post_id) AS cnt
         FROM tags t
         JOIN post_tags pt ON pt.tag_id = t.id
         JOIN posts p ON p.id = pt.post_id AND p.status = 'PUBLISHED'
         GROUP BY t.id, t.name
         ORDER BY t.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TagWithCount {
            id: row.get(0)?,
            name: row.get(1)?,
            post_count: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn find_tag_by_name(conn: &Connection, name: &str) -> Result<Option<Tag>, RusqliteError> {
    conn.query_row("SELECT id, name FROM tags WHERE name = ?1", [name], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })
    .optional()
}

/// Find-or-create is the callers' job: the read-then-insert pair races with
/// concurrent writers and the UNIQUE constraint is the backstop.
pub fn insert_tag(conn: &Connection, name: &str) -> Result<i64, RusqliteError> {
    conn.execute("INSERT INTO tags (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

// --- Post prefixes ---

pub fn list_prefixes(conn: &Connection) -> Result<Vec<PostPrefix>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT pp.id, pp.name, pp.sort_order, pp.created_at, COUNT(p.id) AS post_count
         FROM post_prefixes pp
         LEFT JOIN posts p ON p.prefix_id = pp.id
         GROUP BY pp.id, pp.name, pp.sort_order, pp.created_at
         ORDER BY pp.sort_order, pp.id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PostPrefix {
            id: row.get(0)?,
            name: row.get(1)?,
            sort_order: row.get(2)?,
            created_at: row.get(3)?,
            post_count: row.get(4)?,
        })
    })?;
    rows.collect()
}

pub fn read_prefix(conn: &Connection, id: i64) -> Result<Option<PostPrefix>, RusqliteError> {
    conn.query_row(
        "SELECT id, name, sort_order, created_at FROM post_prefixes WHERE id = ?1",
        [id],
        |row| {
            Ok(PostPrefix {
                id: row.get(0)?,
                name: row.get(1)?,
                sort_order: row.get(2)?,
                created_at: row.get(3)?,
                post_count: 0,
            })
        },
    )
    .optional()
}

pub fn insert_prefix(conn: &Connection, name: &str) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO post_prefixes (name, sort_order) VALUES (?1, 0)",
        [name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_prefix_name(conn: &Connection, id: i64, name: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE post_prefixes SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;
    Ok(())
}

/// Posts keep living with prefix_id nulled by the FK rule, never cascaded.
pub fn delete_prefix(conn: &Connection, id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM post_prefixes WHERE id = ?1", [id])
}
