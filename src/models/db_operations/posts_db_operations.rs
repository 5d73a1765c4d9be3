use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, ToSql};

use crate::helper::time_helpers;
use crate::models::{
    AttachmentOut, CategoryRef, NeighborPost, PostDetail, PostListItem, RecentPost, Tag,
};

/// Visibility predicate for readers without a session. Scheduled posts stay
/// hidden until their publish time passes.
const PUBLIC_VISIBLE: &str =
    "p.status = 'PUBLISHED' AND p.published_at IS NOT NULL AND p.published_at <= ?";

pub fn slug_exists(
    conn: &Connection,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool, RusqliteError> {
    match exclude_id {
        Some(id) => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1 AND id != ?2)",
            params![slug, id],
            |row| row.get(0),
        ),
        None => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1)",
            [slug],
            |row| row.get(0),
        ),
    }
}

#[derive(Default)]
pub struct PostFilters {
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub prefix_id: Option<i64>,
    pub status: Option<String>,
    pub q: Option<String>,
    pub order_by: Option<String>,
}

/// Builds the shared WHERE clause for list and count. Category filtering
/// includes one level of child categories.
fn build_filter_sql(filters: &PostFilters, params_out: &mut Vec<Box<dyn ToSql>>) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if let Some(cid) = filters.category_id {
        clauses.push(
            "p.category_id IN (SELECT id FROM categories WHERE id = ? OR parent_id = ?)"
                .to_string(),
        );
        params_out.push(Box::new(cid));
        params_out.push(Box::new(cid));
    }
    if let Some(tid) = filters.tag_id {
        clauses.push(
            "EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ?)"
                .to_string(),
        );
        params_out.push(Box::new(tid));
    }
    if let Some(pid) = filters.prefix_id {
        clauses.push("p.prefix_id = ?".to_string());
        params_out.push(Box::new(pid));
    }
    if let Some(status) = filters.status.as_deref() {
        if status == "PUBLISHED" {
            clauses.push(format!("({PUBLIC_VISIBLE})"));
            params_out.push(Box::new(time_helpers::now_utc_text()));
        } else {
            clauses.push("p.status = ?".to_string());
            params_out.push(Box::new(status.to_string()));
        }
    }
    if let Some(q) = filters.q.as_deref() {
        clauses.push("p.title LIKE ?".to_string());
        params_out.push(Box::new(format!("%{q}%")));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

fn order_clause(order_by: Option<&str>) -> &'static str {
    match order_by {
        Some("oldest") => " ORDER BY p.id ASC",
        Some("views") => " ORDER BY p.view_count DESC, p.id DESC",
        _ => " ORDER BY p.id DESC",
    }
}

pub fn list_posts(
    conn: &Connection,
    filters: &PostFilters,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostListItem>, RusqliteError> {
    let mut bound: Vec<Box<dyn ToSql>> = Vec::new();
    let where_sql = build_filter_sql(filters, &mut bound);
    let sql = format!(
        "SELECT p.id, p.title, p.slug, p.status, p.published_at, p.created_at, p.updated_at,
                p.category_id, c.name, p.view_count
         FROM posts p
         LEFT JOIN categories c ON c.id = p.category_id
         {where_sql}{order} LIMIT ? OFFSET ?",
        order = order_clause(filters.order_by.as_deref()),
    );
    bound.push(Box::new(limit));
    bound.push(Box::new(offset));
    let refs: Vec<&dyn ToSql> = bound.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(refs.as_slice(), |row| {
        let category_id: Option<i64> = row.get(7)?;
        let category_name: Option<String> = row.get(8)?;
        Ok(PostListItem {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            status: row.get(3)?,
            published_at: time_helpers::opt_iso_z(row.get(4)?),
            created_at: time_helpers::opt_iso_z(row.get(5)?),
            updated_at: time_helpers::opt_iso_z(row.get(6)?),
            category_id,
            category_name: category_name.clone(),
            category: category_id.map(|id| CategoryRef {
                id,
                name: category_name,
            }),
            view_count: row.get(9)?,
        })
    })?;
    rows.collect()
}

pub fn count_posts(conn: &Connection, filters: &PostFilters) -> Result<i64, RusqliteError> {
    let mut bound: Vec<Box<dyn ToSql>> = Vec::new();
    let where_sql = build_filter_sql(filters, &mut bound);
    let sql = format!("SELECT COUNT(*) FROM posts p{where_sql}");
    let refs: Vec<&dyn ToSql> = bound.iter().map(|p| p.as_ref()).collect();
    conn.query_row(&sql, refs.as_slice(), |row| row.get(0))
}

/// Raw detail row without the child collections, which come from
/// [`tags_for_post`] and [`attachments_for_post`].
pub fn read_post_detail(
    conn: &Connection,
    id: i64,
) -> Result<Option<PostDetail>, RusqliteError> {
    conn.query_row(
        "SELECT p.id, p.title, p.slug, p.status, p.published_at, p.category_id, p.prefix_id,
                pp.name, p.thumbnail_asset_id, p.content_html, p.content_json,
                p.created_at, p.updated_at, c.name, p.view_count
         FROM posts p
         LEFT JOIN categories c ON c.id = p.category_id
         LEFT JOIN post_prefixes pp ON pp.id = p.prefix_id
         WHERE p.id = ?1",
        [id],
        |row| {
            Ok(PostDetail {
                id: row.get(0)?,
                title: row.get(1)?,
                slug: row.get(2)?,
                status: row.get(3)?,
                published_at: time_helpers::opt_iso_z(row.get(4)?),
                category_id: row.get(5)?,
                prefix_id: row.get(6)?,
                prefix_name: row.get(7)?,
                thumbnail_asset_id: row.get(8)?,
                content_html: row.get(9)?,
                content_json: row.get(10)?,
                created_at: time_helpers::opt_iso_z(row.get(11)?),
                updated_at: time_helpers::opt_iso_z(row.get(12)?),
                category_name: row.get(13)?,
                view_count: row.get(14)?,
                post_tags: Vec::new(),
                tags: Vec::new(),
                attachments: Vec::new(),
            })
        },
    )
    .optional()
}

/// Whether the post may be served to an unauthenticated reader.
pub fn is_publicly_visible(conn: &Connection, id: i64) -> Result<bool, RusqliteError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM posts p WHERE p.id = ?1 AND {PUBLIC_VISIBLE})");
    conn.query_row(&sql, params![id, time_helpers::now_utc_text()], |row| {
        row.get(0)
    })
}

pub struct PostRecord<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub status: &'a str,
    pub published_at: Option<String>,
    pub category_id: Option<i64>,
    pub prefix_id: Option<i64>,
    pub thumbnail_asset_id: Option<i64>,
    pub content_html: Option<&'a str>,
    pub content_json: Option<&'a str>,
}

pub fn insert_post(conn: &Connection, record: &PostRecord<'_>) -> Result<i64, RusqliteError> {
    let now = time_helpers::now_utc_text();
    conn.execute(
        "INSERT INTO posts (title, slug, status, published_at, category_id, prefix_id,
                            thumbnail_asset_id, content_html, content_json, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            record.title,
            record.slug,
            record.status,
            record.published_at,
            record.category_id,
            record.prefix_id,
            record.thumbnail_asset_id,
            record.content_html,
            record.content_json,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_post(
    conn: &Connection,
    id: i64,
    record: &PostRecord<'_>,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE posts SET title = ?1, slug = ?2, status = ?3, published_at = ?4,
                category_id = ?5, prefix_id = ?6, thumbnail_asset_id = ?7,
                content_html = ?8, content_json = ?9, updated_at = ?10
         WHERE id = ?11",
        params![
            record.title,
            record.slug,
            record.status,
            record.published_at,
            record.category_id,
            record.prefix_id,
            record.thumbnail_asset_id,
            record.content_html,
            record.content_json,
            time_helpers::now_utc_text(),
            id,
        ],
    )
}

pub fn read_published_at(conn: &Connection, id: i64) -> Result<Option<String>, RusqliteError> {
    conn.query_row("SELECT published_at FROM posts WHERE id = ?1", [id], |row| {
        row.get(0)
    })
}

pub fn delete_post(conn: &Connection, id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM posts WHERE id = ?1", [id])
}

pub fn replace_post_tags(
    conn: &Connection,
    post_id: i64,
    tag_ids: &[i64],
) -> Result<(), RusqliteError> {
    conn.execute("DELETE FROM post_tags WHERE post_id = ?1", [post_id])?;
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in tag_ids {
        stmt.execute(params![post_id, tag_id])?;
    }
    Ok(())
}

pub fn replace_post_attachments(
    conn: &Connection,
    post_id: i64,
    asset_ids: &[i64],
) -> Result<(), RusqliteError> {
    conn.execute("DELETE FROM post_attachments WHERE post_id = ?1", [post_id])?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO post_attachments (post_id, asset_id, sort_order)
         VALUES (?1, ?2, ?3)",
    )?;
    for (i, asset_id) in asset_ids.iter().enumerate() {
        stmt.execute(params![post_id, asset_id, i as i64])?;
    }
    Ok(())
}

pub fn tags_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Tag>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name FROM tags t
         JOIN post_tags pt ON pt.tag_id = t.id
         WHERE pt.post_id = ?1 ORDER BY t.name",
    )?;
    let rows = stmt.query_map([post_id], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn attachments_for_post(
    conn: &Connection,
    post_id: i64,
    url_prefix: &str,
) -> Result<Vec<AttachmentOut>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.original_name, a.file_path, a.size_bytes
         FROM assets a
         JOIN post_attachments pa ON pa.asset_id = a.id
         WHERE pa.post_id = ?1 ORDER BY pa.sort_order, pa.asset_id",
    )?;
    let rows = stmt.query_map([post_id], |row| {
        let file_path: String = row.get(2)?;
        Ok(AttachmentOut {
            id: row.get(0)?,
            original_name: row.get(1)?,
            url: Some(format!("{url_prefix}{file_path}")),
            size_bytes: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Adjacent posts among publicly visible ones, ordered by publish time with
/// id as tiebreaker. `next` is the newer neighbor, `prev` the older one.
pub fn neighbor_posts(
    conn: &Connection,
    id: i64,
) -> Result<(Option<NeighborPost>, Option<NeighborPost>), RusqliteError> {
    let now = time_helpers::now_utc_text();

    let anchor: Option<(String, i64)> = conn
        .query_row(
            "SELECT COALESCE(published_at, '1970-01-01'), id FROM posts WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((anchor_key, anchor_id)) = anchor else {
        return Ok((None, None));
    };

    let prev_sql = format!(
        "SELECT p.id, p.title FROM posts p
         WHERE {PUBLIC_VISIBLE}
           AND (COALESCE(p.published_at, '1970-01-01'), p.id) < (?, ?)
         ORDER BY COALESCE(p.published_at, '1970-01-01') DESC, p.id DESC LIMIT 1"
    );
    let prev = conn
        .query_row(&prev_sql, params![now, anchor_key, anchor_id], |row| {
            Ok(NeighborPost {
                id: row.get(0)?,
                title: row.get(1)?,
            })
        })
        .optional()?;

    let next_sql = format!(
        "SELECT p.id, p.title FROM posts p
         WHERE {PUBLIC_VISIBLE}
           AND (COALESCE(p.published_at, '1970-01-01'), p.id) > (?, ?)
         ORDER BY COALESCE(p.published_at, '1970-01-01') ASC, p.id ASC LIMIT 1"
    );
    let next = conn
        .query_row(&next_sql, params![now, anchor_key, anchor_id], |row| {
            Ok(NeighborPost {
                id: row.get(0)?,
                title: row.get(1)?,
            })
        })
        .optional()?;

    Ok((prev, next))
}

pub fn increment_view_count(conn: &Connection, id: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE posts SET view_count = view_count + 1 WHERE id = ?1",
        [id],
    )?;
    Ok(())
}

pub fn recent_posts(conn: &Connection, limit: i64) -> Result<Vec<RecentPost>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.slug, p.status, p.updated_at, c.name, p.view_count
         FROM posts p
         LEFT JOIN categories c ON c.id = p.category_id
         ORDER BY p.updated_at DESC, p.id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok(RecentPost {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            status: row.get(3)?,
            updated_at: time_helpers::opt_iso_z(row.get(4)?),
            category_name: row.get(5)?,
            view_count: row.get(6)?,
        })
    })?;
    rows.collect()
}

/// Posts counted as published on the dashboard include unlisted ones.
pub fn count_published(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE status IN ('PUBLISHED', 'UNLISTED')",
        [],
        |row| row.get(0),
    )
}

/// SQL-side rewrite of temp upload paths after assets move under the post id.
pub fn rewrite_temp_paths(conn: &Connection, post_id: i64) -> Result<(), RusqliteError> {
    let replacement = format!("/{post_id}/");
    conn.execute(
        "UPDATE posts SET
             content_html = REPLACE(content_html, '/temp/', ?1),
             content_json = REPLACE(content_json, '/temp/', ?1)
         WHERE id = ?2",
        params![replacement, post_id],
    )?;
    Ok(())
}
