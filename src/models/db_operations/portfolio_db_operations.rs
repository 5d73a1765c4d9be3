use log::warn;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

use crate::helper::time_helpers;
use crate::models::{HighlightOut, LinkItem, LinkOut, Tag};

/// Career/project rows come back without their child collections; the route
/// layer attaches links, highlights and tags per row.
#[derive(Debug)]
pub struct CareerRow {
    pub id: i64,
    pub logo_asset_id: Option<i64>,
    pub company_name: String,
    pub role: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug)]
pub struct ProjectRow {
    pub id: i64,
    pub thumbnail_asset_id: Option<i64>,
    pub intro_image_asset_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_order: i64,
}

// --- Careers ---

pub fn list_careers(conn: &Connection) -> Result<Vec<CareerRow>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, logo_asset_id, company_name, role, start_date, end_date, description, sort_order
         FROM careers ORDER BY sort_order, id",
    )?;
    let rows = stmt.query_map([], map_career_row)?;
    rows.collect()
}

pub fn read_career(conn: &Connection, id: i64) -> Result<Option<CareerRow>, RusqliteError> {
    conn.query_row(
        "SELECT id, logo_asset_id, company_name, role, start_date, end_date, description, sort_order
         FROM careers WHERE id = ?1",
        [id],
        map_career_row,
    )
    .optional()
}

fn map_career_row(row: &rusqlite::Row<'_>) -> Result<CareerRow, RusqliteError> {
    Ok(CareerRow {
        id: row.get(0)?,
        logo_asset_id: row.get(1)?,
        company_name: row.get(2)?,
        role: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        description: row.get(6)?,
        sort_order: row.get(7)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn insert_career(
    conn: &Connection,
    logo_asset_id: Option<i64>,
    company_name: &str,
    role: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    description: Option<&str>,
    sort_order: i64,
) -> Result<i64, RusqliteError> {
    let now = time_helpers::now_utc_text();
    conn.execute(
        "INSERT INTO careers (logo_asset_id, company_name, role, start_date, end_date,
                              description, sort_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![logo_asset_id, company_name, role, start_date, end_date, description, sort_order, now],
    )?;
    Ok(conn.last_insert_rowid())
}

#[allow(clippy::too_many_arguments)]
pub fn update_career(
    conn: &Connection,
    id: i64,
    logo_asset_id: Option<i64>,
    company_name: &str,
    role: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    description: Option<&str>,
    sort_order: i64,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE careers SET logo_asset_id = ?1, company_name = ?2, role = ?3, start_date = ?4,
                end_date = ?5, description = ?6, sort_order = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            logo_asset_id,
            company_name,
            role,
            start_date,
            end_date,
            description,
            sort_order,
            time_helpers::now_utc_text(),
            id,
        ],
    )
}

pub fn delete_career(conn: &Connection, id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM careers WHERE id = ?1", [id])
}

/// Full replacement of a career's link list. Capped to five entries.
pub fn replace_career_links(
    conn: &Connection,
    career_id: i64,
    links: &[LinkItem],
) -> Result<(), RusqliteError> {
    conn.execute("DELETE FROM career_links WHERE career_id = ?1", [career_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO career_links (career_id, link_name, link_url, sort_order)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for link in links.iter().take(5) {
        let name = link.link_name.trim();
        let url = link.link_url.trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        stmt.execute(params![career_id, name, url, link.sort_order])?;
    }
    Ok(())
}

pub fn replace_career_highlights(
    conn: &Connection,
    career_id: i64,
    highlights: &[String],
) -> Result<(), RusqliteError> {
    conn.execute(
        "DELETE FROM career_highlights WHERE career_id = ?1",
        [career_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO career_highlights (career_id, content, sort_order) VALUES (?1, ?2, ?3)",
    )?;
    for (i, content) in highlights
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .take(5)
        .enumerate()
    {
        stmt.execute(params![career_id, content, i as i64])?;
    }
    Ok(())
}

pub fn replace_career_tags(
    conn: &Connection,
    career_id: i64,
    tag_ids: &[i64],
) -> Result<(), RusqliteError> {
    conn.execute("DELETE FROM career_tags WHERE career_id = ?1", [career_id])?;
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO career_tags (career_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in tag_ids.iter().take(5) {
        stmt.execute(params![career_id, tag_id])?;
    }
    Ok(())
}

/// A missing child table must not take the career list down with it.
pub fn career_links_or_empty(conn: &Connection, career_id: i64) -> Vec<LinkOut> {
    let result = (|| -> Result<Vec<LinkOut>, RusqliteError> {
        let mut stmt = conn.prepare(
            "SELECT id, link_name, link_url, sort_order FROM career_links
             WHERE career_id = ?1 ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([career_id], |row| {
            Ok(LinkOut {
                id: row.get(0)?,
                link_name: row.get(1)?,
                link_url: row.get(2)?,
                sort_order: row.get(3)?,
            })
        })?;
        rows.collect()
    })();
    result.unwrap_or_else(|e| {
        warn!("career {career_id}: failed to load links: {e}");
        Vec::new()
    })
}

pub fn career_highlights_or_empty(conn: &Connection, career_id: i64) -> Vec<HighlightOut> {
    let result = (|| -> Result<Vec<HighlightOut>, RusqliteError> {
        let mut stmt = conn.prepare(
            "SELECT id, content, sort_order FROM career_highlights
             WHERE career_id = ?1 ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([career_id], |row| {
            Ok(HighlightOut {
                id: row.get(0)?,
                content: row.get(1)?,
                sort_order: row.get(2)?,
            })
        })?;
        rows.collect()
    })();
    result.unwrap_or_else(|e| {
        warn!("career {career_id}: failed to load highlights: {e}");
        Vec::new()
    })
}

pub fn career_tags_or_empty(conn: &Connection, career_id: i64) -> Vec<Tag> {
    let result = (|| -> Result<Vec<Tag>, RusqliteError> {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name FROM tags t
             JOIN career_tags ct ON ct.tag_id = t.id
             WHERE ct.career_id = ?1 ORDER BY t.name",
        )?;
        let rows = stmt.query_map([career_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect()
    })();
    result.unwrap_or_else(|e| {
        warn!("career {career_id}: failed to load tags: {e}");
        Vec::new()
    })
}

pub fn set_career_sort(conn: &Connection, id: i64, sort_order: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE careers SET sort_order = ?1 WHERE id = ?2",
        params![sort_order, id],
    )?;
    Ok(())
}

// --- Projects ---

pub fn list_projects(conn: &Connection) -> Result<Vec<ProjectRow>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, thumbnail_asset_id, intro_image_asset_id, title, description,
                start_date, end_date, sort_order
         FROM projects ORDER BY sort_order, id",
    )?;
    let rows = stmt.query_map([], map_project_row)?;
    rows.collect()
}

pub fn read_project(conn: &Connection, id: i64) -> Result<Option<ProjectRow>, RusqliteError> {
    conn.query_row(
        "SELECT id, thumbnail_asset_id, intro_image_asset_id, title, description,
                start_date, end_date, sort_order
         FROM projects WHERE id = ?1",
        [id],
        map_project_row,
    )
    .optional()
}

fn map_project_row(row: &rusqlite::Row<'_>) -> Result<ProjectRow, RusqliteError> {
    Ok(ProjectRow {
        id: row.get(0)?,
        thumbnail_asset_id: row.get(1)?,
        intro_image_asset_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        sort_order: row.get(7)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn insert_project(
    conn: &Connection,
    thumbnail_asset_id: Option<i64>,
    intro_image_asset_id: Option<i64>,
    title: &str,
    description: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    sort_order: i64,
) -> Result<i64, RusqliteError> {
    let now = time_helpers::now_utc_text();
    conn.execute(
        "INSERT INTO projects (thumbnail_asset_id, intro_image_asset_id, title, description,
                               start_date, end_date, sort_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![thumbnail_asset_id, intro_image_asset_id, title, description, start_date, end_date, sort_order, now],
    )?;
    Ok(conn.last_insert_rowid())
}

#[allow(clippy::too_many_arguments)]
pub fn update_project(
    conn: &Connection,
    id: i64,
    thumbnail_asset_id: Option<i64>,
    intro_image_asset_id: Option<i64>,
    title: &str,
    description: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    sort_order: i64,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE projects SET thumbnail_asset_id = ?1, intro_image_asset_id = ?2, title = ?3,
                description = ?4, start_date = ?5, end_date = ?6, sort_order = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            thumbnail_asset_id,
            intro_image_asset_id,
            title,
            description,
            start_date,
            end_date,
            sort_order,
            time_helpers::now_utc_text(),
            id,
        ],
    )
}

pub fn delete_project(conn: &Connection, id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM projects WHERE id = ?1", [id])
}

/// Project links are unlimited; order follows list position.
pub fn replace_project_links(
    conn: &Connection,
    project_id: i64,
    links: &[LinkItem],
) -> Result<(), RusqliteError> {
    conn.execute(
        "DELETE FROM project_links WHERE project_id = ?1",
        [project_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO project_links (project_id, link_name, link_url, sort_order)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for link in links {
        let name = link.link_name.trim();
        let url = link.link_url.trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        stmt.execute(params![project_id, name, url, link.sort_order])?;
    }
    Ok(())
}

pub fn replace_project_tags(
    conn: &Connection,
    project_id: i64,
    tag_ids: &[i64],
) -> Result<(), RusqliteError> {
    conn.execute(
        "DELETE FROM project_tags WHERE project_id = ?1",
        [project_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO project_tags (project_id, tag_id, sort_order) VALUES (?1, ?2, ?3)",
    )?;
    for (i, tag_id) in tag_ids.iter().enumerate() {
        stmt.execute(params![project_id, tag_id, i as i64])?;
    }
    Ok(())
}

pub fn project_links_or_empty(conn: &Connection, project_id: i64) -> Vec<LinkOut> {
    let result = (|| -> Result<Vec<LinkOut>, RusqliteError> {
        let mut stmt = conn.prepare(
            "SELECT id, link_name, link_url, sort_order FROM project_links
             WHERE project_id = ?1 ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([project_id], |row| {
            Ok(LinkOut {
                id: row.get(0)?,
                link_name: row.get(1)?,
                link_url: row.get(2)?,
                sort_order: row.get(3)?,
            })
        })?;
        rows.collect()
    })();
    result.unwrap_or_else(|e| {
        warn!("project {project_id}: failed to load links: {e}");
        Vec::new()
    })
}

pub fn project_tags_or_empty(conn: &Connection, project_id: i64) -> Vec<Tag> {
    let result = (|| -> Result<Vec<Tag>, RusqliteError> {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name FROM tags t
             JOIN project_tags pt ON pt.tag_id = t.id
             WHERE pt.project_id = ?1 ORDER BY pt.sort_order, t.id",
        )?;
        let rows = stmt.query_map([project_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect()
    })();
    result.unwrap_or_else(|e| {
        warn!("project {project_id}: failed to load tags: {e}");
        Vec::new()
    })
}

pub fn set_project_sort(conn: &Connection, id: i64, sort_order: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE projects SET sort_order = ?1 WHERE id = ?2",
        params![sort_order, id],
    )?;
    Ok(())
}
