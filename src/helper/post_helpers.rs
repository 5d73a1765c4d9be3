use log::warn;
use rusqlite::Connection;

use crate::error::ApiError;
use crate::helper::time_helpers;
use crate::models::db_operations::{posts_db_operations, site_db_operations};

/// Finds the first free slug: the candidate itself, then `candidate-1`,
/// `candidate-2`, ... An empty candidate falls back to "untitled";
/// `exclude_id` lets an update keep its own slug.
pub fn unique_slug(
    conn: &Connection,
    requested: &str,
    exclude_id: Option<i64>,
) -> Result<String, ApiError> {
    let trimmed = requested.trim();
    let base = if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    };
    if !posts_db_operations::slug_exists(conn, &base, exclude_id)? {
        return Ok(base);
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !posts_db_operations::slug_exists(conn, &candidate, exclude_id)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Parses and validates a requested publish time, returning the storage text.
///
/// Publishing in the past is rejected with a 60 second grace window. On
/// update the check is skipped when the requested value matches the stored
/// one at minute precision, so resaving an already published post works.
pub fn resolve_published_at(
    raw: Option<&str>,
    existing: Option<&str>,
) -> Result<Option<String>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let Some(parsed) = time_helpers::parse_client_datetime(raw) else {
        // Unparseable input is stored verbatim rather than rejected.
        return Ok(Some(raw.to_string()));
    };
    let stored = time_helpers::format_db_datetime(parsed);

    if time_helpers::is_past_beyond_grace(parsed) {
        let unchanged = existing
            .map(|old| minute_prefix(old) == minute_prefix(&stored))
            .unwrap_or(false);
        if !unchanged {
            return Err(ApiError::invalid(
                "published_at cannot be set in the past".to_string(),
            ));
        }
    }
    Ok(Some(stored))
}

// Stored values may be arbitrary text, so the cut must land on a char
// boundary.
fn minute_prefix(s: &str) -> &str {
    match s.char_indices().nth(16) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Side effect of an anonymous read of a published post. Both counters move
/// in one transaction; a failure rolls back everything, is logged and never
/// surfaces to the reader.
pub fn record_public_view(conn: &mut Connection, post_id: i64, timezone_offset_hours: i32) {
    let today = time_helpers::today_for_offset(timezone_offset_hours);
    let applied = conn.transaction().and_then(|tx| {
        site_db_operations::upsert_daily_stat(&tx, &today)?;
        posts_db_operations::increment_view_count(&tx, post_id)?;
        tx.commit()
    });
    if let Err(e) = applied {
        warn!("post {post_id}: view stats update failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;
    use chrono::Duration;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db_setup::create_schema(&conn).expect("schema");
        conn
    }

    fn insert_post_with_slug(conn: &Connection, slug: &str) -> i64 {
        conn.execute(
            "INSERT INTO posts (title, slug, status, created_at, updated_at)
             VALUES ('t', ?1, 'DRAFT', '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            [slug],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn empty_candidate_falls_back_to_untitled() {
        let conn = test_conn();
        assert_eq!(unique_slug(&conn, "", None).unwrap(), "untitled");
        assert_eq!(unique_slug(&conn, "  ", None).unwrap(), "untitled");
        assert_eq!(unique_slug(&conn, "my-post", None).unwrap(), "my-post");
    }

    #[test]
    fn unique_slug_picks_smallest_free_suffix() {
        let conn = test_conn();
        insert_post_with_slug(&conn, "hello");
        insert_post_with_slug(&conn, "hello-1");

        let slug = unique_slug(&conn, "hello", None).unwrap();
        assert_eq!(slug, "hello-2");
    }

    #[test]
    fn unique_slug_ignores_own_row_on_update() {
        let conn = test_conn();
        let id = insert_post_with_slug(&conn, "hello");

        let slug = unique_slug(&conn, "hello", Some(id)).unwrap();
        assert_eq!(slug, "hello");
    }

    #[test]
    fn past_publish_time_rejected() {
        let past = (time_helpers::now_utc() - Duration::minutes(10))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        let err = resolve_published_at(Some(&past), None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn past_publish_time_allowed_when_unchanged() {
        let past = time_helpers::now_utc() - Duration::days(3);
        let stored = time_helpers::format_db_datetime(past);
        let raw = past.format("%Y-%m-%dT%H:%M:%S").to_string();

        let resolved = resolve_published_at(Some(&raw), Some(&stored)).unwrap();
        assert_eq!(resolved, Some(stored));
    }

    #[test]
    fn past_publish_time_rejected_with_multibyte_stored_value() {
        let past = (time_helpers::now_utc() - Duration::minutes(10))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        // A free-form stored value must not derail the comparison.
        let err = resolve_published_at(Some(&past), Some("가나다라마바사")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn near_future_timestamp_accepted() {
        let soon = (time_helpers::now_utc() + Duration::minutes(5))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        assert!(resolve_published_at(Some(&soon), None).is_ok());
        assert_eq!(resolve_published_at(None, None).unwrap(), None);
    }

    #[test]
    fn record_public_view_bumps_both_counters() {
        let mut conn = test_conn();
        let id = insert_post_with_slug(&conn, "viewed");

        record_public_view(&mut conn, id, 9);
        record_public_view(&mut conn, id, 9);

        let views: i64 = conn
            .query_row("SELECT view_count FROM posts WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(views, 2);
        let (visits, stat_views): (i64, i64) = conn
            .query_row("SELECT visits, views FROM daily_stats", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((visits, stat_views), (2, 2));
    }

    #[test]
    fn record_public_view_rolls_back_as_a_unit() {
        let mut conn = test_conn();
        let id = insert_post_with_slug(&conn, "resilient");
        conn.execute_batch("DROP TABLE daily_stats;").unwrap();

        record_public_view(&mut conn, id, 9);

        // The failed daily stat rolls back the view count with it.
        let views: i64 = conn
            .query_row("SELECT view_count FROM posts WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(views, 0);
    }
}
