use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};

/// Storage format for every timestamp column. UTC, second precision, and
/// lexicographic order equals chronological order.
pub const DB_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn now_utc_text() -> String {
    now_utc().format(DB_DATETIME_FMT).to_string()
}

pub fn format_db_datetime(dt: NaiveDateTime) -> String {
    dt.format(DB_DATETIME_FMT).to_string()
}

/// Parses a client-supplied timestamp. The editor sends ISO 8601 with `Z`;
/// legacy naive values (with or without seconds) are treated as UTC.
pub fn parse_client_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, DB_DATETIME_FMT))
        .ok()
}

/// Renders a stored timestamp back as ISO 8601 with a trailing `Z`.
pub fn to_iso_z(stored: &str) -> String {
    match NaiveDateTime::parse_from_str(stored, DB_DATETIME_FMT) {
        Ok(dt) => format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S")),
        Err(_) => stored.to_string(),
    }
}

pub fn opt_iso_z(stored: Option<String>) -> Option<String> {
    stored.as_deref().map(to_iso_z)
}

/// Normalizes a date input to `YYYY-MM-DD`. `YYYY-MM` becomes the first of
/// the month; anything longer is truncated to the date part.
pub fn normalize_date(raw: Option<&str>) -> Option<String> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    let head: String = s.chars().take(10).collect();
    if head.len() == 7 && head.as_bytes()[4] == b'-' {
        return Some(format!("{}-01", head));
    }
    Some(head)
}

/// Today's date for the configured timezone offset, used as the daily_stats
/// primary key.
pub fn today_for_offset(offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    Utc::now()
        .with_timezone(&offset)
        .date_naive()
        .format("%Y-%m-%d")
        .to_string()
}

/// True when the timestamp lies more than 60 seconds behind the current time.
pub fn is_past_beyond_grace(dt: NaiveDateTime) -> bool {
    dt < now_utc() - Duration::seconds(60)
}
